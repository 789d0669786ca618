//! Core data model: budgets, balances, ledger entries, issuances,
//! participants and per-workspace provider configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// BUDGETS / BALANCES / LEDGER
// ============================================================================

/// Budget scope: workspace-level, or narrowed to a single challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScope {
    pub workspace_id: String,
    pub challenge_id: Option<String>,
}

impl BudgetScope {
    pub fn workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            challenge_id: None,
        }
    }

    pub fn challenge(workspace_id: impl Into<String>, challenge_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            challenge_id: Some(challenge_id.into()),
        }
    }
}

/// A budget row. `allocated <= total_budget` is a soft ceiling: awards
/// increment `allocated` without enforcing the bound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub total_budget: i64,
    pub allocated: i64,
}

/// Per-user, per-workspace running point totals. Mutated only by Award.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsBalance {
    pub user_id: String,
    pub workspace_id: String,
    pub total_points: i64,
    pub available_points: i64,
}

/// Immutable audit record of a single award. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub to_user_id: String,
    pub amount: i64,
    pub submission_id: Option<String>,
    pub actor_id: Option<String>,
    pub reason: String,
    pub issuance_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Input to the Award operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAward {
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub to_user_id: String,
    pub amount: i64,
    pub submission_id: Option<String>,
    pub actor_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub issuance_id: Option<Uuid>,
}

// ============================================================================
// REWARD ISSUANCES
// ============================================================================

/// Local issuance lifecycle: Pending -> Processing -> Issued | Failed.
/// Failed resets to Pending only through an explicit operator retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssuanceStatus {
    Pending,
    Processing,
    Issued,
    Failed,
}

/// Provider-side status as last observed (pushed or polled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceKind {
    Points,
    Sku,
    Monetary,
}

impl IssuanceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Sku => "sku",
            Self::Monetary => "monetary",
        }
    }
}

impl IssuanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Issued => "ISSUED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "ISSUED" => Some(Self::Issued),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl ExternalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Returned => "RETURNED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            "RETURNED" => Some(Self::Returned),
            _ => None,
        }
    }
}

impl IssuanceKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "points" => Some(Self::Points),
            "sku" => Some(Self::Sku),
            "monetary" => Some(Self::Monetary),
            _ => None,
        }
    }
}

/// One award's external fulfillment attempt and its state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardIssuance {
    pub id: Uuid,
    pub user_id: String,
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub kind: IssuanceKind,
    pub amount: Option<i64>,
    pub sku_id: Option<String>,
    pub currency: Option<String>,
    pub status: IssuanceStatus,
    pub external_status: ExternalStatus,
    pub external_transaction_id: Option<String>,
    pub external_adjustment_id: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Value,
    pub issued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardIssuance {
    /// The external reference recorded for this issuance, if any.
    pub fn external_id(&self) -> Option<&str> {
        self.external_transaction_id
            .as_deref()
            .or(self.external_adjustment_id.as_deref())
    }
}

/// Input to CreateIssuance. `dedupe_on_challenge` marks completion-style
/// triggers, which must never produce two issuances for the same
/// (user, challenge) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIssuance {
    pub user_id: String,
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub kind: IssuanceKind,
    pub amount: Option<i64>,
    pub sku_id: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub dedupe_on_challenge: bool,
}

// ============================================================================
// PARTICIPANTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    NotSynced,
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSynced => "NOT_SYNCED",
            Self::Pending => "PENDING",
            Self::Synced => "SYNCED",
            Self::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_SYNCED" => Some(Self::NotSynced),
            "PENDING" => Some(Self::Pending),
            "SYNCED" => Some(Self::Synced),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Local identity of a user within a workspace, including the contact and
/// shipping fields mapped onto the provider's participant schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub workspace_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub external_participant_id: Option<String>,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// Shipping fields that are required for a catalog transaction but
    /// missing or blank on this participant.
    pub fn missing_shipping_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let mut check = |name, value: &Option<String>| {
            if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
                missing.push(name);
            }
        };
        check("FirstName", &self.first_name);
        check("LastName", &self.last_name);
        check("Address1", &self.address1);
        check("City", &self.city);
        check("State", &self.state);
        check("Zip", &self.zip);
        check("Country", &self.country);
        missing
    }
}

// ============================================================================
// PROVIDER CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Sandbox => "sandbox",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "production" => Some(Self::Production),
            "sandbox" => Some(Self::Sandbox),
            _ => None,
        }
    }
}

/// Per-workspace fulfillment provider configuration. Submit refuses to run
/// when the row is missing or `enabled` is false.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub workspace_id: String,
    pub program_id: String,
    pub api_key: String,
    pub environment: Environment,
    pub enabled: bool,
}
