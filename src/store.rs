//! Storage abstraction shared by the PostgreSQL server store and the
//! embedded SQLite store.
//!
//! Every mutation that touches shared ledger state (Award) runs inside a
//! single database transaction in the implementations; issuance submission
//! relies on the conditional `PENDING -> PROCESSING` update exposed here as
//! [`RewardStore::begin_processing`].

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Budget, BudgetScope, ExternalStatus, LedgerEntry, NewAward, NewIssuance, Participant,
    PointsBalance, ProviderConfig, RewardIssuance, SyncStatus,
};

#[async_trait]
pub trait RewardStore: Send + Sync {
    // ------------------------------------------------------------------
    // Budgets / balances / ledger
    // ------------------------------------------------------------------

    /// Administrative upsert of a budget total. Never touches `allocated`.
    async fn set_budget(&self, scope: &BudgetScope, total_budget: i64) -> Result<Budget>;

    async fn get_budget(&self, scope: &BudgetScope) -> Result<Option<Budget>>;

    /// Atomically: bump the narrowest existing budget scope, upsert the
    /// recipient balance, and append a ledger entry. All three commit
    /// together or not at all.
    async fn award(&self, award: &NewAward) -> Result<LedgerEntry>;

    async fn get_balance(&self, user_id: &str, workspace_id: &str)
        -> Result<Option<PointsBalance>>;

    async fn ledger_entries(&self, workspace_id: &str, limit: i64) -> Result<Vec<LedgerEntry>>;

    // ------------------------------------------------------------------
    // Issuances
    // ------------------------------------------------------------------

    /// Insert an issuance. For completion-style triggers
    /// (`dedupe_on_challenge`), returns the pre-existing issuance for the
    /// same (user, challenge) instead of creating a duplicate. The flag is
    /// false when an existing row was returned.
    async fn create_issuance(&self, new: &NewIssuance) -> Result<(RewardIssuance, bool)>;

    async fn get_issuance(&self, id: Uuid) -> Result<Option<RewardIssuance>>;

    /// Conditional `PENDING -> PROCESSING` claim. Returns false when the
    /// issuance is not claimable (already in flight, terminal, or missing),
    /// which makes duplicate submit triggers harmless.
    async fn begin_processing(&self, id: Uuid) -> Result<bool>;

    /// Record the provider reference for a dispatch the provider accepted
    /// but has not finished (async SKU fulfillment); statuses are untouched,
    /// which leaves the issuance visible to reconciliation.
    async fn set_external_ref(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()>;

    /// Record a successful dispatch: external id, ISSUED/COMPLETED,
    /// `issued_at` stamped.
    async fn mark_issued(
        &self,
        id: Uuid,
        external_transaction_id: Option<&str>,
        external_adjustment_id: Option<&str>,
    ) -> Result<()>;

    /// Record a terminal failure with the message retained.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<()>;

    /// Operator retry: `FAILED -> PENDING`, external ids and error cleared.
    /// Returns false when the issuance is not in FAILED.
    async fn reset_for_retry(&self, id: Uuid) -> Result<bool>;

    /// Issuances that carry an external id but whose provider status is
    /// still PENDING or PROCESSING: the reconciliation work list.
    async fn unreconciled_issuances(&self, limit: i64) -> Result<Vec<RewardIssuance>>;

    /// Look up an issuance by its provider transaction or adjustment id
    /// (webhook ingest path).
    async fn find_by_external_ref(&self, external_id: &str) -> Result<Option<RewardIssuance>>;

    /// Apply a reconciled provider status. `COMPLETED` also promotes the
    /// local status to ISSUED (stamping `issued_at` if unset); `FAILED`
    /// demotes it to FAILED with the provider detail.
    async fn apply_external_status(
        &self,
        id: Uuid,
        status: ExternalStatus,
        detail: Option<&str>,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    async fn get_participant(
        &self,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<Option<Participant>>;

    async fn upsert_participant(&self, participant: &Participant) -> Result<()>;

    async fn set_sync_state(
        &self,
        user_id: &str,
        workspace_id: &str,
        status: SyncStatus,
        external_participant_id: Option<&str>,
    ) -> Result<()>;

    // ------------------------------------------------------------------
    // Provider configuration
    // ------------------------------------------------------------------

    async fn get_provider_config(&self, workspace_id: &str) -> Result<Option<ProviderConfig>>;

    async fn set_provider_config(&self, config: &ProviderConfig) -> Result<()>;
}
