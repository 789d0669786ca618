//! Challenge Rewards - budget-accounted point awards with external fulfillment
//!
//! This crate is the reward core behind group challenges: collaborators hand
//! in already-approved awards, and the core accounts, records, and optionally
//! fulfills them through an external reward provider.
//!
//! # How it works
//!
//! 1. A collaborator calls Award with an approved amount and reason
//! 2. Budget debit, balance credit and ledger append commit atomically
//! 3. Awards needing external fulfillment get a RewardIssuance record
//! 4. The fulfillment client syncs the participant, then submits the
//!    points adjustment or catalog transaction with an idempotency key
//! 5. A reconciliation job polls the provider for issuances left
//!    non-terminal and moves them to ISSUED, FAILED or RETURNED
//!
//! # Safety properties
//!
//! - Awards are atomic: no partial budget/balance/ledger state survives
//! - Issuances never double-submit: a conditional PENDING -> PROCESSING
//!   claim serializes duplicate triggers
//! - Provider retries carry deterministic idempotency keys, so a lost
//!   response never double-credits a participant

pub mod config;
pub mod error;
pub mod issuance;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod pg_store;
pub mod provider;
pub mod reconcile;
pub mod retry;
pub mod server;
pub mod sqlite_store;
pub mod store;
pub mod sync;
pub mod token_cache;

pub use error::RewardError;
pub use issuance::{AwardOutcome, AwardRequest, FulfillmentSpec, IssuanceService};
pub use ledger::Ledger;
pub use models::{
    Budget, BudgetScope, ExternalStatus, IssuanceKind, IssuanceStatus, LedgerEntry, NewAward,
    NewIssuance, Participant, PointsBalance, ProviderConfig, RewardIssuance, SyncStatus,
};
pub use pg_store::PgStore;
pub use provider::FulfillmentClient;
pub use reconcile::{map_provider_status, Reconciler};
pub use retry::RetryPolicy;
pub use sqlite_store::SqliteStore;
pub use store::RewardStore;
pub use sync::ParticipantSync;
pub use token_cache::TokenCache;
