//! Participant identity sync.
//!
//! Before any award can be fulfilled externally the local user needs a
//! participant record at the provider. Create-or-update runs as a two-step
//! saga: attempt create, and on a conflict compensate with an update against
//! the id we already know, or the id the provider's conflict body returns.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RewardError;
use crate::models::{Participant, ProviderConfig, SyncStatus};
use crate::provider::{FulfillmentClient, ParticipantUpsert};
use crate::store::RewardStore;

/// In-flight cap for bulk sync, keeping within provider rate limits.
const BULK_SYNC_CONCURRENCY: usize = 10;

pub struct ParticipantSync {
    store: Arc<dyn RewardStore>,
    client: Arc<FulfillmentClient>,
}

/// Per-item outcome of a bulk sync; one failing user never aborts the batch.
#[derive(Debug, Default, Serialize)]
pub struct BulkSyncReport {
    pub synced: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl ParticipantSync {
    pub fn new(store: Arc<dyn RewardStore>, client: Arc<FulfillmentClient>) -> Self {
        Self { store, client }
    }

    /// Return the provider participant id for a user, syncing first if
    /// needed. Already-synced users short-circuit without a network call.
    pub async fn ensure_synced(
        &self,
        config: &ProviderConfig,
        user_id: &str,
        workspace_id: &str,
    ) -> Result<String, RewardError> {
        let participant = self
            .store
            .get_participant(user_id, workspace_id)
            .await
            .map_err(RewardError::storage)?
            .ok_or_else(|| {
                RewardError::ParticipantSyncFailed(format!(
                    "no participant record for user {} in workspace {}",
                    user_id, workspace_id
                ))
            })?;

        if participant.sync_status == SyncStatus::Synced {
            if let Some(external_id) = &participant.external_participant_id {
                debug!("Participant {} already synced as {}", user_id, external_id);
                return Ok(external_id.clone());
            }
        }

        self.store
            .set_sync_state(user_id, workspace_id, SyncStatus::Pending, None)
            .await
            .map_err(RewardError::storage)?;

        match self.create_or_update(config, &participant).await {
            Ok(external_id) => {
                self.store
                    .set_sync_state(
                        user_id,
                        workspace_id,
                        SyncStatus::Synced,
                        Some(&external_id),
                    )
                    .await
                    .map_err(RewardError::storage)?;
                info!(
                    "Synced participant {} in workspace {} as {}",
                    user_id, workspace_id, external_id
                );
                Ok(external_id)
            }
            Err(err) => {
                self.store
                    .set_sync_state(user_id, workspace_id, SyncStatus::Failed, None)
                    .await
                    .map_err(RewardError::storage)?;
                // Terminal for this attempt; the next ensure_synced retries.
                Err(RewardError::ParticipantSyncFailed(err.to_string()))
            }
        }
    }

    async fn create_or_update(
        &self,
        config: &ProviderConfig,
        participant: &Participant,
    ) -> Result<String, RewardError> {
        let payload = ParticipantUpsert::from_participant(participant, &config.program_id);

        match self.client.create_participant(config, &payload).await {
            Ok(external_id) => Ok(external_id),
            Err(RewardError::Conflict(body)) => {
                // Compensating step: the participant already exists. Prefer
                // the id we recorded earlier; otherwise the conflict body's
                // id is authoritative.
                let existing_id = participant
                    .external_participant_id
                    .clone()
                    .or_else(|| extract_participant_id(&body));
                match existing_id {
                    Some(id) => {
                        debug!("Participant create conflicted, updating {}", id);
                        self.client.update_participant(config, &id, &payload).await
                    }
                    None => Err(RewardError::Conflict(
                        "participant exists but no id was recoverable".into(),
                    )),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Sync many users with bounded concurrency; failures are collected
    /// per-item rather than aborting the batch.
    pub async fn bulk_sync(
        &self,
        config: &ProviderConfig,
        workspace_id: &str,
        user_ids: &[String],
    ) -> BulkSyncReport {
        let results = stream::iter(user_ids.iter().cloned())
            .map(|user_id| async move {
                let outcome = self.ensure_synced(config, &user_id, workspace_id).await;
                (user_id, outcome)
            })
            .buffer_unordered(BULK_SYNC_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut report = BulkSyncReport::default();
        for (user_id, outcome) in results {
            match outcome {
                Ok(external_id) => report.synced.push((user_id, external_id)),
                Err(err) => {
                    warn!("Bulk sync failed for {}: {}", user_id, err);
                    report.failed.push((user_id, err.to_string()));
                }
            }
        }
        info!(
            "Bulk sync finished: {} synced, {} failed",
            report.synced.len(),
            report.failed.len()
        );
        report
    }
}

/// Pull the provider participant id out of a conflict response body.
fn extract_participant_id(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("id")
        .or_else(|| value.get("participant_id"))
        .and_then(|v| v.as_str())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Environment;
    use crate::provider::testing::MockTransport;
    use crate::retry::RetryPolicy;
    use crate::sqlite_store::SqliteStore;
    use crate::token_cache::TokenCache;
    use std::time::Duration;

    fn harness(transport: Arc<MockTransport>) -> (Arc<SqliteStore>, ParticipantSync) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let client = Arc::new(FulfillmentClient::new(
            transport,
            Arc::new(TokenCache::new(Duration::from_secs(3600))),
            RetryPolicy {
                max_attempts: 1,
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                multiplier: 2.0,
                jitter: false,
            },
            "https://rewards.example.com/api",
            "https://sandbox.rewards.example.com/api",
        ));
        let sync = ParticipantSync::new(store.clone(), client);
        (store, sync)
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            workspace_id: "w1".into(),
            program_id: "prog-1".into(),
            api_key: "key".into(),
            environment: Environment::Sandbox,
            enabled: true,
        }
    }

    fn participant(user: &str, status: SyncStatus, external_id: Option<&str>) -> Participant {
        Participant {
            user_id: user.into(),
            workspace_id: "w1".into(),
            email: format!("{user}@example.com"),
            first_name: Some("Test".into()),
            last_name: Some("User".into()),
            phone: None,
            address1: None,
            address2: None,
            city: None,
            state: None,
            zip: None,
            country: None,
            external_participant_id: external_id.map(String::from),
            sync_status: status,
            last_sync_at: None,
        }
    }

    #[tokio::test]
    async fn synced_participant_short_circuits_without_network() {
        let transport = Arc::new(MockTransport::new());
        let (store, sync) = harness(transport.clone());
        store
            .upsert_participant(&participant("u1", SyncStatus::Synced, Some("ext-1")))
            .await
            .unwrap();
        // upsert_participant does not own sync fields; set them explicitly.
        store
            .set_sync_state("u1", "w1", SyncStatus::Synced, Some("ext-1"))
            .await
            .unwrap();

        let id = sync.ensure_synced(&config(), "u1", "w1").await.unwrap();
        assert_eq!(id, "ext-1");
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn first_sync_creates_and_records_the_provider_id() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(201, serde_json::json!({"id": "ext-7"}));

        let (store, sync) = harness(transport.clone());
        store
            .upsert_participant(&participant("u1", SyncStatus::NotSynced, None))
            .await
            .unwrap();

        let id = sync.ensure_synced(&config(), "u1", "w1").await.unwrap();
        assert_eq!(id, "ext-7");

        let stored = store.get_participant("u1", "w1").await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Synced);
        assert_eq!(stored.external_participant_id.as_deref(), Some("ext-7"));
        assert!(stored.last_sync_at.is_some());
    }

    #[tokio::test]
    async fn conflict_falls_back_to_update_with_the_returned_id() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(409, serde_json::json!({"id": "ext-existing"}));
        transport.push_response(200, serde_json::json!({"id": "ext-existing"}));

        let (store, sync) = harness(transport.clone());
        store
            .upsert_participant(&participant("u1", SyncStatus::NotSynced, None))
            .await
            .unwrap();

        let id = sync.ensure_synced(&config(), "u1", "w1").await.unwrap();
        assert_eq!(id, "ext-existing");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].path, "/participant");
        assert_eq!(requests[2].path, "/participant/ext-existing");
    }

    #[tokio::test]
    async fn failure_is_recorded_and_the_next_attempt_can_recover() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(500, serde_json::Value::String("boom".into()));

        let (store, sync) = harness(transport.clone());
        store
            .upsert_participant(&participant("u1", SyncStatus::NotSynced, None))
            .await
            .unwrap();

        let err = sync.ensure_synced(&config(), "u1", "w1").await.unwrap_err();
        assert!(matches!(err, RewardError::ParticipantSyncFailed(_)));
        let stored = store.get_participant("u1", "w1").await.unwrap().unwrap();
        assert_eq!(stored.sync_status, SyncStatus::Failed);

        // Next call retries against a healthy provider.
        transport.push_response(201, serde_json::json!({"id": "ext-2"}));
        let id = sync.ensure_synced(&config(), "u1", "w1").await.unwrap();
        assert_eq!(id, "ext-2");
    }

    #[tokio::test]
    async fn bulk_sync_collects_failures_without_aborting() {
        let transport = Arc::new(MockTransport::new());
        let (store, sync) = harness(transport.clone());
        store
            .upsert_participant(&participant("u1", SyncStatus::Synced, Some("ext-1")))
            .await
            .unwrap();
        store
            .set_sync_state("u1", "w1", SyncStatus::Synced, Some("ext-1"))
            .await
            .unwrap();
        // u2 has no participant record at all.

        let report = sync
            .bulk_sync(&config(), "w1", &["u1".to_string(), "u2".to_string()])
            .await;
        assert_eq!(report.synced.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "u2");
    }
}
