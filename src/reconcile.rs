//! Status reconciliation against the fulfillment provider.
//!
//! Issuances the provider accepted but never confirmed (network blips, async
//! SKU fulfillment, lost webhooks) are polled here and moved to their
//! terminal state. Webhook pushes feed the same mapping function so poll and
//! push paths agree.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::RewardError;
use crate::models::{ExternalStatus, RewardIssuance};
use crate::provider::FulfillmentClient;
use crate::store::RewardStore;

/// In-flight cap while polling the provider.
const RECONCILE_CONCURRENCY: usize = 10;

/// Map a provider status string onto the local enum. Total: unrecognized
/// values are logged and treated as still-processing, never dropped.
pub fn map_provider_status(raw: &str) -> ExternalStatus {
    match raw.to_ascii_lowercase().as_str() {
        "pending" | "processing" => ExternalStatus::Processing,
        "completed" | "success" | "delivered" => ExternalStatus::Completed,
        "failed" | "error" => ExternalStatus::Failed,
        "returned" | "cancelled" => ExternalStatus::Returned,
        other => {
            warn!("Unrecognized provider status '{}', keeping PROCESSING", other);
            ExternalStatus::Processing
        }
    }
}

/// Push notification payload from the provider, carrying the resource id and
/// its new status.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub resource_id: String,
    pub status: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct Reconciler {
    store: Arc<dyn RewardStore>,
    client: Arc<FulfillmentClient>,
    batch_size: i64,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RewardStore>, client: Arc<FulfillmentClient>, batch_size: i64) -> Self {
        Self {
            store,
            client,
            batch_size,
        }
    }

    /// One reconciliation pass. Per-item failures are counted and logged;
    /// they never abort the rest of the batch.
    pub async fn run_once(&self) -> ReconcileSummary {
        let issuances = match self.store.unreconciled_issuances(self.batch_size).await {
            Ok(issuances) => issuances,
            Err(err) => {
                error!("Failed to list unreconciled issuances: {}", err);
                return ReconcileSummary::default();
            }
        };

        let checked = issuances.len();
        let results = stream::iter(issuances)
            .map(|issuance| async move {
                let id = issuance.id;
                self.reconcile_one(issuance)
                    .await
                    .map_err(|err| (id, err))
            })
            .buffer_unordered(RECONCILE_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut summary = ReconcileSummary {
            checked,
            ..Default::default()
        };
        for result in results {
            match result {
                Ok(true) => summary.updated += 1,
                Ok(false) => {}
                Err((id, err)) => {
                    warn!("Reconciliation failed for issuance {}: {}", id, err);
                    summary.failed += 1;
                }
            }
        }
        if summary.checked > 0 {
            info!(
                "Reconciliation pass: {} checked, {} updated, {} failed",
                summary.checked, summary.updated, summary.failed
            );
        }
        summary
    }

    /// Poll one issuance. Returns whether a state change was written.
    async fn reconcile_one(&self, issuance: RewardIssuance) -> Result<bool, RewardError> {
        let config = self
            .store
            .get_provider_config(&issuance.workspace_id)
            .await
            .map_err(RewardError::storage)?
            .filter(|c| c.enabled)
            .ok_or_else(|| RewardError::NotConfigured(issuance.workspace_id.clone()))?;

        let raw = if let Some(transaction_id) = &issuance.external_transaction_id {
            self.client.transaction_status(&config, transaction_id).await?
        } else if let Some(adjustment_id) = &issuance.external_adjustment_id {
            self.client.adjustment_status(&config, adjustment_id).await?
        } else {
            return Ok(false);
        };

        self.apply_status(&issuance, &raw, None).await
    }

    /// Feed a pushed status through the same mapping as the poll path.
    pub async fn apply_webhook(&self, event: &WebhookEvent) -> Result<bool, RewardError> {
        let issuance = self
            .store
            .find_by_external_ref(&event.resource_id)
            .await
            .map_err(RewardError::storage)?
            .ok_or(RewardError::NotFound)?;

        debug!(
            "Webhook {} for issuance {} ({})",
            event.event_type, issuance.id, event.status
        );
        self.apply_status(&issuance, &event.status, event.detail.as_deref())
            .await
    }

    async fn apply_status(
        &self,
        issuance: &RewardIssuance,
        raw: &str,
        detail: Option<&str>,
    ) -> Result<bool, RewardError> {
        let mapped = map_provider_status(raw);
        if mapped == issuance.external_status {
            // Redundant write avoided.
            return Ok(false);
        }

        let failure_detail = match mapped {
            ExternalStatus::Failed => Some(
                detail
                    .map(String::from)
                    .unwrap_or_else(|| format!("provider reported status '{}'", raw)),
            ),
            _ => None,
        };

        self.store
            .apply_external_status(issuance.id, mapped, failure_detail.as_deref())
            .await
            .map_err(RewardError::storage)?;
        info!(
            "Issuance {} reconciled: {} -> {}",
            issuance.id,
            issuance.external_status.as_str(),
            mapped.as_str()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Environment, IssuanceKind, IssuanceStatus, NewIssuance, ProviderConfig,
    };
    use crate::provider::testing::MockTransport;
    use crate::retry::RetryPolicy;
    use crate::sqlite_store::SqliteStore;
    use crate::token_cache::TokenCache;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn provider_status_mapping_is_total() {
        let cases = [
            ("pending", ExternalStatus::Processing),
            ("processing", ExternalStatus::Processing),
            ("completed", ExternalStatus::Completed),
            ("success", ExternalStatus::Completed),
            ("delivered", ExternalStatus::Completed),
            ("failed", ExternalStatus::Failed),
            ("error", ExternalStatus::Failed),
            ("returned", ExternalStatus::Returned),
            ("cancelled", ExternalStatus::Returned),
            ("somebody_elses_status", ExternalStatus::Processing),
        ];
        for (raw, expected) in cases {
            assert_eq!(map_provider_status(raw), expected, "input {raw}");
        }
        // Case-insensitive.
        assert_eq!(map_provider_status("Delivered"), ExternalStatus::Completed);
    }

    fn harness(transport: Arc<MockTransport>) -> (Arc<SqliteStore>, Reconciler) {
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
        let reconciler = Reconciler::new(store.clone(), client, 50);
        (store, reconciler)
    }

    async fn seed_issuance(
        store: &SqliteStore,
        workspace: &str,
        transaction_id: &str,
    ) -> Uuid {
        let (issuance, _) = store
            .create_issuance(&NewIssuance {
                user_id: "u1".into(),
                workspace_id: workspace.into(),
                challenge_id: None,
                kind: IssuanceKind::Sku,
                amount: Some(50),
                sku_id: Some("SKU-1".into()),
                currency: None,
                metadata: serde_json::Value::Null,
                dedupe_on_challenge: false,
            })
            .await
            .unwrap();
        store.begin_processing(issuance.id).await.unwrap();
        store
            .set_external_ref(issuance.id, Some(transaction_id), None)
            .await
            .unwrap();
        issuance.id
    }

    fn seed_config(workspace: &str) -> ProviderConfig {
        ProviderConfig {
            workspace_id: workspace.into(),
            program_id: "prog-1".into(),
            api_key: "key".into(),
            environment: Environment::Sandbox,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn delivered_transaction_promotes_to_issued() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(200, serde_json::json!({"status": "delivered"}));

        let (store, reconciler) = harness(transport);
        store.set_provider_config(&seed_config("w1")).await.unwrap();
        let id = seed_issuance(&store, "w1", "txn-1").await;

        let summary = reconciler.run_once().await;
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 0);

        let issuance = store.get_issuance(id).await.unwrap().unwrap();
        assert_eq!(issuance.status, IssuanceStatus::Issued);
        assert_eq!(issuance.external_status, ExternalStatus::Completed);
        assert!(issuance.issued_at.is_some());
    }

    #[tokio::test]
    async fn unchanged_status_writes_nothing() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(200, serde_json::json!({"status": "processing"}));

        let (store, reconciler) = harness(transport);
        store.set_provider_config(&seed_config("w1")).await.unwrap();
        seed_issuance(&store, "w1", "txn-1").await;

        let summary = reconciler.run_once().await;
        assert_eq!(summary.checked, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn provider_failure_captures_the_detail() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(200, serde_json::json!({"status": "failed"}));

        let (store, reconciler) = harness(transport);
        store.set_provider_config(&seed_config("w1")).await.unwrap();
        let id = seed_issuance(&store, "w1", "txn-1").await;

        reconciler.run_once().await;

        let issuance = store.get_issuance(id).await.unwrap().unwrap();
        assert_eq!(issuance.status, IssuanceStatus::Failed);
        assert_eq!(
            issuance.error_message.as_deref(),
            Some("provider reported status 'failed'")
        );
    }

    #[tokio::test]
    async fn one_bad_item_does_not_abort_the_batch() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(200, serde_json::json!({"status": "delivered"}));

        let (store, reconciler) = harness(transport);
        // w1 is configured; w2 is not, so its issuance fails.
        store.set_provider_config(&seed_config("w1")).await.unwrap();
        let good = seed_issuance(&store, "w1", "txn-good").await;
        seed_issuance(&store, "w2", "txn-orphan").await;

        let summary = reconciler.run_once().await;
        assert_eq!(summary.checked, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.failed, 1);

        let issuance = store.get_issuance(good).await.unwrap().unwrap();
        assert_eq!(issuance.status, IssuanceStatus::Issued);
    }

    #[tokio::test]
    async fn webhook_events_flow_through_the_same_mapping() {
        let transport = Arc::new(MockTransport::new());
        let (store, reconciler) = harness(transport.clone());
        store.set_provider_config(&seed_config("w1")).await.unwrap();
        let id = seed_issuance(&store, "w1", "txn-1").await;

        let changed = reconciler
            .apply_webhook(&WebhookEvent {
                event_type: "transaction.updated".into(),
                resource_id: "txn-1".into(),
                status: "returned".into(),
                detail: None,
            })
            .await
            .unwrap();
        assert!(changed);
        // No polling needed for pushed updates.
        assert_eq!(transport.request_count(), 0);

        let issuance = store.get_issuance(id).await.unwrap().unwrap();
        assert_eq!(issuance.external_status, ExternalStatus::Returned);
    }
}
