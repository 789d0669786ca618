//! Reward issuance state machine and award orchestration.
//!
//! An issuance moves PENDING -> PROCESSING -> ISSUED or FAILED; FAILED rows
//! return to PENDING only through an explicit operator retry. Submission on
//! a given issuance is a critical section: the conditional PENDING ->
//! PROCESSING claim makes duplicate triggers (double-click, concurrent
//! scheduler tick, replayed webhook) harmless.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RewardError;
use crate::ledger::Ledger;
use crate::models::{
    ExternalStatus, IssuanceKind, IssuanceStatus, LedgerEntry, NewAward, NewIssuance, Participant,
    ProviderConfig, RewardIssuance,
};
use crate::notify::Notifier;
use crate::provider::{
    idempotency_key, AdjustmentRequest, FulfillmentClient, ProductLine, ProviderAccepted,
    ShippingAddress, TransactionRequest, WebhookSubscription,
};
use crate::reconcile::map_provider_status;
use crate::store::RewardStore;
use crate::sync::{BulkSyncReport, ParticipantSync};

/// A collaborator-approved award, optionally with external fulfillment.
#[derive(Debug, Clone, Deserialize)]
pub struct AwardRequest {
    pub workspace_id: String,
    pub challenge_id: Option<String>,
    pub to_user_id: String,
    pub amount: i64,
    pub submission_id: Option<String>,
    pub actor_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub fulfillment: Option<FulfillmentSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FulfillmentSpec {
    pub kind: IssuanceKind,
    pub sku_id: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    /// Completion-style triggers dedupe on (user, challenge).
    #[serde(default)]
    pub dedupe_on_challenge: bool,
}

/// Result of an award call. `entry` is None when a duplicate completion
/// trigger was recognized and the points were not re-credited.
#[derive(Debug, Serialize)]
pub struct AwardOutcome {
    pub entry: Option<LedgerEntry>,
    pub issuance: Option<RewardIssuance>,
}

enum PlannedCall {
    Adjustment(AdjustmentRequest, String),
    Transaction(TransactionRequest, String),
}

struct DispatchPlan {
    config: ProviderConfig,
    participant_id: String,
    call: PlannedCall,
}

pub struct IssuanceService {
    store: Arc<dyn RewardStore>,
    client: Arc<FulfillmentClient>,
    sync: ParticipantSync,
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
}

impl IssuanceService {
    pub fn new(
        store: Arc<dyn RewardStore>,
        client: Arc<FulfillmentClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            sync: ParticipantSync::new(store.clone(), client.clone()),
            ledger: Ledger::new(store.clone()),
            store,
            client,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    async fn provider_config(&self, workspace_id: &str) -> Result<ProviderConfig, RewardError> {
        self.store
            .get_provider_config(workspace_id)
            .await
            .map_err(RewardError::storage)?
            .filter(|c| c.enabled)
            .ok_or_else(|| RewardError::NotConfigured(workspace_id.to_string()))
    }

    /// Sync a batch of workspace users to the provider ahead of awards.
    pub async fn bulk_sync(
        &self,
        workspace_id: &str,
        user_ids: &[String],
    ) -> Result<BulkSyncReport, RewardError> {
        let config = self.provider_config(workspace_id).await?;
        Ok(self.sync.bulk_sync(&config, workspace_id, user_ids).await)
    }

    /// Register a push subscription with the provider for a workspace
    /// (configuration-time, not per-award).
    pub async fn subscribe_webhook(
        &self,
        workspace_id: &str,
        subscription: &WebhookSubscription,
    ) -> Result<String, RewardError> {
        let config = self.provider_config(workspace_id).await?;
        self.client.subscribe_webhook(&config, subscription).await
    }

    /// Single-sign-on link into the provider's reward portal, syncing the
    /// participant first if needed.
    pub async fn sso_link(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<String, RewardError> {
        let config = self.provider_config(workspace_id).await?;
        let participant_id = self
            .sync
            .ensure_synced(&config, user_id, workspace_id)
            .await?;
        self.client.sso_link(&config, &participant_id).await
    }

    /// Award points and, when requested, fan out to external fulfillment.
    ///
    /// The points accounting is synchronous and atomic; fulfillment failures
    /// are absorbed into the issuance state so the award itself never rolls
    /// back for provider trouble.
    pub async fn award(&self, request: &AwardRequest) -> Result<AwardOutcome, RewardError> {
        let Some(spec) = &request.fulfillment else {
            let entry = self.ledger.award(&Self::to_new_award(request, None)).await?;
            return Ok(AwardOutcome {
                entry: Some(entry),
                issuance: None,
            });
        };

        if request.amount <= 0 {
            return Err(RewardError::InvalidAmount);
        }

        let (issuance, created) = self
            .store
            .create_issuance(&NewIssuance {
                user_id: request.to_user_id.clone(),
                workspace_id: request.workspace_id.clone(),
                challenge_id: request.challenge_id.clone(),
                kind: spec.kind,
                amount: Some(request.amount),
                sku_id: spec.sku_id.clone(),
                currency: spec.currency.clone(),
                metadata: spec.metadata.clone(),
                dedupe_on_challenge: spec.dedupe_on_challenge,
            })
            .await
            .map_err(RewardError::storage)?;

        if !created {
            info!(
                "Duplicate completion trigger for user {} challenge {:?}, reusing issuance {}",
                request.to_user_id, request.challenge_id, issuance.id
            );
            return Ok(AwardOutcome {
                entry: None,
                issuance: Some(issuance),
            });
        }

        let entry = self
            .ledger
            .award(&Self::to_new_award(request, Some(issuance.id)))
            .await?;

        let issuance = match self.submit(issuance.id).await {
            Ok(issuance) => issuance,
            Err(err) => {
                // Absorbed: the award stands, the issuance records the
                // failure and can be retried later.
                warn!("Fulfillment for issuance {} deferred: {}", issuance.id, err);
                self.store
                    .get_issuance(issuance.id)
                    .await
                    .map_err(RewardError::storage)?
                    .ok_or(RewardError::NotFound)?
            }
        };

        Ok(AwardOutcome {
            entry: Some(entry),
            issuance: Some(issuance),
        })
    }

    fn to_new_award(request: &AwardRequest, issuance_id: Option<Uuid>) -> NewAward {
        NewAward {
            workspace_id: request.workspace_id.clone(),
            challenge_id: request.challenge_id.clone(),
            to_user_id: request.to_user_id.clone(),
            amount: request.amount,
            submission_id: request.submission_id.clone(),
            actor_id: request.actor_id.clone(),
            reason: request.reason.clone(),
            issuance_id,
        }
    }

    /// Create an issuance without awarding points (collaborator-driven, e.g.
    /// a challenge-completion event whose points were granted elsewhere).
    pub async fn create(&self, new: &NewIssuance) -> Result<RewardIssuance, RewardError> {
        let (issuance, created) = self
            .store
            .create_issuance(new)
            .await
            .map_err(RewardError::storage)?;
        if created {
            info!(
                "Created {} issuance {} for user {}",
                issuance.kind.as_str(),
                issuance.id,
                issuance.user_id
            );
        }
        Ok(issuance)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<RewardIssuance>, RewardError> {
        self.store
            .get_issuance(id)
            .await
            .map_err(RewardError::storage)
    }

    /// Drive one issuance through external fulfillment.
    pub async fn submit(&self, id: Uuid) -> Result<RewardIssuance, RewardError> {
        let issuance = self
            .store
            .get_issuance(id)
            .await
            .map_err(RewardError::storage)?
            .ok_or(RewardError::NotFound)?;

        // Idempotency guard: already issued, or an external reference is
        // recorded (dispatch succeeded even if our bookkeeping was cut
        // short), never call the provider again.
        if issuance.status == IssuanceStatus::Issued || issuance.external_id().is_some() {
            debug!("Issuance {} already dispatched, skipping submit", id);
            return Ok(issuance);
        }

        // Validation, configuration and identity sync happen before the
        // in-flight claim; their failures park the issuance as FAILED so the
        // operator retry path is uniform.
        let plan = match self.prepare(&issuance).await {
            Ok(plan) => plan,
            Err(err) => return self.park(id, err).await,
        };

        // Per-issuance critical section.
        if !self
            .store
            .begin_processing(id)
            .await
            .map_err(RewardError::storage)?
        {
            return Err(RewardError::Conflict(format!(
                "issuance {} is not pending (already in flight or terminal)",
                id
            )));
        }

        if let Err(err) = self.dispatch(&issuance, &plan).await {
            self.store
                .mark_failed(id, &err.to_string())
                .await
                .map_err(RewardError::storage)?;
            return Err(err);
        }

        self.store
            .get_issuance(id)
            .await
            .map_err(RewardError::storage)?
            .ok_or(RewardError::NotFound)
    }

    /// Operator retry: only FAILED issuances reset to PENDING (external ids
    /// and error cleared) and go through submit again.
    pub async fn retry(&self, id: Uuid) -> Result<RewardIssuance, RewardError> {
        let reset = self
            .store
            .reset_for_retry(id)
            .await
            .map_err(RewardError::storage)?;
        if !reset {
            return Err(RewardError::InvalidState(format!(
                "issuance {} is not in FAILED state",
                id
            )));
        }
        info!("Issuance {} reset for retry", id);
        self.submit(id).await
    }

    async fn park(
        &self,
        id: Uuid,
        err: RewardError,
    ) -> Result<RewardIssuance, RewardError> {
        self.store
            .mark_failed(id, &err.to_string())
            .await
            .map_err(RewardError::storage)?;
        Err(err)
    }

    /// Steps 2–4 of submission: payload validation by kind, workspace
    /// provider configuration, participant identity sync. Produces the
    /// provider call to make, with its deterministic idempotency key.
    async fn prepare(&self, issuance: &RewardIssuance) -> Result<DispatchPlan, RewardError> {
        let call = match issuance.kind {
            IssuanceKind::Points => {
                let amount = issuance.amount.unwrap_or(0);
                if amount <= 0 {
                    return Err(RewardError::InvalidAmount);
                }
                PlannedCall::Adjustment(
                    AdjustmentRequest {
                        amount,
                        kind: "credit".into(),
                        description: format!("challenge reward {}", issuance.id),
                        metadata: issuance.metadata.clone(),
                    },
                    idempotency_key(issuance.id, "adjustment"),
                )
            }
            IssuanceKind::Sku => {
                let sku = issuance
                    .sku_id
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| RewardError::ValidationError(vec!["SkuId".into()]))?;

                let participant = self.participant_for(issuance).await?;
                let shipping = match ShippingAddress::try_from_participant(&participant) {
                    Ok(shipping) => shipping,
                    Err(RewardError::ValidationError(fields)) => {
                        // Tell the responsible collaborator to chase the
                        // address before any network call is attempted.
                        self.notifier
                            .shipping_address_needed(&participant, &fields)
                            .await;
                        return Err(RewardError::ValidationError(fields));
                    }
                    Err(other) => return Err(other),
                };

                PlannedCall::Transaction(
                    TransactionRequest {
                        products: vec![ProductLine {
                            sku: sku.to_string(),
                            quantity: 1,
                        }],
                        shipping,
                        issue_points: true,
                        metadata: issuance.metadata.clone(),
                    },
                    idempotency_key(issuance.id, "transaction"),
                )
            }
            IssuanceKind::Monetary => {
                return Err(RewardError::Unsupported("monetary".into()));
            }
        };

        let config = self.provider_config(&issuance.workspace_id).await?;

        let participant_id = self
            .sync
            .ensure_synced(&config, &issuance.user_id, &issuance.workspace_id)
            .await?;

        Ok(DispatchPlan {
            config,
            participant_id,
            call,
        })
    }

    async fn participant_for(
        &self,
        issuance: &RewardIssuance,
    ) -> Result<Participant, RewardError> {
        self.store
            .get_participant(&issuance.user_id, &issuance.workspace_id)
            .await
            .map_err(RewardError::storage)?
            .ok_or_else(|| {
                RewardError::ParticipantSyncFailed(format!(
                    "no participant record for user {} in workspace {}",
                    issuance.user_id, issuance.workspace_id
                ))
            })
    }

    /// Steps 6–7: call the provider and record the outcome. A synchronous
    /// completion goes straight to ISSUED/COMPLETED; an asynchronous accept
    /// records the external reference and leaves the issuance for the
    /// reconciliation job.
    async fn dispatch(
        &self,
        issuance: &RewardIssuance,
        plan: &DispatchPlan,
    ) -> Result<(), RewardError> {
        match &plan.call {
            PlannedCall::Adjustment(request, key) => {
                let accepted = self
                    .client
                    .create_adjustment(&plan.config, &plan.participant_id, request, key)
                    .await?;
                self.finalize(issuance, &accepted, false).await
            }
            PlannedCall::Transaction(request, key) => {
                let accepted = self
                    .client
                    .create_transaction(&plan.config, &plan.participant_id, request, key)
                    .await?;
                self.finalize(issuance, &accepted, true).await
            }
        }
    }

    async fn finalize(
        &self,
        issuance: &RewardIssuance,
        accepted: &ProviderAccepted,
        is_transaction: bool,
    ) -> Result<(), RewardError> {
        let (transaction_id, adjustment_id) = if is_transaction {
            (Some(accepted.id.as_str()), None)
        } else {
            (None, Some(accepted.id.as_str()))
        };

        let mapped = accepted
            .status
            .as_deref()
            .map(map_provider_status)
            .unwrap_or(ExternalStatus::Completed);

        if mapped == ExternalStatus::Completed {
            self.store
                .mark_issued(issuance.id, transaction_id, adjustment_id)
                .await
                .map_err(RewardError::storage)?;
            info!(
                "Issuance {} fulfilled by provider ({})",
                issuance.id, accepted.id
            );
        } else {
            self.store
                .set_external_ref(issuance.id, transaction_id, adjustment_id)
                .await
                .map_err(RewardError::storage)?;
            self.store
                .apply_external_status(issuance.id, mapped, None)
                .await
                .map_err(RewardError::storage)?;
            info!(
                "Issuance {} accepted by provider ({}), awaiting {}",
                issuance.id,
                accepted.id,
                mapped.as_str()
            );
        }
        Ok(())
    }
}
