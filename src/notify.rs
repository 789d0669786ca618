//! Notification seam for collaborator-facing alerts.
//!
//! Delivery (email, in-app) lives outside this core; the trait lets the
//! fulfillment path signal that a user must complete their shipping address
//! before a catalog reward can ship.

use async_trait::async_trait;
use tracing::warn;

use crate::models::Participant;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// A catalog issuance was blocked by an incomplete shipping address.
    async fn shipping_address_needed(&self, participant: &Participant, missing_fields: &[String]);
}

/// Default sink: records the event in the log stream.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn shipping_address_needed(&self, participant: &Participant, missing_fields: &[String]) {
        warn!(
            "Shipping address incomplete for user {} in workspace {}: missing {}",
            participant.user_id,
            participant.workspace_id,
            missing_fields.join(", ")
        );
    }
}
