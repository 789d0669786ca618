//! Typed error taxonomy for the rewards core.
//!
//! Retry decisions pattern-match on these variants instead of inspecting
//! error message text, so classification is exhaustive.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RewardError {
    #[error("amount must be a positive integer")]
    InvalidAmount,

    /// Reserved: budget enforcement is advisory, awards never raise this.
    #[error("allocation would exceed the configured budget")]
    BudgetExceeded,

    #[error("fulfillment is not configured for workspace {0}")]
    NotConfigured(String),

    #[error("participant sync failed: {0}")]
    ParticipantSyncFailed(String),

    #[error("unsupported issuance kind: {0}")]
    Unsupported(String),

    #[error("provider rejected credentials")]
    Unauthorized,

    #[error("provider denied access")]
    Forbidden,

    #[error("provider resource not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("provider server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("validation failed: {}", .0.join(", "))]
    ValidationError(Vec<String>),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl RewardError {
    /// Retryable failures are transient provider/transport conditions; the
    /// rest fail immediately without consuming retry budget.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ServerError(_) | Self::NetworkError(_) | Self::RateLimited
        )
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Classify a provider HTTP response status into the taxonomy.
///
/// 2xx never reaches here; callers only classify non-success responses.
pub fn classify_status(status: u16, body: &str) -> RewardError {
    match status {
        401 => RewardError::Unauthorized,
        403 => RewardError::Forbidden,
        404 => RewardError::NotFound,
        409 => RewardError::Conflict(body.to_string()),
        429 => RewardError::RateLimited,
        500..=599 => RewardError::ServerError(format!("HTTP {}: {}", status, body)),
        _ => RewardError::ValidationError(vec![format!("HTTP {}: {}", status, body)]),
    }
}
