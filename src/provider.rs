//! HTTP client for the reward-fulfillment provider.
//!
//! Wraps the provider's authenticated endpoints: point adjustments, catalog
//! transactions, participant upsert, status queries and webhook
//! subscriptions. Calls go through a transport seam so the retry, token
//! refresh and classification logic is testable without a network.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{classify_status, RewardError};
use crate::models::{Environment, Participant, ProviderConfig};
use crate::retry::RetryPolicy;
use crate::token_cache::TokenCache;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentRequest {
    pub amount: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductLine {
    pub sku: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShippingAddress {
    pub firstname: String,
    pub lastname: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl ShippingAddress {
    /// Build the provider shipping block from a local participant. Missing
    /// fields fail fast with a field-enumerated validation error so no
    /// network call is attempted for an unshippable order.
    pub fn try_from_participant(p: &Participant) -> Result<Self, RewardError> {
        let missing = p.missing_shipping_fields();
        if !missing.is_empty() {
            return Err(RewardError::ValidationError(
                missing.into_iter().map(String::from).collect(),
            ));
        }
        Ok(Self {
            firstname: p.first_name.clone().unwrap_or_default(),
            lastname: p.last_name.clone().unwrap_or_default(),
            address1: p.address1.clone().unwrap_or_default(),
            address2: p.address2.clone(),
            city: p.city.clone().unwrap_or_default(),
            state: p.state.clone().unwrap_or_default(),
            zip: p.zip.clone().unwrap_or_default(),
            country: p.country.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub products: Vec<ProductLine>,
    pub shipping: ShippingAddress,
    pub issue_points: bool,
    pub metadata: Value,
}

/// Participant payload for create/update. Optional fields absent locally are
/// omitted from the body rather than sent as empty strings.
#[derive(Debug, Clone, Serialize)]
pub struct ParticipantUpsert {
    pub email_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub program: String,
    pub external_id: String,
    pub meta: Value,
}

impl ParticipantUpsert {
    pub fn from_participant(p: &Participant, program_id: &str) -> Self {
        let opt = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Self {
            email_address: p.email.clone(),
            firstname: opt(&p.first_name),
            lastname: opt(&p.last_name),
            phone: opt(&p.phone),
            address1: opt(&p.address1),
            address2: opt(&p.address2),
            city: opt(&p.city),
            state: opt(&p.state),
            zip: opt(&p.zip),
            country: opt(&p.country),
            program: program_id.to_string(),
            external_id: format!("{}:{}", p.workspace_id, p.user_id),
            meta: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSubscription {
    pub url: String,
    pub event_types: Vec<String>,
    pub shared_secret: String,
}

/// Provider acknowledgement of a mutating call. Adjustments complete
/// synchronously (no status); catalog transactions are accepted and
/// fulfilled asynchronously, reporting an initial status string.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAccepted {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct UrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

// ============================================================================
// TRANSPORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub bearer: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Raw request execution. Implementations report transport-level problems
/// (timeouts, DNS, resets) as [`RewardError::NetworkError`]; HTTP status
/// classification is the client's job.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn execute(&self, base_url: &str, request: ApiRequest)
        -> Result<ApiResponse, RewardError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: std::time::Duration) -> Result<Self, RewardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RewardError::NetworkError(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn execute(
        &self,
        base_url: &str,
        request: ApiRequest,
    ) -> Result<ApiResponse, RewardError> {
        let url = format!("{}{}", base_url, request.path);
        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if let Some(token) = &request.bearer {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(key) = &request.idempotency_key {
            req = req.header("Idempotency-Key", key);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| RewardError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| RewardError::NetworkError(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ApiResponse { status, body })
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Deterministic idempotency key for one issuance operation, so a retried
/// call that already succeeded server-side is deduplicated by the provider.
pub fn idempotency_key(issuance_id: uuid::Uuid, operation: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issuance_id.as_bytes());
    hasher.update(b":");
    hasher.update(operation.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct FulfillmentClient {
    transport: Arc<dyn ProviderTransport>,
    tokens: Arc<TokenCache>,
    retry: RetryPolicy,
    production_base_url: String,
    sandbox_base_url: String,
}

impl FulfillmentClient {
    pub fn new(
        transport: Arc<dyn ProviderTransport>,
        tokens: Arc<TokenCache>,
        retry: RetryPolicy,
        production_base_url: impl Into<String>,
        sandbox_base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            tokens,
            retry,
            production_base_url: production_base_url.into(),
            sandbox_base_url: sandbox_base_url.into(),
        }
    }

    fn base_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.production_base_url,
            Environment::Sandbox => &self.sandbox_base_url,
        }
    }

    /// One classified round trip, retried per policy on transient failures.
    async fn dispatch(
        &self,
        environment: Environment,
        request: &ApiRequest,
    ) -> Result<Value, RewardError> {
        let base_url = self.base_url(environment);
        self.retry
            .run(&format!("provider {}", request.path), || {
                let request = request.clone();
                async move {
                    let response = self.transport.execute(base_url, request).await?;
                    if (200..300).contains(&response.status) {
                        Ok(response.body)
                    } else {
                        Err(classify_status(response.status, &response.body.to_string()))
                    }
                }
            })
            .await
    }

    /// Exchange the workspace api key for a bearer token, through the cache.
    async fn bearer_token(&self, config: &ProviderConfig) -> Result<String, RewardError> {
        if let Some(token) = self.tokens.get(&config.workspace_id, config.environment) {
            return Ok(token);
        }

        debug!(
            "Generating provider token for workspace {} ({})",
            config.workspace_id,
            config.environment.as_str()
        );
        let body = self
            .dispatch(
                config.environment,
                &ApiRequest {
                    method: HttpMethod::Post,
                    path: "/auth/token".into(),
                    bearer: None,
                    idempotency_key: None,
                    body: Some(serde_json::json!({
                        "api_key": config.api_key,
                        "program": config.program_id,
                    })),
                },
            )
            .await?;

        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| RewardError::ServerError(format!("bad token response: {}", e)))?;
        self.tokens.put(
            &config.workspace_id,
            config.environment,
            token.access_token.clone(),
        );
        Ok(token.access_token)
    }

    /// Authenticated call with refresh-on-401: the first Unauthorized clears
    /// the cached token and the call is repeated exactly once with a fresh
    /// one before the error surfaces.
    async fn authorized_call(
        &self,
        config: &ProviderConfig,
        mut request: ApiRequest,
    ) -> Result<Value, RewardError> {
        let token = self.bearer_token(config).await?;
        request.bearer = Some(token);

        match self.dispatch(config.environment, &request).await {
            Err(RewardError::Unauthorized) => {
                self.tokens
                    .invalidate(&config.workspace_id, config.environment);
                let fresh = self.bearer_token(config).await?;
                request.bearer = Some(fresh);
                self.dispatch(config.environment, &request).await
            }
            other => other,
        }
    }

    fn parse_accepted(body: Value) -> Result<ProviderAccepted, RewardError> {
        serde_json::from_value(body)
            .map_err(|e| RewardError::ServerError(format!("bad provider response: {}", e)))
    }

    /// `POST /participant/{id}/adjustment`: credit (or debit) points.
    /// Returns the provider adjustment id.
    pub async fn create_adjustment(
        &self,
        config: &ProviderConfig,
        participant_id: &str,
        request: &AdjustmentRequest,
        idempotency_key: &str,
    ) -> Result<ProviderAccepted, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: format!("/participant/{}/adjustment", participant_id),
                    bearer: None,
                    idempotency_key: Some(idempotency_key.to_string()),
                    body: Some(serde_json::to_value(request).expect("serializable request")),
                },
            )
            .await?;
        Self::parse_accepted(body)
    }

    /// `POST /participant/{id}/transaction`: fulfill catalog SKUs.
    /// Returns the provider transaction id.
    pub async fn create_transaction(
        &self,
        config: &ProviderConfig,
        participant_id: &str,
        request: &TransactionRequest,
        idempotency_key: &str,
    ) -> Result<ProviderAccepted, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: format!("/participant/{}/transaction", participant_id),
                    bearer: None,
                    idempotency_key: Some(idempotency_key.to_string()),
                    body: Some(serde_json::to_value(request).expect("serializable request")),
                },
            )
            .await?;
        Self::parse_accepted(body)
    }

    /// `POST /participant`: create. A Conflict carries the provider's body
    /// so the caller can adopt the already-existing participant id.
    pub async fn create_participant(
        &self,
        config: &ProviderConfig,
        payload: &ParticipantUpsert,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: "/participant".into(),
                    bearer: None,
                    idempotency_key: None,
                    body: Some(serde_json::to_value(payload).expect("serializable request")),
                },
            )
            .await?;
        Self::parse_accepted(body).map(|a| a.id)
    }

    /// `POST /participant/{id}`: update an existing provider participant.
    pub async fn update_participant(
        &self,
        config: &ProviderConfig,
        participant_id: &str,
        payload: &ParticipantUpsert,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: format!("/participant/{}", participant_id),
                    bearer: None,
                    idempotency_key: None,
                    body: Some(serde_json::to_value(payload).expect("serializable request")),
                },
            )
            .await?;
        Self::parse_accepted(body).map(|a| a.id)
    }

    /// `POST /participant/{id}/sso`: short-lived single-sign-on link into
    /// the provider's reward portal for a synced participant.
    pub async fn sso_link(
        &self,
        config: &ProviderConfig,
        participant_id: &str,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: format!("/participant/{}/sso", participant_id),
                    bearer: None,
                    idempotency_key: None,
                    body: None,
                },
            )
            .await?;
        let parsed: UrlResponse = serde_json::from_value(body)
            .map_err(|e| RewardError::ServerError(format!("bad provider response: {}", e)))?;
        Ok(parsed.url)
    }

    /// `GET /adjustment/{id}`: provider-defined status string.
    pub async fn adjustment_status(
        &self,
        config: &ProviderConfig,
        adjustment_id: &str,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Get,
                    path: format!("/adjustment/{}", adjustment_id),
                    bearer: None,
                    idempotency_key: None,
                    body: None,
                },
            )
            .await?;
        let parsed: StatusResponse = serde_json::from_value(body)
            .map_err(|e| RewardError::ServerError(format!("bad provider response: {}", e)))?;
        Ok(parsed.status)
    }

    /// `GET /transaction/{id}`: provider-defined status string.
    pub async fn transaction_status(
        &self,
        config: &ProviderConfig,
        transaction_id: &str,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Get,
                    path: format!("/transaction/{}", transaction_id),
                    bearer: None,
                    idempotency_key: None,
                    body: None,
                },
            )
            .await?;
        let parsed: StatusResponse = serde_json::from_value(body)
            .map_err(|e| RewardError::ServerError(format!("bad provider response: {}", e)))?;
        Ok(parsed.status)
    }

    /// `POST /webhooks`: register a push subscription for lifecycle events.
    /// Configuration-time, not per-award.
    pub async fn subscribe_webhook(
        &self,
        config: &ProviderConfig,
        subscription: &WebhookSubscription,
    ) -> Result<String, RewardError> {
        let body = self
            .authorized_call(
                config,
                ApiRequest {
                    method: HttpMethod::Post,
                    path: "/webhooks".into(),
                    bearer: None,
                    idempotency_key: None,
                    body: Some(serde_json::to_value(subscription).expect("serializable request")),
                },
            )
            .await?;
        Self::parse_accepted(body).map(|a| a.id)
    }
}

// ============================================================================
// TEST SUPPORT
// ============================================================================


#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;
    use crate::models::SyncStatus;
    use std::time::Duration;
    use uuid::Uuid;

    fn client(transport: Arc<MockTransport>) -> FulfillmentClient {
        FulfillmentClient::new(
            transport,
            Arc::new(TokenCache::new(Duration::from_secs(3600))),
            RetryPolicy {
                max_attempts: 3,
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                multiplier: 2.0,
                jitter: false,
            },
            "https://rewards.example.com/api",
            "https://sandbox.rewards.example.com/api",
        )
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

    fn adjustment() -> AdjustmentRequest {
        AdjustmentRequest {
            amount: 50,
            kind: "credit".into(),
            description: "challenge award".into(),
            metadata: Value::Null,
        }
    }

    #[tokio::test]
    async fn adjustment_fetches_token_then_posts() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok-1"}));
        transport.push_response(201, serde_json::json!({"id": "adj-9"}));

        let client = client(transport.clone());
        let accepted = client
            .create_adjustment(&config(), "p-1", &adjustment(), "idem-key")
            .await
            .unwrap();
        assert_eq!(accepted.id, "adj-9");
        assert!(accepted.status.is_none());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/auth/token");
        assert_eq!(requests[1].path, "/participant/p-1/adjustment");
        assert_eq!(requests[1].bearer.as_deref(), Some("tok-1"));
        assert_eq!(requests[1].idempotency_key.as_deref(), Some("idem-key"));
    }

    #[tokio::test]
    async fn second_call_reuses_the_cached_token() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok-1"}));
        transport.push_response(201, serde_json::json!({"id": "adj-1"}));
        transport.push_response(201, serde_json::json!({"id": "adj-2"}));

        let client = client(transport.clone());
        client
            .create_adjustment(&config(), "p-1", &adjustment(), "k1")
            .await
            .unwrap();
        client
            .create_adjustment(&config(), "p-1", &adjustment(), "k2")
            .await
            .unwrap();

        // One token fetch, two adjustments.
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn unauthorized_refreshes_the_token_exactly_once() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "stale"}));
        transport.push_response(401, Value::Null);
        transport.push_response(200, serde_json::json!({"access_token": "fresh"}));
        transport.push_response(201, serde_json::json!({"id": "adj-1"}));

        let client = client(transport.clone());
        let accepted = client
            .create_adjustment(&config(), "p-1", &adjustment(), "k")
            .await
            .unwrap();
        assert_eq!(accepted.id, "adj-1");

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[3].bearer.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn persistent_unauthorized_surfaces_after_one_refresh() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "stale"}));
        transport.push_response(401, Value::Null);
        transport.push_response(200, serde_json::json!({"access_token": "fresh"}));
        transport.push_response(401, Value::Null);

        let client = client(transport.clone());
        let result = client
            .create_adjustment(&config(), "p-1", &adjustment(), "k")
            .await;
        assert!(matches!(result, Err(RewardError::Unauthorized)));
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test]
    async fn server_errors_are_retried_with_the_same_idempotency_key() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(503, Value::String("unavailable".into()));
        transport.push_response(503, Value::String("unavailable".into()));
        transport.push_response(201, serde_json::json!({"id": "adj-1"}));

        let client = client(transport.clone());
        let accepted = client
            .create_adjustment(&config(), "p-1", &adjustment(), "stable-key")
            .await
            .unwrap();
        assert_eq!(accepted.id, "adj-1");

        let requests = transport.requests.lock().unwrap();
        let keys: Vec<_> = requests[1..]
            .iter()
            .map(|r| r.idempotency_key.clone().unwrap())
            .collect();
        assert_eq!(keys, vec!["stable-key"; 3]);
    }

    #[tokio::test]
    async fn timeouts_are_retried_as_network_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_error(RewardError::NetworkError("request timed out".into()));
        transport.push_response(201, serde_json::json!({"id": "adj-1"}));

        let client = client(transport.clone());
        let accepted = client
            .create_adjustment(&config(), "p-1", &adjustment(), "k")
            .await
            .unwrap();
        assert_eq!(accepted.id, "adj-1");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn bad_request_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport.push_response(200, serde_json::json!({"access_token": "tok"}));
        transport.push_response(400, Value::String("bad sku".into()));

        let client = client(transport.clone());
        let result = client
            .create_adjustment(&config(), "p-1", &adjustment(), "k")
            .await;
        assert!(matches!(result, Err(RewardError::ValidationError(_))));
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn idempotency_keys_are_deterministic_per_operation() {
        let id = Uuid::new_v4();
        assert_eq!(idempotency_key(id, "adjustment"), idempotency_key(id, "adjustment"));
        assert_ne!(idempotency_key(id, "adjustment"), idempotency_key(id, "transaction"));
        assert_ne!(
            idempotency_key(id, "adjustment"),
            idempotency_key(Uuid::new_v4(), "adjustment")
        );
    }

    #[test]
    fn shipping_address_requires_every_field() {
        let participant = Participant {
            user_id: "u1".into(),
            workspace_id: "w1".into(),
            email: "u1@example.com".into(),
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            phone: None,
            address1: Some("1 Analytical Way".into()),
            address2: None,
            city: None,
            state: Some("LDN".into()),
            zip: Some("EC1".into()),
            country: Some("GB".into()),
            external_participant_id: None,
            sync_status: SyncStatus::Synced,
            last_sync_at: None,
        };

        let err = ShippingAddress::try_from_participant(&participant).unwrap_err();
        match err {
            RewardError::ValidationError(fields) => assert_eq!(fields, vec!["City"]),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn optional_participant_fields_are_omitted_not_empty() {
        let participant = Participant {
            user_id: "u1".into(),
            workspace_id: "w1".into(),
            email: "u1@example.com".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            phone: Some("".into()),
            address1: None,
            address2: None,
            city: None,
            state: None,
            zip: None,
            country: None,
            external_participant_id: None,
            sync_status: SyncStatus::NotSynced,
            last_sync_at: None,
        };

        let payload = ParticipantUpsert::from_participant(&participant, "prog-1");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["firstname"], "Ada");
        assert!(json.get("lastname").is_none());
        // Blank strings are treated as absent.
        assert!(json.get("phone").is_none());
        assert_eq!(json["program"], "prog-1");
        assert_eq!(json["external_id"], "w1:u1");
    }
}
