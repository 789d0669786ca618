//! Challenge Rewards Server
//!
//! Awards points under budget accounting and fulfills rewards externally

use std::sync::Arc;
use std::time::Duration;

use challenge_rewards::config::Config;
use challenge_rewards::issuance::IssuanceService;
use challenge_rewards::notify::LogNotifier;
use challenge_rewards::provider::{FulfillmentClient, HttpTransport};
use challenge_rewards::reconcile::Reconciler;
use challenge_rewards::server::AppState;
use challenge_rewards::token_cache::TokenCache;
use challenge_rewards::PgStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Challenge Rewards Server");

    let config = Config::load()?;

    // Initialize PostgreSQL storage (required)
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        error!("DATABASE_URL environment variable is required");
        anyhow::anyhow!("DATABASE_URL not set")
    })?;

    let store = Arc::new(PgStore::new(&database_url).await?);
    info!("PostgreSQL storage initialized");

    let transport = Arc::new(
        HttpTransport::new(config.request_timeout())
            .map_err(|e| anyhow::anyhow!("failed to build provider transport: {}", e))?,
    );
    let client = Arc::new(FulfillmentClient::new(
        transport,
        Arc::new(TokenCache::new(config.token_ttl())),
        config.retry_policy(),
        config.provider.production_base_url.clone(),
        config.provider.sandbox_base_url.clone(),
    ));

    let service = Arc::new(IssuanceService::new(
        store.clone(),
        client.clone(),
        Arc::new(LogNotifier),
    ));
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        client,
        config.reconcile.batch_size,
    ));

    // Get server config from environment (overrides config.toml)
    let host = std::env::var("REWARDS_HOST").unwrap_or_else(|_| config.server.host.clone());
    let port: u16 = std::env::var("REWARDS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config.server.port);

    // Start the background reconciliation task
    let job = reconciler.clone();
    let interval_secs = config.reconcile.interval_secs;
    tokio::spawn(async move {
        // Initial pass shortly after boot
        tokio::time::sleep(Duration::from_secs(10)).await;

        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let summary = job.run_once().await;
            if summary.failed > 0 {
                error!(
                    "Reconciliation pass had {} failures ({} checked)",
                    summary.failed, summary.checked
                );
            }
        }
    });
    info!(
        "Background reconciliation started (every {} seconds)",
        interval_secs
    );

    let state = Arc::new(AppState {
        service,
        reconciler,
        store,
        started_at: std::time::Instant::now(),
    });

    challenge_rewards::server::run_server(&host, port, state).await?;

    Ok(())
}
