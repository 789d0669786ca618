//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Fulfillment provider base URLs and timeouts
//! - Retry/backoff tuning
//! - Reconciliation job cadence

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub reconcile: ReconcileSettings,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Fulfillment provider endpoints and client behavior. The environment a
/// workspace uses is part of its stored provider configuration; both base
/// URLs are fixed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub production_base_url: String,
    pub sandbox_base_url: String,
    /// Per-request timeout for outbound provider calls.
    pub request_timeout_secs: u64,
    /// Bearer tokens live 24h at the provider; refresh one hour early.
    pub token_ttl_hours: u64,
}

/// Retry/backoff tuning for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

/// Reconciliation job cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSettings {
    pub interval_secs: u64,
    pub batch_size: i64,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            batch_size: 50,
        }
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            // Use embedded default config
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            multiplier: self.retry.multiplier,
            jitter: true,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.provider.token_ttl_hours * 3600)
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded default config is validated at compile time,
        // so this should never fail. Using a fallback for robustness.
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            provider: ProviderSettings {
                production_base_url: "https://rewards.example.com/api/v1".to_string(),
                sandbox_base_url: "https://sandbox.rewards.example.com/api/v1".to_string(),
                request_timeout_secs: 30,
                token_ttl_hours: 23,
            },
            retry: RetrySettings::default(),
            reconcile: ReconcileSettings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_default_config_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert!(config.server.port > 0);
        assert!(config.retry.max_attempts >= 1);
        assert!(config.provider.token_ttl_hours < 24);
    }

    #[test]
    fn retry_policy_reflects_settings() {
        let config = Config::default();
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, config.retry.max_attempts);
        assert_eq!(
            policy.initial_delay,
            Duration::from_millis(config.retry.initial_delay_ms)
        );
    }
}
