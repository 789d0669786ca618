//! TTL cache for provider bearer tokens.
//!
//! Keyed by (workspace, environment) and injected into the fulfillment
//! client rather than living in process-global state. Entries are replaced
//! whole under the write lock, so a reader never observes a token that a
//! concurrent invalidation already dropped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::models::Environment;

#[derive(Clone)]
struct CachedToken {
    token: String,
    acquired_at: Instant,
}

pub struct TokenCache {
    entries: RwLock<HashMap<(String, Environment), CachedToken>>,
    ttl: Duration,
}

impl TokenCache {
    /// Provider tokens live 24h; default refresh margin caches them for 23.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, workspace_id: &str, environment: Environment) -> Option<String> {
        let entries = self.entries.read();
        let entry = entries.get(&(workspace_id.to_string(), environment))?;
        if entry.acquired_at.elapsed() < self.ttl {
            Some(entry.token.clone())
        } else {
            None
        }
    }

    pub fn put(&self, workspace_id: &str, environment: Environment, token: String) {
        self.entries.write().insert(
            (workspace_id.to_string(), environment),
            CachedToken {
                token,
                acquired_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for a workspace/environment, e.g. after a 401.
    pub fn invalidate(&self, workspace_id: &str, environment: Environment) {
        self.entries
            .write()
            .remove(&(workspace_id.to_string(), environment));
    }
}
