//! Process-local registry of live session tokens.
//!
//! Entries are written only on token issuance, read on validation, and
//! removed by a sweep. The sweep is opportunistic: it runs at most once
//! per configured interval, lazily checked on incoming validations, so
//! no dedicated timer task is needed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tracing::debug;

/// Binding metadata for one issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    /// Device fingerprint hash bound at issuance.
    pub fingerprint: String,

    /// IP hash bound at issuance.
    pub ip_hash: String,

    /// Wall-clock issuance time, for logs and status queries.
    pub created_at: DateTime<Utc>,
}

/// Internal entry carrying a monotonic clock for sweeping.
struct RegistryEntry {
    binding: SessionBinding,
    registered: Instant,
}

/// Concurrently-accessed table mapping token string to its binding.
pub struct SessionRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
    last_sweep: Mutex<Instant>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Register a binding for a newly issued token.
    pub async fn insert(&self, token: &str, binding: SessionBinding) {
        let mut entries = self.entries.write().await;
        entries.insert(
            token.to_string(),
            RegistryEntry {
                binding,
                registered: Instant::now(),
            },
        );
    }

    /// Look up the binding for a token.
    pub async fn get(&self, token: &str) -> Option<SessionBinding> {
        let entries = self.entries.read().await;
        entries.get(token).map(|e| e.binding.clone())
    }

    /// Remove one token's binding. Returns true if it existed.
    pub async fn remove(&self, token: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(token).is_some()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// True if no entries are registered.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove all entries older than `max_age`, returning the count removed.
    ///
    /// Runs independently of each token's embedded expiry, as defense
    /// in depth against tokens that never get validated again.
    pub async fn sweep(&self, max_age: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.registered.elapsed() <= max_age);
        let removed = before - entries.len();

        if removed > 0 {
            debug!(removed, remaining = entries.len(), "Session registry swept");
        }
        removed
    }

    /// Sweep if at least `interval` has passed since the last sweep.
    ///
    /// Returns `Some(removed)` when a sweep ran, `None` when skipped.
    /// The interval check and timestamp update are atomic, so concurrent
    /// callers never double-sweep.
    pub async fn maybe_sweep(&self, max_age: Duration, interval: Duration) -> Option<usize> {
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < interval {
                return None;
            }
            *last = Instant::now();
        }
        Some(self.sweep(max_age).await)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
