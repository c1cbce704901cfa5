//! Blocked-address snapshot.
//!
//! Readers load the current `Arc<HashSet>` without locking. A refresh
//! builds a complete new set and publishes it with one atomic store, so a
//! reader sees either the old set or the new one, never a mix.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::store::{GatewayStore, StoreError};

/// Process-wide set of blocked client addresses.
pub struct BlocklistCache {
    current: ArcSwap<HashSet<String>>,
}

impl BlocklistCache {
    /// Create an empty cache. Nothing is blocked until the first refresh.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(HashSet::new()),
        }
    }

    /// Create a cache pre-loaded with `addresses`.
    pub fn from_addresses<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cache = Self::new();
        cache.replace(addresses.into_iter().map(|a| normalize(a.as_ref())).collect());
        cache
    }

    /// Whether `address` is in the current snapshot.
    pub fn contains(&self, address: &str) -> bool {
        self.current.load().contains(address)
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<HashSet<String>> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Publish `addresses` as the whole new snapshot.
    pub fn replace(&self, addresses: HashSet<String>) {
        let size = addresses.len();
        self.current.store(Arc::new(addresses));
        metrics::record_blocklist_size(size);
    }

    /// Reload the snapshot from `store`.
    ///
    /// On failure the current snapshot stays in effect.
    pub async fn refresh(&self, store: &dyn GatewayStore) -> Result<usize, StoreError> {
        match store.list_active_blocked_addresses().await {
            Ok(rows) => {
                let addresses: HashSet<String> = rows.iter().map(|a| normalize(a)).collect();
                let size = addresses.len();
                self.replace(addresses);
                metrics::record_blocklist_refresh("success");
                tracing::info!(blocked_addresses = size, "Blocklist updated");
                tracing::debug!(addresses = ?self.snapshot(), "Blocklist contents");
                Ok(size)
            }
            Err(e) => {
                metrics::record_blocklist_refresh("failure");
                metrics::record_store_error("list_active_blocked_addresses");
                tracing::error!(
                    error = %e,
                    retained = self.len(),
                    "Failed to load blocklist, keeping previous snapshot"
                );
                Err(e)
            }
        }
    }
}

impl Default for BlocklistCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical text form of a stored address.
///
/// Parsable IPs are re-rendered so `0:0:0:0:0:0:0:1` matches `::1`; anything
/// else is kept as trimmed text.
fn normalize(address: &str) -> String {
    let trimmed = address.trim();
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical().to_string(),
        Err(_) => trimmed.to_string(),
    }
}
