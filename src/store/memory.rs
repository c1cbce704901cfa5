//! In-process store.
//!
//! Backs `database.url = "memory:"` and the test suite. Reads and writes can
//! be switched to fail so callers' error paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::store::{GatewayStore, RequestLogEntry, ResponseLogEntry, StoreError};

#[derive(Default)]
struct Tables {
    request_logs: Vec<RequestLogEntry>,
    response_logs: Vec<ResponseLogEntry>,
    blacklisted_ips: HashMap<String, bool>,
    configurations: HashMap<String, String>,
}

/// A store that keeps every table in memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    blocklist_queries: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or update a blocklist record.
    pub fn set_blocked(&self, address: &str, active: bool) {
        self.tables()
            .blacklisted_ips
            .insert(address.to_string(), active);
    }

    /// Insert or update a configuration row.
    pub fn set_config(&self, key: &str, value: &str) {
        self.tables()
            .configurations
            .insert(key.to_string(), value.to_string());
    }

    /// Make blocklist and configuration reads fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make request/response inserts fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of blocklist queries served or refused so far.
    pub fn blocklist_queries(&self) -> u64 {
        self.blocklist_queries.load(Ordering::SeqCst)
    }

    pub fn request_logs(&self) -> Vec<RequestLogEntry> {
        self.tables().request_logs.clone()
    }

    pub fn response_logs(&self) -> Vec<ResponseLogEntry> {
        self.tables().response_logs.clone()
    }

    /// Poll until at least `count` response rows exist or `timeout` passes.
    ///
    /// Response rows are written by detached tasks, so callers that just
    /// received a response have to wait for them.
    pub async fn wait_for_responses(&self, count: usize, timeout: Duration) -> Vec<ResponseLogEntry> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let logs = self.response_logs();
            if logs.len() >= count || tokio::time::Instant::now() >= deadline {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayStore for MemoryStore {
    async fn record_request(&self, entry: &RequestLogEntry) -> Result<(), StoreError> {
        self.check_writes()?;
        self.tables().request_logs.push(entry.clone());
        Ok(())
    }

    async fn record_response(&self, entry: &ResponseLogEntry) -> Result<(), StoreError> {
        self.check_writes()?;
        self.tables().response_logs.push(entry.clone());
        Ok(())
    }

    async fn list_active_blocked_addresses(&self) -> Result<Vec<String>, StoreError> {
        self.blocklist_queries.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        let tables = self.tables();
        Ok(tables
            .blacklisted_ips
            .iter()
            .filter(|(_, active)| **active)
            .map(|(address, _)| address.clone())
            .collect())
    }

    async fn read_config_value(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_reads()?;
        Ok(self.tables().configurations.get(key).cloned())
    }
}
