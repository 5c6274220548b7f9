use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{DocumentStore, Namespace};
use crate::error::StoreError;

/// In-process store used by tests and previews.
///
/// Every call yields to the scheduler (or sleeps for `latency`) so that
/// concurrent callers really interleave, and writes to the document
/// namespace can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(Namespace, String), String>>,
    latency: Option<Duration>,
    fail_document_writes: AtomicBool,
    fail_removes: AtomicBool,
    fail_flag_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make writes to the document namespace fail until switched back off
    pub fn fail_document_writes(&self, fail: bool) {
        self.fail_document_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Make writes to the submitted namespace fail
    pub fn fail_flag_writes(&self, fail: bool) {
        self.fail_flag_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `put` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw value for inspection in tests
    pub fn raw(&self, ns: Namespace, user_id: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()?
            .get(&(ns, user_id.to_string()))
            .cloned()
    }

    async fn pause(&self) {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(Namespace, String), String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Worker("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, ns: Namespace, user_id: &str) -> Result<Option<String>, StoreError> {
        self.pause().await;
        Ok(self.entries()?.get(&(ns, user_id.to_string())).cloned())
    }

    async fn put(&self, ns: Namespace, user_id: &str, value: String) -> Result<(), StoreError> {
        self.pause().await;
        if ns == Namespace::Document && self.fail_document_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("document writes disabled".into()));
        }
        if ns == Namespace::Submitted && self.fail_flag_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("flag writes disabled".into()));
        }
        self.entries()?.insert((ns, user_id.to_string()), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, ns: Namespace, user_id: &str) -> Result<(), StoreError> {
        self.pause().await;
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("removes disabled".into()));
        }
        self.entries()?.remove(&(ns, user_id.to_string()));
        Ok(())
    }
}
