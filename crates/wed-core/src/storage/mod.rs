pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::EventDocument;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Storage namespaces. Each holds at most one value per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// The user's event document
    Document,
    /// Last document that could not be written to `Document`
    Backup,
    /// "has submitted" flag, kept apart so it outlives document resets
    Submitted,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Document => "event_data",
            Namespace::Backup => "event_backup",
            Namespace::Submitted => "has_submitted_event",
        }
    }
}

/// Durable per-user key/value persistence.
///
/// Implementations only move strings around; the typed helpers below take
/// care of (de)serialization.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, ns: Namespace, user_id: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, ns: Namespace, user_id: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, ns: Namespace, user_id: &str) -> Result<(), StoreError>;

    async fn load_document(&self, user_id: &str) -> Result<Option<EventDocument>, StoreError> {
        self.load_json(Namespace::Document, user_id).await
    }

    async fn save_document(&self, user_id: &str, doc: &EventDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc)?;
        self.put(Namespace::Document, user_id, json).await
    }

    async fn load_backup(&self, user_id: &str) -> Result<Option<EventDocument>, StoreError> {
        self.load_json(Namespace::Backup, user_id).await
    }

    async fn save_backup(&self, user_id: &str, doc: &EventDocument) -> Result<(), StoreError> {
        let json = serde_json::to_string(doc)?;
        self.put(Namespace::Backup, user_id, json).await
    }

    async fn is_submitted(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .get(Namespace::Submitted, user_id)
            .await?
            .is_some_and(|v| v == "true"))
    }

    async fn set_submitted(&self, user_id: &str) -> Result<(), StoreError> {
        self.put(Namespace::Submitted, user_id, "true".to_string())
            .await
    }

    async fn load_json(
        &self,
        ns: Namespace,
        user_id: &str,
    ) -> Result<Option<EventDocument>, StoreError> {
        match self.get(ns, user_id).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }
}
