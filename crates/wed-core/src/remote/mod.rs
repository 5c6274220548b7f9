pub mod rest;

use async_trait::async_trait;
use wed_proto::{EventId, EventSubmission, GuestRow, InsertedEvent};

use crate::error::RemoteError;
use crate::models::EventDocument;

pub use rest::RestRemote;

/// The backend that stores the admin-visible copy of events
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Latest event of `user_id` that an admin has approved, if any
    async fn fetch_approved_document(
        &self,
        user_id: &str,
    ) -> Result<Option<EventDocument>, RemoteError>;

    async fn insert_document(&self, payload: &EventSubmission)
        -> Result<InsertedEvent, RemoteError>;

    async fn insert_guest_records(
        &self,
        event_id: &EventId,
        guests: &[GuestRow],
    ) -> Result<(), RemoteError>;
}

/// Stand-in used when no backend is configured: nothing is approved and
/// every write fails
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineRemote;

#[async_trait]
impl RemoteBackend for OfflineRemote {
    async fn fetch_approved_document(
        &self,
        _user_id: &str,
    ) -> Result<Option<EventDocument>, RemoteError> {
        Ok(None)
    }

    async fn insert_document(
        &self,
        _payload: &EventSubmission,
    ) -> Result<InsertedEvent, RemoteError> {
        Err(RemoteError::Offline)
    }

    async fn insert_guest_records(
        &self,
        _event_id: &EventId,
        _guests: &[GuestRow],
    ) -> Result<(), RemoteError> {
        Err(RemoteError::Offline)
    }
}
