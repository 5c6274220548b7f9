#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use wed_core::error::RemoteError;
use wed_core::remote::RemoteBackend;
use wed_core::session::{SessionUser, SwitchableSession};
use wed_core::storage::MemoryStore;
use wed_core::{EventDocument, EventSync};
use wed_proto::{ApprovalStatus, EventId, EventSubmission, GuestRow, InsertedEvent};

pub const DURABLE_USER: &str = "5f0c1d8e-1f7b-4c54-9b8e-2f4a2d7c9a10";
pub const OTHER_USER: &str = "0a6b1e0f-93a4-4d8c-8a52-7b0f5f1d2c33";
pub const LEGACY_USER: &str = "1699999999123";

/// Backend double that records every call
#[derive(Default)]
pub struct FakeRemote {
    pub approved: Mutex<Option<EventDocument>>,
    pub fail_fetch: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_guests: AtomicBool,
    pub fetches: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub guest_calls: AtomicUsize,
    pub inserted: Mutex<Vec<EventSubmission>>,
    pub guest_rows: Mutex<Vec<GuestRow>>,
}

impl FakeRemote {
    pub fn with_approved(doc: EventDocument) -> Self {
        let remote = Self::default();
        *remote.approved.lock().unwrap() = Some(doc);
        remote
    }

    /// Every call that reached the backend, reads included
    pub fn calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst) + self.write_calls()
    }

    pub fn write_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst) + self.guest_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteBackend for FakeRemote {
    async fn fetch_approved_document(
        &self,
        _user_id: &str,
    ) -> Result<Option<EventDocument>, RemoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(self.approved.lock().unwrap().clone())
    }

    async fn insert_document(
        &self,
        payload: &EventSubmission,
    ) -> Result<InsertedEvent, RemoteError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(RemoteError::Rejected {
                status: 500,
                body: "insert failed".into(),
            });
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.push(payload.clone());
        Ok(InsertedEvent {
            id: EventId::Int(inserted.len() as i64),
            status: Some(ApprovalStatus::Pending),
        })
    }

    async fn insert_guest_records(
        &self,
        event_id: &EventId,
        guests: &[GuestRow],
    ) -> Result<(), RemoteError> {
        self.guest_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_guests.load(Ordering::SeqCst) {
            return Err(RemoteError::Offline);
        }
        self.guest_rows
            .lock()
            .unwrap()
            .extend(guests.iter().cloned().map(|mut row| {
                row.event_id = Some(event_id.clone());
                row
            }));
        Ok(())
    }
}

pub struct Harness {
    pub sync: EventSync,
    pub store: Arc<MemoryStore>,
    pub remote: Arc<FakeRemote>,
    pub session: Arc<SwitchableSession>,
}

impl Harness {
    pub fn new(store: MemoryStore, remote: FakeRemote) -> Self {
        Self::with_store(Arc::new(store), remote)
    }

    /// Harness over a store that other harnesses may share
    pub fn with_store(store: Arc<MemoryStore>, remote: FakeRemote) -> Self {
        let remote = Arc::new(remote);
        let session = Arc::new(SwitchableSession::new());
        let sync = EventSync::new(store.clone(), remote.clone(), session.clone());
        Self {
            sync,
            store,
            remote,
            session,
        }
    }

    pub fn signed_in(user_id: &str) -> Self {
        let harness = Self::new(MemoryStore::new(), FakeRemote::default());
        harness
            .session
            .sign_in(SessionUser::new(user_id).with_email("alex@example.com"));
        harness
    }
}
