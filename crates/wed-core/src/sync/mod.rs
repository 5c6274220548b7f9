//! The event document synchronizer.
//!
//! `EventSync` owns the in-memory copy of the signed-in user's document and
//! is the only writer of the local store. Every mutation runs as one
//! read-modify-write cycle under the user's slot in [`UserLocks`]: re-check
//! the session, re-read the persisted document, apply the patch, persist,
//! publish. Submissions take a second per-user slot so that the submitted
//! flag check and the backend insert cannot interleave.

mod collections;
pub mod lock;
mod submit;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::{EventDocument, Field};
use crate::remote::RemoteBackend;
use crate::session::{SessionProbe, SessionUser};
use crate::storage::{DocumentStore, Namespace};

pub use lock::UserLocks;
pub use submit::SubmissionReceipt;

/// What happened to a requested mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Persisted; `version` is the synchronizer's write counter afterwards
    Applied { version: u64 },
    /// The store rejected the write. The patched document went to the
    /// backup slot and is still visible in memory.
    BackedUp,
    /// The patch did not change the document (duplicate guest, unknown id, same value)
    Unchanged,
    /// The signed-in user changed while the update waited for its slot
    Dropped,
    /// Nobody is signed in
    NoSession,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied { .. })
    }
}

pub struct EventSync {
    store: Arc<dyn DocumentStore>,
    remote: Arc<dyn RemoteBackend>,
    session: Arc<dyn SessionProbe>,
    locks: UserLocks,
    submissions: UserLocks,
    current: watch::Sender<EventDocument>,
    /// User the in-memory document belongs to
    owner: Mutex<Option<String>>,
    version: AtomicU64,
}

impl EventSync {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        remote: Arc<dyn RemoteBackend>,
        session: Arc<dyn SessionProbe>,
    ) -> Self {
        let (current, _) = watch::channel(EventDocument::default());
        Self {
            store,
            remote,
            session,
            locks: UserLocks::new(),
            submissions: UserLocks::new(),
            current,
            owner: Mutex::new(None),
            version: AtomicU64::new(0),
        }
    }

    /// Snapshot of the in-memory document
    pub fn get_document(&self) -> EventDocument {
        self.current.borrow().clone()
    }

    /// Receiver that sees every published document
    pub fn subscribe(&self) -> watch::Receiver<EventDocument> {
        self.current.subscribe()
    }

    /// Owner of the in-memory document, if any
    pub fn current_user(&self) -> Option<String> {
        self.owner_guard().clone()
    }

    /// Number of successful persists so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Per-user slots currently held or waited on
    pub fn active_locks(&self) -> usize {
        self.locks.active_slots() + self.submissions.active_slots()
    }

    /// Load the signed-in user's document into memory.
    ///
    /// Durable accounts first ask the backend for an approved event and, if
    /// there is one, adopt it as the local copy. Otherwise the local record
    /// is used. Never fails: anything unreadable yields an empty document.
    pub async fn load_document(&self) -> EventDocument {
        let Some(user) = self.active_user().await else {
            debug!("No valid session, clearing in-memory document");
            self.clear_in_memory();
            return EventDocument::default();
        };
        let user_id = user.user_id.as_str();

        if user.is_durable_account() {
            match self.remote.fetch_approved_document(user_id).await {
                Ok(Some(remote_doc)) => {
                    info!(user_id, "Adopting approved event from backend");
                    return self.adopt_remote(user_id, remote_doc).await;
                }
                Ok(None) => debug!(user_id, "No approved event on backend"),
                Err(e) => warn!(user_id, "Approved event lookup failed, using local copy: {}", e),
            }
        } else {
            debug!(user_id, "Legacy account id, skipping backend lookup");
        }

        let doc = match self.store.load_document(user_id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => EventDocument::default(),
            Err(e) => {
                warn!(user_id, "Ignoring unreadable local document: {}", e);
                EventDocument::default()
            }
        };
        self.publish_if_current(user_id, doc.clone()).await;
        doc
    }

    /// Replace one top-level field
    pub async fn update_field(&self, field: Field) -> Result<UpdateOutcome, SyncError> {
        self.update_fields(vec![field]).await
    }

    /// Replace several top-level fields in a single cycle
    pub async fn update_fields(&self, fields: Vec<Field>) -> Result<UpdateOutcome, SyncError> {
        for field in &fields {
            field.validate()?;
        }
        self.modify_current(move |doc| {
            for field in fields {
                doc.apply(field);
            }
            Ok(())
        })
        .await
    }

    /// Persist the submitted flag for the signed-in user
    pub async fn mark_submitted(&self) -> Result<(), SyncError> {
        let user = self.active_user().await.ok_or(SyncError::NoSession)?;
        self.store.set_submitted(&user.user_id).await?;
        Ok(())
    }

    /// Whether the signed-in user has submitted; `false` when signed out
    pub async fn is_submitted(&self) -> Result<bool, SyncError> {
        match self.active_user().await {
            Some(user) => Ok(self.store.is_submitted(&user.user_id).await?),
            None => Ok(false),
        }
    }

    /// Delete the document, backup and submitted flag of `user_id`.
    ///
    /// Best effort: each removal is attempted and failures are only logged.
    pub async fn reset_for_user(&self, user_id: &str) {
        self.locks
            .run_exclusive(user_id, || self.clear_user_data(user_id))
            .await;
        info!(user_id, "Reset local event data");
    }

    /// Move the backup slot of `user_id` back into the primary slot.
    ///
    /// Returns the restored document, or `None` when there is no backup.
    pub async fn recover_from_backup(
        &self,
        user_id: &str,
    ) -> Result<Option<EventDocument>, SyncError> {
        self.locks
            .run_exclusive(user_id, || self.restore_backup(user_id))
            .await
    }

    /// Run `patch` against the signed-in user's freshly read document
    async fn modify_current<F>(&self, patch: F) -> Result<UpdateOutcome, SyncError>
    where
        F: FnOnce(&mut EventDocument) -> Result<(), SyncError> + Send,
    {
        let Some(user) = self.active_user().await else {
            debug!("Update requested without a valid session");
            return Ok(UpdateOutcome::NoSession);
        };
        self.modify(&user.user_id, patch).await
    }

    /// One read-modify-write cycle for `user_id`
    async fn modify<F>(&self, user_id: &str, patch: F) -> Result<UpdateOutcome, SyncError>
    where
        F: FnOnce(&mut EventDocument) -> Result<(), SyncError> + Send,
    {
        self.locks
            .run_exclusive(user_id, || self.modify_locked(user_id, patch))
            .await
    }

    async fn modify_locked<F>(&self, user_id: &str, patch: F) -> Result<UpdateOutcome, SyncError>
    where
        F: FnOnce(&mut EventDocument) -> Result<(), SyncError> + Send,
    {
        if !self.is_session_user(user_id).await {
            warn!(user_id, "Session changed while update was queued, dropping it");
            return Ok(UpdateOutcome::Dropped);
        }

        let (mut doc, pending_backup) = self.read_for_update(user_id).await;
        let before = doc.clone();
        patch(&mut doc)?;
        if doc == before {
            return Ok(UpdateOutcome::Unchanged);
        }
        if doc.draft_id.is_none() {
            doc.draft_id = Some(Uuid::new_v4());
        }

        let outcome = match self.store.save_document(user_id, &doc).await {
            Ok(()) => {
                let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(user_id, version, "Persisted event document");
                if pending_backup {
                    self.drop_backup(user_id).await;
                }
                UpdateOutcome::Applied { version }
            }
            Err(e) => {
                warn!(user_id, "Persisting event document failed, writing backup: {}", e);
                if let Err(e) = self.store.save_backup(user_id, &doc).await {
                    warn!(user_id, "Backup write failed as well: {}", e);
                }
                UpdateOutcome::BackedUp
            }
        };
        self.publish_if_current(user_id, doc).await;
        Ok(outcome)
    }

    async fn clear_user_data(&self, user_id: &str) {
        for ns in [Namespace::Document, Namespace::Backup, Namespace::Submitted] {
            if let Err(e) = self.store.remove(ns, user_id).await {
                warn!(user_id, namespace = ns.as_str(), "Failed to clear: {}", e);
            }
        }
        if self.owner_guard().as_deref() == Some(user_id) {
            self.current.send_replace(EventDocument::default());
        }
    }

    async fn restore_backup(&self, user_id: &str) -> Result<Option<EventDocument>, SyncError> {
        let Some(doc) = self.store.load_backup(user_id).await? else {
            return Ok(None);
        };
        self.store.save_document(user_id, &doc).await?;
        self.version.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.remove(Namespace::Backup, user_id).await {
            warn!(user_id, "Restored backup but could not clear it: {}", e);
        }
        info!(user_id, "Restored document from backup");
        self.publish_if_current(user_id, doc.clone()).await;
        Ok(Some(doc))
    }

    /// Base document for the next cycle of `user_id`.
    ///
    /// A backup left by a failed persist is newer than the primary slot and
    /// wins; the flag tells the caller to clear it once a persist succeeds.
    /// Falls back to the in-memory copy when the store has nothing usable
    /// and memory belongs to this user.
    async fn read_for_update(&self, user_id: &str) -> (EventDocument, bool) {
        match self.store.load_backup(user_id).await {
            Ok(Some(doc)) => {
                debug!(user_id, "Continuing from backup slot");
                return (doc, true);
            }
            Ok(None) => {}
            Err(e) => warn!(user_id, "Unreadable backup: {}", e),
        }
        match self.store.load_document(user_id).await {
            Ok(Some(doc)) => return (doc, false),
            Ok(None) => {}
            Err(e) => warn!(user_id, "Unreadable stored document: {}", e),
        }
        if self.owner_guard().as_deref() == Some(user_id) {
            (self.get_document(), false)
        } else {
            (EventDocument::default(), false)
        }
    }

    async fn drop_backup(&self, user_id: &str) {
        match self.store.remove(Namespace::Backup, user_id).await {
            Ok(()) => debug!(user_id, "Backup superseded by persisted document"),
            Err(e) => warn!(user_id, "Could not clear superseded backup: {}", e),
        }
    }

    /// Write an approved backend document to the local slot and publish it
    async fn adopt_remote(&self, user_id: &str, mut doc: EventDocument) -> EventDocument {
        let target = &mut doc;
        self.locks
            .run_exclusive(user_id, move || self.store_adopted(user_id, target))
            .await;
        self.publish_if_current(user_id, doc.clone()).await;
        doc
    }

    async fn store_adopted(&self, user_id: &str, doc: &mut EventDocument) {
        if doc.draft_id.is_none() {
            if let Ok(Some(local)) = self.store.load_document(user_id).await {
                doc.draft_id = local.draft_id;
            }
        }
        match self.store.save_document(user_id, doc).await {
            Ok(()) => {
                self.version.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => warn!(user_id, "Could not store approved event locally: {}", e),
        }
    }

    async fn active_user(&self) -> Option<SessionUser> {
        self.session
            .current_user()
            .await
            .filter(|user| user.is_valid && !user.user_id.is_empty())
    }

    async fn is_session_user(&self, user_id: &str) -> bool {
        self.active_user()
            .await
            .is_some_and(|user| user.user_id == user_id)
    }

    /// Publish `doc` unless the session moved on to someone else
    async fn publish_if_current(&self, user_id: &str, doc: EventDocument) {
        if !self.is_session_user(user_id).await {
            debug!(user_id, "Not publishing document of a signed-out user");
            return;
        }
        *self.owner_guard() = Some(user_id.to_string());
        self.current.send_replace(doc);
    }

    fn clear_in_memory(&self) {
        *self.owner_guard() = None;
        self.current.send_replace(EventDocument::default());
    }

    fn owner_guard(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.owner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
