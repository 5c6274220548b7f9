use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use wed_proto::EventId;

use super::EventSync;
use crate::error::SyncError;
use crate::session::SessionUser;
use crate::views::{self, SummaryContext};

/// Result of a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionReceipt {
    /// Primary key the backend gave the event row
    pub event_id: EventId,
    pub mobile_app_id: Uuid,
    /// `false` when the event went in but its guest rows did not
    pub guests_recorded: bool,
}

impl EventSync {
    /// Send the signed-in user's document to the backend for approval.
    ///
    /// Validation happens before any network traffic. Once the event row is
    /// accepted the guest rows follow on a best-effort basis and the local
    /// submitted flag is set. Submissions of one user run one at a time, so
    /// a second submit waiting behind a successful one sees the flag.
    pub async fn submit_document(&self) -> Result<SubmissionReceipt, SyncError> {
        let user = self.active_user().await.ok_or(SyncError::NoSession)?;
        self.submissions
            .run_exclusive(&user.user_id, || self.submit_exclusive(&user))
            .await
    }

    async fn submit_exclusive(&self, user: &SessionUser) -> Result<SubmissionReceipt, SyncError> {
        let user_id = user.user_id.as_str();
        if self.store.is_submitted(user_id).await? {
            return Err(SyncError::AlreadySubmitted);
        }

        let (doc, _) = self
            .locks
            .run_exclusive(user_id, || self.read_for_update(user_id))
            .await;
        let ctx = SummaryContext {
            user_id,
            session_email: user.email.as_deref(),
            submitted_at: Utc::now(),
        };
        let payload = views::event_summary(&doc, &ctx)?;

        let inserted = self.remote.insert_document(&payload).await?;
        info!(user_id, event_id = %inserted.id, "Event submitted for approval");

        let rows = views::guest_rows(&doc);
        let guests_recorded = match self.remote.insert_guest_records(&inserted.id, &rows).await {
            Ok(()) => true,
            Err(e) => {
                warn!(user_id, event_id = %inserted.id, "Guest rows were not recorded: {}", e);
                false
            }
        };

        // the backend already holds the event, a retry would duplicate it
        if let Err(e) = self.store.set_submitted(user_id).await {
            warn!(user_id, event_id = %inserted.id, "Could not record submitted flag: {}", e);
        }
        Ok(SubmissionReceipt {
            event_id: inserted.id,
            mobile_app_id: payload.mobile_app_id,
            guests_recorded,
        })
    }
}
