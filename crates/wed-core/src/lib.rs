pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod session;
pub mod storage;
pub mod sync;
pub mod views;

pub use error::{RemoteError, RequiredField, StoreError, SyncError};
pub use models::{EventDocument, Field};
pub use sync::{EventSync, SubmissionReceipt, UpdateOutcome};
