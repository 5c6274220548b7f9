use std::fmt;
use thiserror::Error;

/// Fields that must be filled in before an event can be submitted, in the
/// order the wizard asks for them. The event type is absent: it defaults to
/// a wedding and so can never be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    EventDate,
    GuestRange,
    ClientName,
    ClientEmail,
    ESignature,
    Budget,
    Schedule,
}

impl RequiredField {
    pub fn as_str(self) -> &'static str {
        match self {
            RequiredField::EventDate => "event_date",
            RequiredField::GuestRange => "guest_range",
            RequiredField::ClientName => "client_name",
            RequiredField::ClientEmail => "client_email",
            RequiredField::ESignature => "eSignature",
            RequiredField::Budget => "budget",
            RequiredField::Schedule => "schedule",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of the local document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt stored document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage worker failed: {0}")]
    Worker(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures talking to the event backend
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("no backend configured")]
    Offline,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing required fields: {}", join_fields(.missing))]
    Validation { missing: Vec<RequiredField> },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("no signed-in user")]
    NoSession,

    #[error("event was already submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SyncError {
    /// Fields reported by a validation failure, empty for any other error
    pub fn missing_fields(&self) -> &[RequiredField] {
        match self {
            SyncError::Validation { missing } => missing,
            _ => &[],
        }
    }
}

fn join_fields(fields: &[RequiredField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_every_field() {
        let err = SyncError::Validation {
            missing: vec![
                RequiredField::ESignature,
                RequiredField::Budget,
                RequiredField::Schedule,
            ],
        };
        assert_eq!(
            err.to_string(),
            "missing required fields: eSignature, budget, schedule"
        );
        assert_eq!(err.missing_fields().len(), 3);
        assert!(SyncError::NoSession.missing_fields().is_empty());
    }
}
