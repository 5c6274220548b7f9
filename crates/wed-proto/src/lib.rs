use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Review state of an event row on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

/// Payload inserted into the `events` table when a couple submits their event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubmission {
    /// Opaque id generated on the device, used by the backend to spot retries
    pub mobile_app_id: Uuid,
    pub user_id: String,
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,
    pub client_email: String,
    pub event_type: String,
    pub event_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_price: Option<f64>,
    pub guest_range: String,
    #[serde(rename = "guestCount")]
    pub guest_count: u32,
    pub schedule: Vec<SegmentRow>,
    pub budget: Vec<ExpenseRow>,
    #[serde(rename = "eSignature")]
    pub e_signature: String,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRow {
    pub id: String,
    pub name: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRow {
    pub id: String,
    pub category: String,
    pub amount: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_uri: Option<String>,
}

/// Dependent row written to `event_guests` after the event itself was accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuestRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
    pub guest_id: String,
    pub name: String,
    pub status: String,
    pub invite_link: String,
}

/// Primary key of an inserted event. Depending on the table definition this
/// is either a serial integer or a text/uuid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Int(id) => write!(f, "{}", id),
            EventId::Text(id) => f.write_str(id),
        }
    }
}

/// Row returned by the backend for a successful insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertedEvent {
    pub id: EventId,
    #[serde(default)]
    pub status: Option<ApprovalStatus>,
}

/// Keys that belong to the backend row rather than to the event document
pub const REMOTE_METADATA_KEYS: &[&str] = &[
    "id",
    "user_id",
    "status",
    "mobile_app_id",
    "submitted_at",
    "created_at",
    "updated_at",
];
