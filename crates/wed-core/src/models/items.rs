use chrono::Utc;
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};

/// Generate an item id: millisecond timestamp plus a random suffix
pub fn generate_item_id() -> String {
    format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        Alphanumeric
            .sample_string(&mut rand::thread_rng(), 6)
            .to_lowercase()
    )
}

/// Generate an id that does not collide with any of `taken`
pub(crate) fn unique_item_id<'a, I>(taken: I) -> String
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    loop {
        let id = generate_item_id();
        if !taken.clone().into_iter().any(|existing| existing == id) {
            return id;
        }
    }
}

/// RSVP state of a guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuestStatus {
    Pending,
    Accepted,
    Declined,
    /// Anything the backend sends that this client does not know about
    #[serde(other)]
    Unknown,
}

impl GuestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GuestStatus::Pending => "Pending",
            GuestStatus::Accepted => "Accepted",
            GuestStatus::Declined => "Declined",
            GuestStatus::Unknown => "Unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(GuestStatus::Pending),
            "accepted" => Some(GuestStatus::Accepted),
            "declined" => Some(GuestStatus::Declined),
            _ => None,
        }
    }
}

/// A single invited guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    #[serde(default)]
    pub id: String,

    pub name: String,

    /// `None` means the guest has not responded yet
    #[serde(default)]
    pub status: Option<GuestStatus>,

    #[serde(default)]
    pub invite_link: String,
}

/// Input for adding a guest; the id is assigned by the synchronizer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGuest {
    pub name: String,
    pub status: Option<GuestStatus>,
    pub invite_link: String,
}

impl NewGuest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Shallow patch applied to an existing guest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GuestPatch {
    pub name: Option<String>,
    pub status: Option<GuestStatus>,
    pub invite_link: Option<String>,
}

impl Guest {
    pub(crate) fn apply(&mut self, patch: GuestPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        if let Some(link) = patch.invite_link {
            self.invite_link = link;
        }
    }

    /// Two guests are the same invitation when name and invite link match
    pub fn same_invitation(&self, name: &str, invite_link: &str) -> bool {
        self.name == name && self.invite_link == invite_link
    }
}

/// Payment state of a budget line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpenseStatus {
    #[default]
    Pending,
    Paid,
    #[serde(other)]
    Other,
}

impl ExpenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExpenseStatus::Pending => "Pending",
            ExpenseStatus::Paid => "Paid",
            ExpenseStatus::Other => "Other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(ExpenseStatus::Pending),
            "paid" => Some(ExpenseStatus::Paid),
            _ => None,
        }
    }
}

/// A budget line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub status: ExpenseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewExpense {
    pub category: String,
    pub amount: f64,
    pub status: ExpenseStatus,
    pub proof_uri: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub status: Option<ExpenseStatus>,
    pub proof_uri: Option<String>,
}

impl Expense {
    pub(crate) fn apply(&mut self, patch: ExpensePatch) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(uri) = patch.proof_uri {
            self.proof_uri = Some(uri);
        }
    }
}

/// One block of the event day timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSegment {
    pub name: String,
    pub venue: String,
    pub start_time: String,
    pub end_time: String,
}
