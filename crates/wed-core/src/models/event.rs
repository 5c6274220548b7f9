use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::items::{unique_item_id, Expense, Guest, Segment};
use crate::error::SyncError;

/// Expected guest count, either a single number or an inclusive `min-max` range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestRange {
    pub min: u32,
    pub max: u32,
}

impl GuestRange {
    pub fn exact(count: u32) -> Self {
        Self {
            min: count,
            max: count,
        }
    }
}

impl fmt::Display for GuestRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.max)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

impl FromStr for GuestRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid guest range '{}'", s))
        };
        let range = match s.split_once('-') {
            Some((min, max)) => GuestRange {
                min: parse(min)?,
                max: parse(max)?,
            },
            None => GuestRange::exact(parse(s)?),
        };
        if range.min > range.max {
            return Err(format!("guest range '{}' has min above max", s));
        }
        Ok(range)
    }
}

impl Serialize for GuestRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.min == self.max {
            serializer.serialize_u32(self.max)
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for GuestRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(count) => Ok(GuestRange::exact(count)),
            Repr::Text(text) => text.parse().map_err(de::Error::custom),
        }
    }
}

/// One user's event as edited by the wizard and the post-approval screens.
///
/// Every known field is optional so that a partially completed wizard is a
/// valid document. Keys this client does not model are kept in `extra` and
/// written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_range: Option<GuestRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guests: Vec<Guest>,

    /// Stored copy of `guests.len()`, read by package limit checks
    #[serde(rename = "guestCount", default, skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<Segment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub budget: Vec<Expense>,

    #[serde(rename = "eSignature", default, skip_serializing_if = "Option::is_none")]
    pub e_signature: Option<String>,

    /// Assigned on the first persisted write, doubles as the submission's mobile app id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<Uuid>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl EventDocument {
    pub fn is_empty(&self) -> bool {
        *self == EventDocument::default()
    }

    /// Merge a single top-level field. Sequences are replaced, never merged.
    pub fn apply(&mut self, field: Field) {
        match field {
            Field::ClientName(v) => self.client_name = v,
            Field::PartnerName(v) => self.partner_name = v,
            Field::ClientEmail(v) => self.client_email = v,
            Field::EventType(v) => self.event_type = v,
            Field::EventDate(v) => self.event_date = v,
            Field::PackagePrice(v) => self.package_price = v,
            Field::GuestRange(v) => self.guest_range = v,
            Field::Guests(guests) => self.set_guests(guests),
            Field::Schedule(v) => self.schedule = v,
            Field::Budget(v) => self.budget = v,
            Field::ESignature(v) => self.e_signature = v,
            Field::Extra(key, Value::Null) => {
                self.extra.remove(&key);
            }
            Field::Extra(key, value) => {
                self.extra.insert(key, value);
            }
        }
    }

    /// Replace the guest list and keep `guestCount` in step with it
    pub fn set_guests(&mut self, guests: Vec<Guest>) {
        self.guest_count = Some(guests.len() as u32);
        self.guests = guests;
    }

    /// Fill in ids for items that arrived without one (older backend rows)
    pub fn assign_missing_ids(&mut self) {
        for idx in 0..self.guests.len() {
            if self.guests[idx].id.is_empty() {
                let id = unique_item_id(self.guests.iter().map(|g| g.id.as_str()));
                self.guests[idx].id = id;
            }
        }
        for idx in 0..self.schedule.len() {
            if self.schedule[idx].id.is_empty() {
                let id = unique_item_id(self.schedule.iter().map(|s| s.id.as_str()));
                self.schedule[idx].id = id;
            }
        }
        for idx in 0..self.budget.len() {
            if self.budget[idx].id.is_empty() {
                let id = unique_item_id(self.budget.iter().map(|e| e.id.as_str()));
                self.budget[idx].id = id;
            }
        }
    }

    /// Build a document from a backend `events` row, dropping row metadata
    pub fn from_remote_row(mut row: Map<String, Value>) -> Result<Self, serde_json::Error> {
        for key in wed_proto::REMOTE_METADATA_KEYS {
            row.remove(*key);
        }
        let mut doc: EventDocument = serde_json::from_value(Value::Object(row))?;
        doc.assign_missing_ids();
        if !doc.guests.is_empty() || doc.guest_count.is_some() {
            doc.guest_count = Some(doc.guests.len() as u32);
        }
        Ok(doc)
    }
}

/// A typed top-level field update.
///
/// `None` clears a scalar field. `guestCount` is not settable directly; it
/// follows `guests`.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    ClientName(Option<String>),
    PartnerName(Option<String>),
    ClientEmail(Option<String>),
    EventType(Option<String>),
    EventDate(Option<NaiveDate>),
    PackagePrice(Option<f64>),
    GuestRange(Option<GuestRange>),
    Guests(Vec<Guest>),
    Schedule(Vec<Segment>),
    Budget(Vec<Expense>),
    ESignature(Option<String>),
    /// A key the typed model does not know; `Null` removes it
    Extra(String, Value),
}

impl Field {
    /// Wire name of the field
    pub fn key(&self) -> &str {
        match self {
            Field::ClientName(_) => "client_name",
            Field::PartnerName(_) => "partner_name",
            Field::ClientEmail(_) => "client_email",
            Field::EventType(_) => "event_type",
            Field::EventDate(_) => "event_date",
            Field::PackagePrice(_) => "package_price",
            Field::GuestRange(_) => "guest_range",
            Field::Guests(_) => "guests",
            Field::Schedule(_) => "schedule",
            Field::Budget(_) => "budget",
            Field::ESignature(_) => "eSignature",
            Field::Extra(key, _) => key,
        }
    }

    /// Decode a `(key, json value)` pair into a typed field
    pub fn from_json(key: &str, value: Value) -> Result<Self, SyncError> {
        fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T, SyncError> {
            serde_json::from_value(value)
                .map_err(|e| SyncError::InvalidInput(format!("{}: {}", key, e)))
        }

        let field = match key {
            "client_name" => Field::ClientName(decode(key, value)?),
            "partner_name" => Field::PartnerName(decode(key, value)?),
            "client_email" => Field::ClientEmail(decode(key, value)?),
            "event_type" => Field::EventType(decode(key, value)?),
            "event_date" => Field::EventDate(decode(key, value)?),
            "package_price" => Field::PackagePrice(decode(key, value)?),
            "guest_range" => Field::GuestRange(decode(key, value)?),
            "guests" => Field::Guests(decode(key, value)?),
            "schedule" => Field::Schedule(decode(key, value)?),
            "budget" => Field::Budget(decode(key, value)?),
            "eSignature" => Field::ESignature(decode(key, value)?),
            "guestCount" | "draft_id" => {
                return Err(SyncError::InvalidInput(format!(
                    "{} is maintained by the synchronizer",
                    key
                )))
            }
            _ => Field::Extra(key.to_string(), value),
        };
        field.validate()?;
        Ok(field)
    }

    /// Parse a raw command line value. Plain text is accepted for string and
    /// date fields; anything else must be JSON.
    pub fn parse(key: &str, raw: &str) -> Result<Self, SyncError> {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(_) => Value::String(raw.to_string()),
        };
        // a name like "2026" parses as a JSON number
        let value = match value {
            Value::Number(n) if is_text_field(key) => Value::String(n.to_string()),
            Value::Bool(b) if is_text_field(key) => Value::String(b.to_string()),
            value => value,
        };
        Field::from_json(key, value)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        match self {
            Field::PackagePrice(Some(price)) if *price < 0.0 || !price.is_finite() => Err(
                SyncError::InvalidInput("package_price must be a non-negative number".into()),
            ),
            Field::Budget(expenses) => {
                if let Some(bad) = expenses
                    .iter()
                    .find(|e| e.amount < 0.0 || !e.amount.is_finite())
                {
                    return Err(SyncError::InvalidInput(format!(
                        "expense '{}' has a negative amount",
                        bad.category
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

fn is_text_field(key: &str) -> bool {
    matches!(
        key,
        "client_name" | "partner_name" | "client_email" | "event_type" | "eSignature"
    )
}
