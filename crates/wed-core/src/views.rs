//! Read-only projections of an event document.
//!
//! Nothing here touches storage or the network; screens call these on the
//! document they already hold.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;
use wed_proto::{ApprovalStatus, EventSubmission, ExpenseRow, GuestRow, SegmentRow};

use crate::error::{RequiredField, SyncError};
use crate::models::{EventDocument, ExpenseStatus, GuestStatus};

/// Event type used when the wizard never asked for one
pub const DEFAULT_EVENT_TYPE: &str = "Wedding";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuestStats {
    pub total: usize,
    pub accepted: usize,
    pub declined: usize,
    pub pending: usize,
}

/// RSVP totals. Guests without a known answer count as pending.
pub fn guest_stats(doc: &EventDocument) -> GuestStats {
    let mut stats = GuestStats {
        total: doc.guests.len(),
        ..GuestStats::default()
    };
    for guest in &doc.guests {
        match guest.status {
            Some(GuestStatus::Accepted) => stats.accepted += 1,
            Some(GuestStatus::Declined) => stats.declined += 1,
            _ => stats.pending += 1,
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

/// Time left until the start (UTC midnight) of `date`
pub fn countdown(date: NaiveDate) -> Countdown {
    countdown_at(date, Utc::now())
}

pub fn countdown_at(date: NaiveDate, now: DateTime<Utc>) -> Countdown {
    let target = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let left = target.signed_duration_since(now);
    if left <= chrono::Duration::zero() {
        return Countdown::default();
    }
    let minutes = left.num_minutes();
    Countdown {
        days: minutes / (24 * 60),
        hours: (minutes / 60) % 24,
        minutes: minutes % 60,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total: f64,
    pub paid: f64,
    pub outstanding: f64,
    pub items: usize,
}

pub fn budget_summary(doc: &EventDocument) -> BudgetSummary {
    doc.budget
        .iter()
        .fold(BudgetSummary::default(), |mut summary, expense| {
            summary.total += expense.amount;
            summary.items += 1;
            match expense.status {
                ExpenseStatus::Paid => summary.paid += expense.amount,
                _ => summary.outstanding += expense.amount,
            }
            summary
        })
}

/// Guests that can still be added before reaching the top of the package's
/// guest range. Negative when the list is already over the limit.
pub fn package_headroom(doc: &EventDocument) -> Option<i64> {
    let range = doc.guest_range?;
    Some(i64::from(range.max) - doc.guests.len() as i64)
}

/// Facts about the submission that do not live in the document
#[derive(Debug, Clone)]
pub struct SummaryContext<'a> {
    pub user_id: &'a str,
    pub session_email: Option<&'a str>,
    pub submitted_at: DateTime<Utc>,
}

/// Id the backend uses to recognise repeated submissions of one draft
pub fn mobile_app_id(doc: &EventDocument, user_id: &str) -> Uuid {
    doc.draft_id
        .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, user_id.as_bytes()))
}

/// Flatten `doc` into the row inserted on submission.
///
/// Every missing required field is reported at once, in wizard order.
pub fn event_summary(
    doc: &EventDocument,
    ctx: &SummaryContext<'_>,
) -> Result<EventSubmission, SyncError> {
    let mut missing = Vec::new();

    let event_type = filled(doc.event_type.as_deref()).unwrap_or(DEFAULT_EVENT_TYPE);
    if doc.event_date.is_none() {
        missing.push(RequiredField::EventDate);
    }
    let guest_range = match doc.guest_range {
        Some(range) => Some(range.to_string()),
        None if !doc.guests.is_empty() => Some(doc.guests.len().to_string()),
        None => None,
    };
    if guest_range.is_none() {
        missing.push(RequiredField::GuestRange);
    }
    let client_name = filled(doc.client_name.as_deref());
    if client_name.is_none() {
        missing.push(RequiredField::ClientName);
    }
    let client_email = filled(doc.client_email.as_deref()).or(filled(ctx.session_email));
    if client_email.is_none() {
        missing.push(RequiredField::ClientEmail);
    }
    let e_signature = filled(doc.e_signature.as_deref());
    if e_signature.is_none() {
        missing.push(RequiredField::ESignature);
    }
    if doc.budget.is_empty() {
        missing.push(RequiredField::Budget);
    }
    if doc.schedule.is_empty() {
        missing.push(RequiredField::Schedule);
    }

    let (Some(event_date), Some(guest_range), Some(client_name), Some(client_email), Some(e_signature)) =
        (doc.event_date, guest_range, client_name, client_email, e_signature)
    else {
        return Err(SyncError::Validation { missing });
    };
    if !missing.is_empty() {
        return Err(SyncError::Validation { missing });
    }

    Ok(EventSubmission {
        mobile_app_id: mobile_app_id(doc, ctx.user_id),
        user_id: ctx.user_id.to_string(),
        client_name: client_name.to_string(),
        partner_name: filled(doc.partner_name.as_deref()).map(str::to_string),
        client_email: client_email.to_string(),
        event_type: event_type.to_string(),
        event_date,
        package_price: doc.package_price,
        guest_range,
        guest_count: doc.guests.len() as u32,
        schedule: doc
            .schedule
            .iter()
            .map(|s| SegmentRow {
                id: s.id.clone(),
                name: s.name.clone(),
                venue: s.venue.clone(),
                start_time: s.start_time.clone(),
                end_time: s.end_time.clone(),
            })
            .collect(),
        budget: doc
            .budget
            .iter()
            .map(|e| ExpenseRow {
                id: e.id.clone(),
                category: e.category.clone(),
                amount: e.amount,
                status: e.status.as_str().to_string(),
                proof_uri: e.proof_uri.clone(),
            })
            .collect(),
        e_signature: e_signature.to_string(),
        status: ApprovalStatus::Pending,
        submitted_at: ctx.submitted_at,
    })
}

/// Rows for the guest table; the event id is filled in by the backend client
pub fn guest_rows(doc: &EventDocument) -> Vec<GuestRow> {
    doc.guests
        .iter()
        .map(|g| GuestRow {
            event_id: None,
            guest_id: g.id.clone(),
            name: g.name.clone(),
            status: g.status.unwrap_or(GuestStatus::Pending).as_str().to_string(),
            invite_link: g.invite_link.clone(),
        })
        .collect()
}

/// Treat blank strings like absent ones
fn filled(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
