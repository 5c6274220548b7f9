//! Guest, budget and schedule mutations.
//!
//! Each operation is computed from the document read inside the user's
//! slot, so two screens adding guests at the same time both land.

use tracing::{debug, warn};

use super::{EventSync, UpdateOutcome};
use crate::error::SyncError;
use crate::models::items::unique_item_id;
use crate::models::{
    Expense, ExpensePatch, Guest, GuestPatch, NewExpense, NewGuest, NewSegment, Segment,
};

impl EventSync {
    /// Append a guest. A guest with the same name and invite link already
    /// on the list makes this a no-op.
    pub async fn add_guest(&self, guest: NewGuest) -> Result<UpdateOutcome, SyncError> {
        let name = guest.name.trim().to_string();
        if name.is_empty() {
            return Err(SyncError::InvalidInput("guest name must not be empty".into()));
        }

        self.modify_current(move |doc| {
            if doc
                .guests
                .iter()
                .any(|g| g.same_invitation(&name, &guest.invite_link))
            {
                warn!(guest = %name, "Guest already invited, skipping");
                return Ok(());
            }
            let id = unique_item_id(doc.guests.iter().map(|g| g.id.as_str()));
            let mut guests = doc.guests.clone();
            guests.push(Guest {
                id,
                name,
                status: guest.status,
                invite_link: guest.invite_link,
            });
            doc.set_guests(guests);
            Ok(())
        })
        .await
    }

    pub async fn update_guest(
        &self,
        guest_id: &str,
        patch: GuestPatch,
    ) -> Result<UpdateOutcome, SyncError> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(SyncError::InvalidInput("guest name must not be empty".into()));
        }
        let guest_id = guest_id.to_string();

        self.modify_current(move |doc| {
            let mut guests = doc.guests.clone();
            match guests.iter_mut().find(|g| g.id == guest_id) {
                Some(guest) => guest.apply(patch),
                None => {
                    debug!(%guest_id, "No such guest, nothing to update");
                    return Ok(());
                }
            }
            doc.set_guests(guests);
            Ok(())
        })
        .await
    }

    pub async fn remove_guest(&self, guest_id: &str) -> Result<UpdateOutcome, SyncError> {
        let guest_id = guest_id.to_string();

        self.modify_current(move |doc| {
            if !doc.guests.iter().any(|g| g.id == guest_id) {
                debug!(%guest_id, "No such guest, nothing to remove");
                return Ok(());
            }
            let guests = doc
                .guests
                .iter()
                .filter(|g| g.id != guest_id)
                .cloned()
                .collect();
            doc.set_guests(guests);
            Ok(())
        })
        .await
    }

    /// Append a budget line; negative amounts are rejected before any write
    pub async fn add_expense(&self, expense: NewExpense) -> Result<UpdateOutcome, SyncError> {
        check_amount(&expense.category, expense.amount)?;
        if expense.category.trim().is_empty() {
            return Err(SyncError::InvalidInput(
                "expense category must not be empty".into(),
            ));
        }

        self.modify_current(move |doc| {
            let id = unique_item_id(doc.budget.iter().map(|e| e.id.as_str()));
            doc.budget.push(Expense {
                id,
                category: expense.category.trim().to_string(),
                amount: expense.amount,
                status: expense.status,
                proof_uri: expense.proof_uri,
            });
            Ok(())
        })
        .await
    }

    pub async fn update_expense(
        &self,
        expense_id: &str,
        patch: ExpensePatch,
    ) -> Result<UpdateOutcome, SyncError> {
        if let Some(amount) = patch.amount {
            check_amount(expense_id, amount)?;
        }
        let expense_id = expense_id.to_string();

        self.modify_current(move |doc| {
            match doc.budget.iter_mut().find(|e| e.id == expense_id) {
                Some(expense) => expense.apply(patch),
                None => debug!(%expense_id, "No such expense, nothing to update"),
            }
            Ok(())
        })
        .await
    }

    pub async fn remove_expense(&self, expense_id: &str) -> Result<UpdateOutcome, SyncError> {
        let expense_id = expense_id.to_string();
        self.modify_current(move |doc| {
            doc.budget.retain(|e| e.id != expense_id);
            Ok(())
        })
        .await
    }

    pub async fn add_segment(&self, segment: NewSegment) -> Result<UpdateOutcome, SyncError> {
        if segment.name.trim().is_empty() {
            return Err(SyncError::InvalidInput("segment name must not be empty".into()));
        }

        self.modify_current(move |doc| {
            let id = unique_item_id(doc.schedule.iter().map(|s| s.id.as_str()));
            doc.schedule.push(Segment {
                id,
                name: segment.name.trim().to_string(),
                venue: segment.venue,
                start_time: segment.start_time,
                end_time: segment.end_time,
            });
            Ok(())
        })
        .await
    }

    pub async fn remove_segment(&self, segment_id: &str) -> Result<UpdateOutcome, SyncError> {
        let segment_id = segment_id.to_string();
        self.modify_current(move |doc| {
            doc.schedule.retain(|s| s.id != segment_id);
            Ok(())
        })
        .await
    }
}

fn check_amount(label: &str, amount: f64) -> Result<(), SyncError> {
    if amount < 0.0 || !amount.is_finite() {
        return Err(SyncError::InvalidInput(format!(
            "expense '{}' has a negative amount",
            label
        )));
    }
    Ok(())
}
