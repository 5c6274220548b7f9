use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use colored::{ColoredString, Colorize};
use serde_json::json;
use std::sync::Arc;
use wed_core::config::Config;
use wed_core::models::{
    ExpensePatch, ExpenseStatus, GuestPatch, GuestStatus, NewExpense, NewGuest, NewSegment,
};
use wed_core::remote::{OfflineRemote, RemoteBackend, RestRemote};
use wed_core::session::{State, StateFileSession};
use wed_core::storage::SqliteStore;
use wed_core::{views, EventDocument, EventSync, Field, SyncError, UpdateOutcome};

use crate::cli::{ExpenseCommands, GuestCommands, SegmentCommands};

/// Synchronizer wired to the configured database, backend and state file
pub fn open_sync(config: &Config) -> Result<EventSync> {
    let db_path = config.database_path()?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open event database: {}", db_path.display()))?;

    let remote: Arc<dyn RemoteBackend> = match &config.remote {
        Some(remote) => {
            Arc::new(RestRemote::new(remote).context("Failed to create backend client")?)
        }
        None => Arc::new(OfflineRemote),
    };
    let session = StateFileSession::new(config.state_path()?);

    Ok(EventSync::new(Arc::new(store), remote, Arc::new(session)))
}

pub async fn show(sync: &EventSync, json: bool) -> Result<()> {
    let doc = sync.load_document().await;
    if json {
        println!("{}", serde_json::to_string(&doc)?);
        return Ok(());
    }
    if sync.current_user().is_none() {
        println!("Not signed in. Run 'wed login <user-id>' first");
        return Ok(());
    }
    if doc.is_empty() {
        println!("No event yet. Start with 'wed set client_name <name>'");
        return Ok(());
    }
    print_document(&doc);
    Ok(())
}

pub async fn set_field(sync: &EventSync, key: &str, value: &str, json: bool) -> Result<()> {
    let field = Field::parse(key, value)?;
    let outcome = sync.update_field(field).await?;
    report(&outcome, &format!("Set {}", key.cyan()), json)
}

pub async fn guest(sync: &EventSync, cmd: &GuestCommands, json: bool) -> Result<()> {
    match cmd {
        GuestCommands::Add { name, link, status } => {
            let guest = NewGuest {
                name: name.clone(),
                status: status.as_deref().map(parse_guest_status).transpose()?,
                invite_link: link.clone(),
            };
            let outcome = sync.add_guest(guest).await?;
            if outcome == UpdateOutcome::Unchanged && !json {
                println!("{} is already on the guest list", name.cyan());
                return Ok(());
            }
            report(&outcome, &format!("Invited {}", name.cyan()), json)
        }
        GuestCommands::Update {
            id,
            name,
            status,
            link,
        } => {
            let patch = GuestPatch {
                name: name.clone(),
                status: status.as_deref().map(parse_guest_status).transpose()?,
                invite_link: link.clone(),
            };
            let outcome = sync.update_guest(id, patch).await?;
            report(&outcome, &format!("Updated guest {}", id.cyan()), json)
        }
        GuestCommands::Rm { id } => {
            let outcome = sync.remove_guest(id).await?;
            report(&outcome, &format!("Removed guest {}", id.cyan()), json)
        }
        GuestCommands::List => {
            let doc = sync.load_document().await;
            if json {
                println!("{}", serde_json::to_string(&doc.guests)?);
                return Ok(());
            }
            if doc.guests.is_empty() {
                println!("No guests yet. Invite one with 'wed guest add <name>'");
                return Ok(());
            }
            println!("{}:", "Guests".cyan().bold());
            for guest in &doc.guests {
                println!(
                    "  {} {} {}",
                    status_label(guest.status),
                    guest.name,
                    format!("({})", guest.id).dimmed()
                );
            }
            Ok(())
        }
    }
}

pub async fn expense(sync: &EventSync, cmd: &ExpenseCommands, json: bool) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            category,
            amount,
            paid,
            proof,
        } => {
            let expense = NewExpense {
                category: category.clone(),
                amount: *amount,
                status: if *paid {
                    ExpenseStatus::Paid
                } else {
                    ExpenseStatus::Pending
                },
                proof_uri: proof.clone(),
            };
            let outcome = sync.add_expense(expense).await?;
            report(
                &outcome,
                &format!("Added {} ({:.2})", category.cyan(), amount),
                json,
            )
        }
        ExpenseCommands::Update {
            id,
            category,
            amount,
            status,
            proof,
        } => {
            let status = match status {
                Some(s) => Some(
                    ExpenseStatus::parse(s)
                        .ok_or_else(|| anyhow!("Unknown expense status '{}'", s))?,
                ),
                None => None,
            };
            let patch = ExpensePatch {
                category: category.clone(),
                amount: *amount,
                status,
                proof_uri: proof.clone(),
            };
            let outcome = sync.update_expense(id, patch).await?;
            report(&outcome, &format!("Updated expense {}", id.cyan()), json)
        }
        ExpenseCommands::Rm { id } => {
            let outcome = sync.remove_expense(id).await?;
            report(&outcome, &format!("Removed expense {}", id.cyan()), json)
        }
    }
}

pub async fn segment(sync: &EventSync, cmd: &SegmentCommands, json: bool) -> Result<()> {
    match cmd {
        SegmentCommands::Add {
            name,
            venue,
            start,
            end,
        } => {
            let segment = NewSegment {
                name: name.clone(),
                venue: venue.clone(),
                start_time: start.clone(),
                end_time: end.clone(),
            };
            let outcome = sync.add_segment(segment).await?;
            report(&outcome, &format!("Scheduled {}", name.cyan()), json)
        }
        SegmentCommands::Rm { id } => {
            let outcome = sync.remove_segment(id).await?;
            report(&outcome, &format!("Removed segment {}", id.cyan()), json)
        }
    }
}

pub async fn stats(sync: &EventSync, json: bool) -> Result<()> {
    let doc = sync.load_document().await;
    let guests = views::guest_stats(&doc);
    let budget = views::budget_summary(&doc);
    let headroom = views::package_headroom(&doc);

    if json {
        println!(
            "{}",
            json!({ "guests": guests, "budget": budget, "package_headroom": headroom })
        );
        return Ok(());
    }

    println!("{}", "Guests".cyan().bold());
    println!(
        "  {} total, {} accepted, {} declined, {} pending",
        guests.total,
        guests.accepted.to_string().green(),
        guests.declined.to_string().red(),
        guests.pending.to_string().yellow()
    );
    if let Some(headroom) = headroom {
        if headroom < 0 {
            println!("  {} over the package limit", (-headroom).to_string().red());
        } else {
            println!("  {} more guests fit the package", headroom);
        }
    }
    println!("{}", "Budget".cyan().bold());
    println!(
        "  {:.2} total, {:.2} paid, {:.2} outstanding ({} items)",
        budget.total, budget.paid, budget.outstanding, budget.items
    );
    Ok(())
}

pub async fn countdown(sync: &EventSync, json: bool) -> Result<()> {
    let doc = sync.load_document().await;
    let Some(date) = doc.event_date else {
        bail!("No event date set. Use 'wed set event_date YYYY-MM-DD'");
    };
    let left = views::countdown(date);
    if json {
        println!("{}", json!({ "event_date": date, "countdown": left }));
        return Ok(());
    }
    println!(
        "{} days, {} hours, {} minutes until {}",
        left.days.to_string().cyan().bold(),
        left.hours,
        left.minutes,
        date
    );
    Ok(())
}

pub async fn submit(sync: &EventSync, json: bool) -> Result<()> {
    sync.load_document().await;
    match sync.submit_document().await {
        Ok(receipt) => {
            if json {
                println!(
                    "{}",
                    json!({
                        "status": "submitted",
                        "event_id": receipt.event_id,
                        "mobile_app_id": receipt.mobile_app_id,
                        "guests_recorded": receipt.guests_recorded,
                    })
                );
                return Ok(());
            }
            println!(
                "Submitted for approval (event {})",
                receipt.event_id.to_string().cyan()
            );
            if !receipt.guests_recorded {
                println!(
                    "{}",
                    "Guest list could not be sent; an admin will need to add it".yellow()
                );
            }
            Ok(())
        }
        Err(SyncError::Validation { missing }) if json => {
            let names: Vec<_> = missing.iter().map(|f| f.as_str()).collect();
            println!("{}", json!({ "status": "incomplete", "missing": names }));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn reset(sync: &EventSync, force: bool, json: bool) -> Result<()> {
    let user_id = signed_in_user(sync).await?;
    if !force {
        bail!("This deletes all local event data. Re-run with --force to continue");
    }
    sync.load_document().await;
    sync.reset_for_user(&user_id).await;
    if json {
        println!("{}", json!({ "status": "reset", "user_id": user_id }));
    } else {
        println!("Local event data cleared");
    }
    Ok(())
}

pub async fn recover(sync: &EventSync, json: bool) -> Result<()> {
    let user_id = signed_in_user(sync).await?;
    let restored = sync.recover_from_backup(&user_id).await?;
    if json {
        println!("{}", json!({ "restored": restored.is_some() }));
        return Ok(());
    }
    match restored {
        Some(_) => println!("Restored event document from backup"),
        None => println!("No backup to restore"),
    }
    Ok(())
}

pub fn login(
    config: &Config,
    user_id: &str,
    email: Option<&str>,
    hours: i64,
    json: bool,
) -> Result<()> {
    let path = config.state_path()?;
    let mut state = State::load_from(&path)?;
    state.auth.user_id = Some(user_id.to_string());
    state.auth.email = email.map(str::to_string);
    state.auth.expires_at = Some(Utc::now() + chrono::Duration::hours(hours));
    state.save_to(&path)?;

    if json {
        println!("{}", json!({ "status": "signed_in", "user_id": user_id }));
    } else {
        println!("Signed in as {}", user_id.cyan());
    }
    Ok(())
}

pub async fn logout(config: &Config, sync: &EventSync, reset: bool, json: bool) -> Result<()> {
    let path = config.state_path()?;
    let mut state = State::load_from(&path)?;
    let Some(user_id) = state.auth.user_id.take() else {
        bail!("Not signed in");
    };
    if reset {
        sync.reset_for_user(&user_id).await;
    }
    state.auth.email = None;
    state.auth.expires_at = None;
    state.save_to(&path)?;

    if json {
        println!("{}", json!({ "status": "signed_out", "reset": reset }));
    } else {
        println!("Signed out {}", user_id.cyan());
    }
    Ok(())
}

async fn signed_in_user(sync: &EventSync) -> Result<String> {
    sync.load_document().await;
    sync.current_user()
        .ok_or_else(|| anyhow!("Not signed in. Run 'wed login <user-id>' first"))
}

fn report(outcome: &UpdateOutcome, done: &str, json: bool) -> Result<()> {
    if json {
        let value = match outcome {
            UpdateOutcome::Applied { version } => json!({ "outcome": "applied", "version": version }),
            UpdateOutcome::BackedUp => json!({ "outcome": "backed_up" }),
            UpdateOutcome::Unchanged => json!({ "outcome": "unchanged" }),
            UpdateOutcome::Dropped => json!({ "outcome": "dropped" }),
            UpdateOutcome::NoSession => json!({ "outcome": "no_session" }),
        };
        println!("{}", value);
        return Ok(());
    }
    match outcome {
        UpdateOutcome::Applied { .. } => println!("{}", done),
        UpdateOutcome::BackedUp => println!(
            "{}",
            "Saving failed; the change was kept in the backup slot (see 'wed recover')".yellow()
        ),
        UpdateOutcome::Unchanged => println!("Nothing changed"),
        UpdateOutcome::Dropped => println!("{}", "Account changed, update discarded".yellow()),
        UpdateOutcome::NoSession => bail!("Not signed in. Run 'wed login <user-id>' first"),
    }
    Ok(())
}

fn parse_guest_status(value: &str) -> Result<GuestStatus> {
    GuestStatus::parse(value).ok_or_else(|| anyhow!("Unknown guest status '{}'", value))
}

fn status_label(status: Option<GuestStatus>) -> ColoredString {
    match status {
        Some(GuestStatus::Accepted) => "✓".green(),
        Some(GuestStatus::Declined) => "✗".red(),
        _ => "?".yellow(),
    }
}

fn print_document(doc: &EventDocument) {
    let line = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            println!("  {:<14} {}", label.dimmed(), value);
        }
    };

    println!("{}", "Event".cyan().bold());
    line("Client", doc.client_name.clone());
    line("Partner", doc.partner_name.clone());
    line("Email", doc.client_email.clone());
    line("Type", doc.event_type.clone());
    line("Date", doc.event_date.map(|d| d.to_string()));
    line("Package", doc.package_price.map(|p| format!("{:.2}", p)));
    line("Guest range", doc.guest_range.map(|r| r.to_string()));
    line(
        "Signature",
        doc.e_signature.as_ref().map(|_| "provided".to_string()),
    );

    if !doc.guests.is_empty() {
        println!("{} ({})", "Guests".cyan().bold(), doc.guests.len());
        for guest in &doc.guests {
            println!("  {} {}", status_label(guest.status), guest.name);
        }
    }
    if !doc.schedule.is_empty() {
        println!("{}", "Schedule".cyan().bold());
        for segment in &doc.schedule {
            println!(
                "  {}-{} {} @ {} {}",
                segment.start_time,
                segment.end_time,
                segment.name,
                segment.venue,
                format!("({})", segment.id).dimmed()
            );
        }
    }
    if !doc.budget.is_empty() {
        println!("{}", "Budget".cyan().bold());
        for expense in &doc.budget {
            println!(
                "  {:<16} {:>10.2} {} {}",
                expense.category,
                expense.amount,
                expense.status.as_str(),
                format!("({})", expense.id).dimmed()
            );
        }
    }
    for (key, value) in &doc.extra {
        line(key.as_str(), Some(value.to_string()));
    }
}
