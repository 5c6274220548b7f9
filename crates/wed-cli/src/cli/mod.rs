pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(name = "wed", about = "Plan your event and submit it for approval")]
#[clap(version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[clap(long, global = true)]
    pub json: bool,

    /// Log sync activity to stderr
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current event document
    #[clap(name = "show")]
    Show,

    /// Set a top-level field (plain text or JSON, "null" clears it)
    #[clap(name = "set")]
    Set {
        /// Field name, e.g. client_name, event_date, guest_range
        field: String,
        /// New value
        value: String,
    },

    /// Manage the guest list
    #[clap(subcommand, name = "guest")]
    Guest(GuestCommands),

    /// Manage budget lines
    #[clap(subcommand, name = "expense")]
    Expense(ExpenseCommands),

    /// Manage the day schedule
    #[clap(subcommand, name = "segment")]
    Segment(SegmentCommands),

    /// RSVP, budget and package statistics
    #[clap(name = "stats")]
    Stats,

    /// Time left until the event date
    #[clap(name = "countdown")]
    Countdown,

    /// Submit the event for approval
    #[clap(name = "submit")]
    Submit,

    /// Delete the local event data of the signed-in user
    #[clap(name = "reset")]
    Reset {
        /// Skip the confirmation check
        #[clap(long)]
        force: bool,
    },

    /// Restore the document from the backup slot after a failed save
    #[clap(name = "recover")]
    Recover,

    /// Record a signed-in account in the local state file
    #[clap(name = "login")]
    Login {
        /// Account id issued by the auth backend
        user_id: String,
        /// Account email address
        #[clap(long)]
        email: Option<String>,
        /// Session lifetime in hours
        #[clap(long, default_value = "720")]
        hours: i64,
    },

    /// Forget the signed-in account
    #[clap(name = "logout")]
    Logout {
        /// Also delete the account's local event data
        #[clap(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
pub enum GuestCommands {
    /// Invite a guest
    #[clap(name = "add")]
    Add {
        /// Guest name
        name: String,
        /// Invitation link
        #[clap(long, default_value = "")]
        link: String,
        /// RSVP status (pending, accepted, declined)
        #[clap(long)]
        status: Option<String>,
    },

    /// Change a guest
    #[clap(name = "update")]
    Update {
        /// Guest id
        id: String,
        #[clap(long)]
        name: Option<String>,
        /// RSVP status (pending, accepted, declined)
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        link: Option<String>,
    },

    /// Remove a guest
    #[clap(name = "rm")]
    Rm {
        /// Guest id
        id: String,
    },

    /// List guests
    #[clap(name = "ls")]
    List,
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Add a budget line
    #[clap(name = "add")]
    Add {
        /// Budget category, e.g. Venue
        category: String,
        /// Amount, must not be negative
        amount: f64,
        /// Mark as already paid
        #[clap(long)]
        paid: bool,
        /// Link to a receipt or proof of payment
        #[clap(long)]
        proof: Option<String>,
    },

    /// Change a budget line
    #[clap(name = "update")]
    Update {
        /// Expense id
        id: String,
        #[clap(long)]
        category: Option<String>,
        #[clap(long)]
        amount: Option<f64>,
        /// Payment status (pending, paid)
        #[clap(long)]
        status: Option<String>,
        #[clap(long)]
        proof: Option<String>,
    },

    /// Remove a budget line
    #[clap(name = "rm")]
    Rm {
        /// Expense id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SegmentCommands {
    /// Add a block to the schedule
    #[clap(name = "add")]
    Add {
        /// Segment name, e.g. Ceremony
        name: String,
        #[clap(long, default_value = "")]
        venue: String,
        /// Start time, e.g. 14:00
        #[clap(long, default_value = "")]
        start: String,
        /// End time, e.g. 15:00
        #[clap(long, default_value = "")]
        end: String,
    },

    /// Remove a block from the schedule
    #[clap(name = "rm")]
    Rm {
        /// Segment id
        id: String,
    },
}
