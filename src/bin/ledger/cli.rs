//! Command-line arguments.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Structured task and workflow ledger.
#[derive(Debug, Parser)]
#[command(name = "ledger", version, about)]
pub(crate) struct Cli {
    /// Configuration file [default: ledger.toml when present].
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Ledger root, overriding the configuration.
    #[arg(long, global = true)]
    pub root: Option<Utf8PathBuf>,

    /// Actor performing the command [default: the configured coordinator].
    #[arg(long, global = true)]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create a record, or import an existing document with --from.
    Create(CreateArgs),
    /// Edit record metadata.
    Update(UpdateArgs),
    /// Move a record to another status.
    Transition {
        /// Record identifier.
        id: String,
        /// Target status, e.g. `in_progress` or `Review`.
        status: String,
        /// Permit moving an archived record back to `todo`.
        #[arg(long)]
        unarchive: bool,
    },
    /// Delegate a record to an actor.
    Delegate {
        /// Record identifier.
        id: String,
        /// Delegate actor.
        to: String,
        /// Seconds allowed for an outcome [default: from configuration].
        #[arg(long)]
        timeout_secs: Option<i64>,
        /// JSON instructions for the delegate.
        #[arg(long)]
        instructions: Option<String>,
    },
    /// Acknowledge a delegation.
    Accept {
        /// Delegation handle.
        handle: String,
        /// Also mark the work as started.
        #[arg(long)]
        start: bool,
    },
    /// Report a delegation outcome.
    Report {
        /// Delegation handle.
        handle: String,
        /// Outcome.
        outcome: OutcomeArg,
        /// Summary (completed) or reason (failed).
        #[arg(long, short)]
        message: Option<String>,
        /// Self-reported confidence in [0, 1].
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Hand a failed or timed-out delegation back to the coordinator.
    Escalate {
        /// Delegation handle.
        handle: String,
        /// Reason recorded with the escalation.
        #[arg(long, default_value = "escalated by coordinator")]
        reason: String,
    },
    /// Show a record and its delegations.
    Status {
        /// Record identifier.
        id: String,
    },
    /// List records.
    List(ListArgs),
    /// Expire overdue delegations and report integrity problems.
    Check,
}

#[derive(Debug, Args)]
pub(crate) struct CreateArgs {
    /// Record identifier.
    pub id: Option<String>,
    /// Record title.
    pub title: Option<String>,
    /// Record kind.
    #[arg(long, default_value = "task")]
    pub kind: String,
    /// Priority.
    #[arg(long)]
    pub priority: Option<String>,
    /// Parent record.
    #[arg(long)]
    pub parent: Option<String>,
    /// Dependency; repeat for several.
    #[arg(long = "depends-on")]
    pub depends_on: Vec<String>,
    /// Tag; repeat for several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Assignee.
    #[arg(long)]
    pub assignee: Option<String>,
    /// Template or schema reference.
    #[arg(long)]
    pub schema: Option<String>,
    /// Import this document instead of building a new record.
    #[arg(long, conflicts_with_all = ["id", "title"])]
    pub from: Option<Utf8PathBuf>,
}

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    /// Record identifier.
    pub id: String,
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// New assignee.
    #[arg(long, conflicts_with = "unassign")]
    pub assignee: Option<String>,
    /// Clear the assignee.
    #[arg(long)]
    pub unassign: bool,
    /// New priority.
    #[arg(long)]
    pub priority: Option<String>,
    /// Dependency to add; repeat for several.
    #[arg(long = "depends-on")]
    pub depends_on: Vec<String>,
    /// Tag to add; repeat for several.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Args)]
pub(crate) struct ListArgs {
    /// Only this kind.
    #[arg(long)]
    pub kind: Option<String>,
    /// Only this status.
    #[arg(long)]
    pub status: Option<String>,
    /// Only records with this tag.
    #[arg(long)]
    pub tag: Option<String>,
    /// Only records assigned to this actor.
    #[arg(long)]
    pub assignee: Option<String>,
    /// Only children of this record.
    #[arg(long)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutcomeArg {
    /// The work is done.
    Completed,
    /// The work could not be done.
    Failed,
}
