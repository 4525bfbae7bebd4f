//! Structured log entries appended to record bodies.

use super::{ActorId, RecordStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// Heading of the body section that collects log entries.
pub const LOG_HEADING: &str = "## Log";

/// Event recorded by a [`LogEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// The record moved between statuses.
    StatusChange {
        /// Status before the transition.
        from: RecordStatus,
        /// Status after the transition.
        to: RecordStatus,
    },
    /// A delegation of the record reached an outcome.
    Delegation {
        /// Delegation handle, rendered.
        handle: String,
        /// Actor the work was delegated to.
        delegate: ActorId,
        /// Outcome summary, for example `completed (confidence 0.90)`.
        outcome: String,
    },
}

/// One line of a record's audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// When the event happened.
    pub at: DateTime<Utc>,
    /// Who caused it.
    pub actor: ActorId,
    /// What happened.
    pub event: LogEvent,
}

impl LogEntry {
    /// Creates a status-change entry.
    #[must_use]
    pub const fn status_change(
        at: DateTime<Utc>,
        actor: ActorId,
        from: RecordStatus,
        to: RecordStatus,
    ) -> Self {
        Self {
            at,
            actor,
            event: LogEvent::StatusChange { from, to },
        }
    }

    /// Creates a delegation outcome entry.
    #[must_use]
    pub fn delegation(
        at: DateTime<Utc>,
        actor: ActorId,
        handle: impl Into<String>,
        delegate: ActorId,
        outcome: impl Into<String>,
    ) -> Self {
        Self {
            at,
            actor,
            event: LogEvent::Delegation {
                handle: handle.into(),
                delegate,
                outcome: outcome.into(),
            },
        }
    }

    /// Appends this entry to `body`.
    ///
    /// The entry goes at the end of the [`LOG_HEADING`] section, which is
    /// created at the end of the body when missing. Text outside the log
    /// section is left byte-for-byte intact.
    #[must_use]
    pub fn append_to(&self, body: &str) -> String {
        let line = format!("- {self}\n");
        let Some(section_start) = find_log_heading(body) else {
            let mut updated = String::with_capacity(body.len() + LOG_HEADING.len() + line.len() + 3);
            updated.push_str(body);
            if !body.is_empty() && !body.ends_with('\n') {
                updated.push('\n');
            }
            if !body.is_empty() {
                updated.push('\n');
            }
            updated.push_str(LOG_HEADING);
            updated.push_str("\n\n");
            updated.push_str(&line);
            return updated;
        };

        let after_heading = section_start + LOG_HEADING.len();
        let section_end = body
            .get(after_heading..)
            .and_then(|rest| rest.find("\n## ").map(|offset| after_heading + offset + 1))
            .unwrap_or(body.len());

        let (head, tail) = body.split_at(section_end);
        let section = head.trim_end_matches(['\n', '\r']);
        let mut updated = String::with_capacity(body.len() + line.len() + 3);
        updated.push_str(section);
        updated.push_str(if section.ends_with(LOG_HEADING) { "\n\n" } else { "\n" });
        updated.push_str(&line);
        if !tail.is_empty() {
            updated.push('\n');
        }
        updated.push_str(tail);
        updated
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = self.at.to_rfc3339_opts(SecondsFormat::Secs, true);
        match &self.event {
            LogEvent::StatusChange { from, to } => write!(
                f,
                "{at} | status | {} | {} → {}",
                self.actor,
                from.label(),
                to.label()
            ),
            LogEvent::Delegation {
                handle,
                delegate,
                outcome,
            } => write!(
                f,
                "{at} | delegation | {} | {handle} to {delegate}: {outcome}",
                self.actor
            ),
        }
    }
}

/// Finds the byte offset of a log heading that starts a line.
fn find_log_heading(body: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim_end() == LOG_HEADING {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}
