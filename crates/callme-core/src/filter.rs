//! List filters and the client-side helpers the dashboard applies on top of
//! them.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::reminder::{Reminder, ReminderStatus};

/// How far ahead a retried reminder is rescheduled.
pub const RETRY_DELAY_MINUTES: i64 = 5;

// ─── Server-side filter ──────────────────────────────────────────────────────

/// Parameters of `GET /reminders/`. Also the cache key of a list query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListFilter {
  pub status: Option<ReminderStatus>,
}

impl ListFilter {
  pub const ALL: Self = Self { status: None };

  pub fn status(status: ReminderStatus) -> Self { Self { status: Some(status) } }

  /// Whether `reminder` belongs in a list fetched with this filter.
  pub fn matches(&self, reminder: &Reminder) -> bool {
    self.status.is_none_or(|s| s == reminder.status)
  }

  /// Query-string pairs; empty for the unfiltered list.
  pub fn query(&self) -> Vec<(&'static str, &'static str)> {
    self
      .status
      .map(|s| vec![("status", s.as_str())])
      .unwrap_or_default()
  }
}

// ─── Client-side refinement ──────────────────────────────────────────────────

/// Case-insensitive substring match over title and message. A blank query
/// matches everything.
pub fn matches_search(reminder: &Reminder, query: &str) -> bool {
  let query = query.trim();
  if query.is_empty() {
    return true;
  }
  let query = query.to_lowercase();
  reminder.title.to_lowercase().contains(&query)
    || reminder.message.to_lowercase().contains(&query)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn toggled(self) -> Self {
    match self {
      Self::Asc => Self::Desc,
      Self::Desc => Self::Asc,
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Asc => "oldest first",
      Self::Desc => "newest first",
    }
  }
}

/// Stable sort by scheduled time.
pub fn sort_by_schedule(reminders: &mut [Reminder], order: SortOrder) {
  match order {
    SortOrder::Asc => reminders.sort_by_key(|r| r.scheduled_for),
    SortOrder::Desc => reminders.sort_by(|a, b| b.scheduled_for.cmp(&a.scheduled_for)),
  }
}

/// Per-status tallies for the filter tabs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
  pub all:       usize,
  pub scheduled: usize,
  pub completed: usize,
  pub failed:    usize,
}

impl StatusCounts {
  pub fn tally(reminders: &[Reminder]) -> Self {
    reminders.iter().fold(
      Self {
        all: reminders.len(),
        ..Self::default()
      },
      |mut counts, r| {
        match r.status {
          ReminderStatus::Scheduled => counts.scheduled += 1,
          ReminderStatus::Completed => counts.completed += 1,
          ReminderStatus::Failed => counts.failed += 1,
        }
        counts
      },
    )
  }

  pub fn get(&self, status: Option<ReminderStatus>) -> usize {
    match status {
      None => self.all,
      Some(ReminderStatus::Scheduled) => self.scheduled,
      Some(ReminderStatus::Completed) => self.completed,
      Some(ReminderStatus::Failed) => self.failed,
    }
  }
}

/// The instant `minutes` from `now`, used when retrying a failed reminder.
pub fn reschedule_time(now: DateTime<Utc>, minutes: i64) -> DateTime<Utc> {
  now + TimeDelta::minutes(minutes)
}
