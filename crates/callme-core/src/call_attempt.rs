//! Call attempts: the backend's log of each time it actually dialled.
//!
//! Attempts are append-only and produced by the server; the client never
//! creates or edits one.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of a single outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallAttemptStatus {
  Initiated,
  Ringing,
  Answered,
  Completed,
  Failed,
  NoAnswer,
}

impl CallAttemptStatus {
  /// No further transitions will be reported for this attempt.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Completed | Self::Failed | Self::NoAnswer)
  }

  pub fn is_failure(&self) -> bool { matches!(self, Self::Failed | Self::NoAnswer) }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Initiated => "Initiated",
      Self::Ringing => "Ringing",
      Self::Answered => "Answered",
      Self::Completed => "Completed",
      Self::Failed => "Failed",
      Self::NoAnswer => "No answer",
    }
  }
}

/// One attempt to place the call for a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAttempt {
  pub id:               Uuid,
  /// 1-based sequence number within the owning reminder.
  pub attempt_number:   u32,
  pub status:           CallAttemptStatus,
  #[serde(default)]
  pub vapi_call_id:     Option<String>,
  #[serde(default)]
  pub duration_seconds: Option<u32>,
  #[serde(default)]
  pub failure_reason:   Option<String>,
  pub initiated_at:     DateTime<Utc>,
  #[serde(default)]
  pub completed_at:     Option<DateTime<Utc>>,
}

impl CallAttempt {
  pub fn duration(&self) -> Option<TimeDelta> {
    self
      .duration_seconds
      .map(|secs| TimeDelta::seconds(i64::from(secs)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_wire_names() {
    let s: CallAttemptStatus = serde_json::from_str("\"no_answer\"").unwrap();
    assert_eq!(s, CallAttemptStatus::NoAnswer);
    assert!(s.is_terminal());
    assert!(s.is_failure());

    assert!(!CallAttemptStatus::Ringing.is_terminal());
    assert!(!CallAttemptStatus::Completed.is_failure());
  }
}
