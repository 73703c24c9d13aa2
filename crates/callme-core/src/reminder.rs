//! Reminder: a scheduled outbound call with the message to speak.
//!
//! Reminders are owned by the backend. The client only ever holds copies:
//! either the server's representation, or a provisional record created
//! locally while a create request is in flight.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{call_attempt::CallAttempt, input::NewReminder};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identity of a reminder.
///
/// Server ids arrive as plain UUID strings and always deserialize as
/// [`ReminderId::Remote`]. A [`ReminderId::Provisional`] id only exists in the
/// local cache and is never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Uuid", into = "String")]
pub enum ReminderId {
  Remote(Uuid),
  Provisional(Uuid),
}

impl ReminderId {
  /// A fresh temporary id for an optimistic record.
  pub fn provisional() -> Self { Self::Provisional(Uuid::new_v4()) }

  /// The server id, if this reminder has been saved.
  pub fn remote(&self) -> Option<Uuid> {
    match self {
      Self::Remote(id) => Some(*id),
      Self::Provisional(_) => None,
    }
  }

  pub fn is_provisional(&self) -> bool { matches!(self, Self::Provisional(_)) }
}

impl From<Uuid> for ReminderId {
  fn from(id: Uuid) -> Self { Self::Remote(id) }
}

impl From<ReminderId> for String {
  fn from(id: ReminderId) -> Self { id.to_string() }
}

impl fmt::Display for ReminderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Remote(id) => write!(f, "{id}"),
      Self::Provisional(id) => write!(f, "temp-{id}"),
    }
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
  Scheduled,
  Completed,
  Failed,
}

impl ReminderStatus {
  pub const ALL: [Self; 3] = [Self::Scheduled, Self::Completed, Self::Failed];

  /// Wire form, as used in the `status` query parameter.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Scheduled => "scheduled",
      Self::Completed => "completed",
      Self::Failed => "failed",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      Self::Scheduled => "Scheduled",
      Self::Completed => "Completed",
      Self::Failed => "Failed",
    }
  }
}

impl fmt::Display for ReminderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Reminder ────────────────────────────────────────────────────────────────

/// The server representation of a reminder.
///
/// List endpoints omit `call_attempts` and send `call_attempts_count` instead;
/// detail endpoints send the attempts themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
  pub id:                  ReminderId,
  pub title:               String,
  pub message:             String,
  pub phone_number:        String,
  pub scheduled_for:       DateTime<Utc>,
  /// IANA zone the user scheduled in, e.g. `America/Guatemala`.
  pub timezone:            String,
  pub status:              ReminderStatus,
  #[serde(default)]
  pub vapi_call_id:        Option<String>,
  #[serde(default)]
  pub failure_reason:      Option<String>,
  #[serde(default)]
  pub retry_count:         u32,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
  #[serde(default)]
  pub completed_at:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub call_attempts:       Vec<CallAttempt>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub call_attempts_count: Option<u32>,
}

impl Reminder {
  /// Build the optimistic stand-in for a create request. The status is always
  /// `scheduled`; the server assigns everything else on success.
  pub fn provisional(input: &NewReminder, now: DateTime<Utc>) -> Self {
    Self {
      id:                  ReminderId::provisional(),
      title:               input.title.clone(),
      message:             input.message.clone(),
      phone_number:        input.phone_number.clone(),
      scheduled_for:       input.scheduled_for,
      timezone:            input.timezone.clone(),
      status:              ReminderStatus::Scheduled,
      vapi_call_id:        None,
      failure_reason:      None,
      retry_count:         0,
      created_at:          now,
      updated_at:          now,
      completed_at:        None,
      call_attempts:       Vec::new(),
      call_attempts_count: None,
    }
  }

  /// The most recent call attempt, by attempt number.
  pub fn latest_attempt(&self) -> Option<&CallAttempt> {
    self.call_attempts.iter().max_by_key(|a| a.attempt_number)
  }

  /// Number of attempts, whichever way the server reported them.
  pub fn attempt_count(&self) -> usize {
    let counted = self.call_attempts_count.unwrap_or(0) as usize;
    counted.max(self.call_attempts.len())
  }

  /// Only failed reminders can be pushed back into the schedule.
  pub fn is_retryable(&self) -> bool {
    self.status == ReminderStatus::Failed && !self.id.is_provisional()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::call_attempt::CallAttemptStatus;

  const DETAIL: &str = r#"{
    "id": "6f1c2a8e-6a55-4c2e-9d84-0b6f2b1f9a10",
    "user_id": null,
    "title": "Call Mom",
    "message": "Happy birthday, Mom! Talk soon.",
    "phone_number": "+15551234567",
    "scheduled_for": "2026-11-01T15:00:00Z",
    "timezone": "America/Guatemala",
    "status": "failed",
    "vapi_call_id": "call_123",
    "failure_reason": "no answer",
    "retry_count": 1,
    "created_at": "2026-10-01T12:00:00Z",
    "updated_at": "2026-10-02T12:00:00Z",
    "completed_at": null,
    "call_attempts": [
      {
        "id": "0b0b6c7e-38c4-4b59-8a0e-5f5d1f0c3b21",
        "attempt_number": 1,
        "status": "no_answer",
        "vapi_call_id": "call_122",
        "duration_seconds": null,
        "failure_reason": "no answer",
        "initiated_at": "2026-10-02T11:59:00Z",
        "completed_at": "2026-10-02T12:00:00Z"
      },
      {
        "id": "3f7c6d0e-1b9a-4c55-a2e1-7d3b9a0c4e11",
        "attempt_number": 2,
        "status": "failed",
        "initiated_at": "2026-10-02T12:05:00Z"
      }
    ]
  }"#;

  #[test]
  fn deserializes_detail_representation() {
    let r: Reminder = serde_json::from_str(DETAIL).unwrap();
    assert!(matches!(r.id, ReminderId::Remote(_)));
    assert_eq!(r.status, ReminderStatus::Failed);
    assert_eq!(r.retry_count, 1);
    assert_eq!(r.call_attempts.len(), 2);
    assert_eq!(r.attempt_count(), 2);

    let latest = r.latest_attempt().unwrap();
    assert_eq!(latest.attempt_number, 2);
    assert_eq!(latest.status, CallAttemptStatus::Failed);
    assert!(r.is_retryable());
  }

  #[test]
  fn deserializes_list_item_without_attempts() {
    let json = r#"{
      "id": "6f1c2a8e-6a55-4c2e-9d84-0b6f2b1f9a10",
      "title": "Call Mom",
      "message": "Happy birthday, Mom! Talk soon.",
      "phone_number": "+15551234567",
      "scheduled_for": "2026-11-01T15:00:00Z",
      "timezone": "UTC",
      "status": "scheduled",
      "retry_count": 0,
      "created_at": "2026-10-01T12:00:00Z",
      "updated_at": "2026-10-01T12:00:00Z",
      "call_attempts_count": 3
    }"#;
    let r: Reminder = serde_json::from_str(json).unwrap();
    assert!(r.call_attempts.is_empty());
    assert_eq!(r.attempt_count(), 3);
    assert!(!r.is_retryable());
  }

  #[test]
  fn provisional_ids_display_with_prefix() {
    let id = ReminderId::provisional();
    assert!(id.is_provisional());
    assert!(id.remote().is_none());
    assert!(id.to_string().starts_with("temp-"));

    let uuid = Uuid::new_v4();
    assert_eq!(ReminderId::from(uuid).to_string(), uuid.to_string());
  }
}
