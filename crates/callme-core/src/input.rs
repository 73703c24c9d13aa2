//! Request bodies: what the client sends to create or change a reminder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  reminder::Reminder,
  validate::{self, Field, ValidationError, ValidationErrors},
};

// ─── Create ──────────────────────────────────────────────────────────────────

/// Body of `POST /reminders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReminder {
  pub title:         String,
  pub message:       String,
  pub phone_number:  String,
  /// Serialised as RFC 3339 in UTC.
  pub scheduled_for: DateTime<Utc>,
  pub timezone:      String,
}

impl NewReminder {
  /// Check every field against the scheduling rules at `now`.
  pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.check(Field::Title, validate::validate_title(&self.title));
    errors.check(Field::Message, validate::validate_message(&self.message));
    errors.check(
      Field::PhoneNumber,
      validate::validate_phone_number(&self.phone_number),
    );
    errors.check(
      Field::Timezone,
      validate::validate_timezone(&self.timezone).map(drop),
    );
    errors.check(
      Field::Date,
      validate::validate_schedule(self.scheduled_for, now),
    );
    errors.into_result()
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// Body of `PUT /reminders/{id}`. Absent fields are omitted from the JSON and
/// left untouched on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPatch {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:         Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message:       Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone_number:  Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scheduled_for: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub timezone:      Option<String>,
}

impl ReminderPatch {
  /// A patch that only moves the scheduled time.
  pub fn reschedule(at: DateTime<Utc>) -> Self {
    Self {
      scheduled_for: Some(at),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Merge the provided fields into `reminder` and bump its `updated_at`.
  pub fn apply_to(&self, reminder: &mut Reminder, now: DateTime<Utc>) {
    if let Some(title) = &self.title {
      reminder.title = title.clone();
    }
    if let Some(message) = &self.message {
      reminder.message = message.clone();
    }
    if let Some(phone) = &self.phone_number {
      reminder.phone_number = phone.clone();
    }
    if let Some(at) = self.scheduled_for {
      reminder.scheduled_for = at;
    }
    if let Some(tz) = &self.timezone {
      reminder.timezone = tz.clone();
    }
    reminder.updated_at = now;
  }

  /// Check only the fields this patch carries.
  pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(title) = &self.title {
      errors.check(Field::Title, validate::validate_title(title));
    }
    if let Some(message) = &self.message {
      errors.check(Field::Message, validate::validate_message(message));
    }
    if let Some(phone) = &self.phone_number {
      errors.check(Field::PhoneNumber, validate::validate_phone_number(phone));
    }
    if let Some(at) = self.scheduled_for {
      errors.check(Field::Date, validate::validate_schedule(at, now));
    }
    if let Some(tz) = &self.timezone {
      errors.check(Field::Timezone, validate::validate_timezone(tz).map(drop));
    }
    errors.into_result()
  }
}

impl From<NewReminder> for ReminderPatch {
  fn from(input: NewReminder) -> Self {
    Self {
      title:         Some(input.title),
      message:       Some(input.message),
      phone_number:  Some(input.phone_number),
      scheduled_for: Some(input.scheduled_for),
      timezone:      Some(input.timezone),
    }
  }
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// A reminder being filled in by the user.
///
/// `scheduled_for` stays empty until a date and time have been combined and
/// accepted by [`ScheduleInput`](crate::validate::ScheduleInput).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderDraft {
  pub title:         String,
  pub message:       String,
  pub phone_number:  String,
  pub timezone:      String,
  pub scheduled_for: Option<DateTime<Utc>>,
}

impl ReminderDraft {
  /// Produce a submittable [`NewReminder`], or every field error at once.
  ///
  /// Title and message are trimmed first, matching what the server stores.
  pub fn validate(&self, now: DateTime<Utc>) -> Result<NewReminder, ValidationErrors> {
    let input = NewReminder {
      title:         self.title.trim().to_string(),
      message:       self.message.trim().to_string(),
      phone_number:  self.phone_number.clone(),
      scheduled_for: self.scheduled_for.unwrap_or(now),
      timezone:      self.timezone.clone(),
    };
    let mut errors = input.validate(now).err().unwrap_or_default();
    if self.scheduled_for.is_none() {
      // Replaces the past-schedule error the placeholder instant produced.
      errors.insert(Field::Date, ValidationError::MissingSchedule);
    }
    errors.into_result().map(|()| input)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeDelta, TimeZone};

  use super::*;
  use crate::reminder::ReminderStatus;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap() }

  fn draft() -> ReminderDraft {
    ReminderDraft {
      title:         "Test Reminder".into(),
      message:       "This is a test message for the reminder".into(),
      phone_number:  "+15551234567".into(),
      timezone:      "America/New_York".into(),
      scheduled_for: Some(now() + TimeDelta::hours(1)),
    }
  }

  #[test]
  fn valid_draft_becomes_new_reminder() {
    let input = draft().validate(now()).unwrap();
    assert_eq!(input.title, "Test Reminder");
    assert_eq!(input.scheduled_for, now() + TimeDelta::hours(1));
  }

  #[test]
  fn draft_trims_title_and_message() {
    let mut d = draft();
    d.title = "   Call Dad   ".into();
    let input = d.validate(now()).unwrap();
    assert_eq!(input.title, "Call Dad");

    // Whitespace does not count towards the minimum.
    d.title = "  AB  ".into();
    let errors = d.validate(now()).unwrap_err();
    assert_eq!(errors.get(Field::Title), Some(ValidationError::TitleTooShort));
  }

  #[test]
  fn draft_without_schedule_reports_all_fields() {
    let mut d = draft();
    d.scheduled_for = None;
    d.phone_number = "15551234567".into();
    let errors = d.validate(now()).unwrap_err();
    assert_eq!(errors.get(Field::Date), Some(ValidationError::MissingSchedule));
    assert_eq!(
      errors.get(Field::PhoneNumber),
      Some(ValidationError::InvalidPhoneFormat)
    );
    assert_eq!(errors.len(), 2);
  }

  #[test]
  fn patch_serialises_only_present_fields() {
    let patch = ReminderPatch {
      title: Some("New title".into()),
      ..ReminderPatch::default()
    };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({ "title": "New title" }));
    assert!(ReminderPatch::default().is_empty());
  }

  #[test]
  fn patch_merges_and_bumps_updated_at() {
    let input = draft().validate(now()).unwrap();
    let mut reminder = Reminder::provisional(&input, now() - TimeDelta::days(1));
    let before = reminder.clone();

    let patch = ReminderPatch {
      message: Some("A brand new message body".into()),
      ..ReminderPatch::default()
    };
    patch.apply_to(&mut reminder, now());

    assert_eq!(reminder.message, "A brand new message body");
    assert_eq!(reminder.title, before.title);
    assert_eq!(reminder.status, ReminderStatus::Scheduled);
    assert!(reminder.updated_at > before.updated_at);
  }

  #[test]
  fn patch_validates_only_carried_fields() {
    let patch = ReminderPatch {
      title: Some("AB".into()),
      ..ReminderPatch::default()
    };
    let errors = patch.validate(now()).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(ReminderPatch::reschedule(now() + TimeDelta::minutes(5))
      .validate(now())
      .is_ok());
  }
}
