//! The create/edit reminder form.
//!
//! Inputs are plain strings; errors are recomputed after every change but
//! only shown for fields the user has left at least once (or all of them
//! after a submit attempt).

use std::collections::BTreeSet;

use callme_core::{
  input::{NewReminder, ReminderDraft, ReminderPatch},
  reminder::{Reminder, ReminderId},
  validate::{self, Field, ScheduleInput, ValidationError, ValidationErrors},
};
use chrono::{DateTime, NaiveDate, Utc};

/// Field order, top to bottom.
pub const FIELDS: [Field; 6] = [
  Field::Title,
  Field::PhoneNumber,
  Field::Date,
  Field::Time,
  Field::Timezone,
  Field::Message,
];

/// What a successful submit asks the store to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
  Create(NewReminder),
  Update(ReminderId, ReminderPatch),
}

#[derive(Debug, Clone)]
pub struct ReminderForm {
  pub title:    String,
  pub phone:    String,
  /// `YYYY-MM-DD`
  pub date:     String,
  /// `HH:MM`
  pub time:     String,
  pub timezone: String,
  pub message:  String,
  pub focus:    usize,
  /// The reminder being edited; `None` for a new one.
  editing:      Option<Reminder>,
  touched:      BTreeSet<Field>,
  errors:       ValidationErrors,
}

impl ReminderForm {
  /// A blank form for a new reminder in `timezone`.
  pub fn new(timezone: &str) -> Self {
    Self {
      title:    String::new(),
      phone:    String::new(),
      date:     String::new(),
      time:     String::new(),
      timezone: timezone.to_string(),
      message:  String::new(),
      focus:    0,
      editing:  None,
      touched:  BTreeSet::new(),
      errors:   ValidationErrors::default(),
    }
  }

  /// A form pre-filled from `reminder`, with the schedule shown in the
  /// reminder's own timezone.
  pub fn edit(reminder: &Reminder) -> Self {
    let tz = validate::validate_timezone(&reminder.timezone).unwrap_or(chrono_tz::UTC);
    let schedule = ScheduleInput::from_instant(reminder.scheduled_for, tz);
    Self {
      title: reminder.title.clone(),
      phone: reminder.phone_number.clone(),
      date: schedule
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default(),
      time: schedule.time,
      timezone: reminder.timezone.clone(),
      message: reminder.message.clone(),
      editing: Some(reminder.clone()),
      ..Self::new(&reminder.timezone)
    }
  }

  pub fn is_editing(&self) -> bool { self.editing.is_some() }

  pub fn focused(&self) -> Field { FIELDS[self.focus] }

  pub fn value(&self, field: Field) -> &str {
    match field {
      Field::Title => &self.title,
      Field::PhoneNumber => &self.phone,
      Field::Date => &self.date,
      Field::Time => &self.time,
      Field::Timezone => &self.timezone,
      Field::Message => &self.message,
    }
  }

  fn value_mut(&mut self, field: Field) -> &mut String {
    match field {
      Field::Title => &mut self.title,
      Field::PhoneNumber => &mut self.phone,
      Field::Date => &mut self.date,
      Field::Time => &mut self.time,
      Field::Timezone => &mut self.timezone,
      Field::Message => &mut self.message,
    }
  }

  /// The error to display next to `field`, if any.
  pub fn error(&self, field: Field) -> Option<ValidationError> {
    self
      .errors
      .get(field)
      .filter(|_| self.touched.contains(&field))
  }

  // ── Editing ───────────────────────────────────────────────────────────────

  pub fn input(&mut self, c: char, now: DateTime<Utc>) {
    let field = self.focused();
    self.value_mut(field).push(c);
    self.revalidate(now);
  }

  pub fn backspace(&mut self, now: DateTime<Utc>) {
    let field = self.focused();
    self.value_mut(field).pop();
    self.revalidate(now);
  }

  /// Leave the focused field for the next one.
  pub fn next_field(&mut self, now: DateTime<Utc>) {
    self.touched.insert(self.focused());
    self.focus = (self.focus + 1) % FIELDS.len();
    self.revalidate(now);
  }

  pub fn prev_field(&mut self, now: DateTime<Utc>) {
    self.touched.insert(self.focused());
    self.focus = (self.focus + FIELDS.len() - 1) % FIELDS.len();
    self.revalidate(now);
  }

  fn revalidate(&mut self, now: DateTime<Utc>) {
    self.errors = self.check(now).err().unwrap_or_default();
  }

  // ── Validation ────────────────────────────────────────────────────────────

  fn check(&self, now: DateTime<Utc>) -> Result<NewReminder, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let date = match self.date.trim() {
      "" => None,
      text => match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
          errors.insert(Field::Date, ValidationError::InvalidDate);
          None
        }
      },
    };
    let schedule = ScheduleInput {
      date,
      time: self.time.clone(),
      date_touched: self.touched.contains(&Field::Date),
      time_touched: self.touched.contains(&Field::Time),
      ..ScheduleInput::default()
    };

    let mut draft = ReminderDraft {
      title:         self.title.clone(),
      message:       self.message.clone(),
      phone_number:  self.phone.trim().to_string(),
      timezone:      self.timezone.trim().to_string(),
      scheduled_for: None,
    };
    if let Err(schedule_errors) = schedule.write_into(&mut draft, now) {
      for (field, error) in schedule_errors {
        if errors.get(field).is_none() {
          errors.insert(field, error);
        }
      }
    }

    let scheduling_reported =
      errors.get(Field::Date).is_some() || errors.get(Field::Time).is_some();
    match draft.validate(now) {
      Ok(input) if errors.is_empty() => Ok(input),
      Ok(_) => Err(errors),
      Err(draft_errors) => {
        for (field, error) in draft_errors {
          let redundant = error == ValidationError::MissingSchedule && scheduling_reported;
          if errors.get(field).is_none() && !redundant {
            errors.insert(field, error);
          }
        }
        Err(errors)
      }
    }
  }

  /// Validate everything and, if it passes, say what to send.
  ///
  /// Editing produces a patch of only the fields that changed; an edit that
  /// changes nothing yields `None` with no errors.
  pub fn submit(&mut self, now: DateTime<Utc>) -> Option<Submission> {
    self.touched.extend(FIELDS);
    match self.check(now) {
      Ok(input) => {
        self.errors = ValidationErrors::default();
        match &self.editing {
          None => Some(Submission::Create(input)),
          Some(original) => {
            let patch = changes(original, input);
            (!patch.is_empty()).then(|| Submission::Update(original.id, patch))
          }
        }
      }
      Err(errors) => {
        self.errors = errors;
        None
      }
    }
  }

  pub fn has_errors(&self) -> bool { !self.errors.is_empty() }
}

fn changes(original: &Reminder, input: NewReminder) -> ReminderPatch {
  ReminderPatch {
    title:         (input.title != original.title).then_some(input.title),
    message:       (input.message != original.message).then_some(input.message),
    phone_number:  (input.phone_number != original.phone_number).then_some(input.phone_number),
    scheduled_for: (input.scheduled_for != original.scheduled_for).then_some(input.scheduled_for),
    timezone:      (input.timezone != original.timezone).then_some(input.timezone),
  }
}

#[cfg(test)]
mod tests {
  use callme_core::reminder::ReminderStatus;
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap() }

  fn type_str(form: &mut ReminderForm, text: &str) {
    for c in text.chars() {
      form.input(c, now());
    }
  }

  fn filled() -> ReminderForm {
    let mut form = ReminderForm::new("UTC");
    form.title = "Call Mom".into();
    form.phone = "+15551234567".into();
    form.date = "2026-10-20".into();
    form.time = "09:30".into();
    form.message = "Wish her a happy birthday".into();
    form
  }

  #[test]
  fn untouched_fields_show_no_errors() {
    let mut form = ReminderForm::new("UTC");
    type_str(&mut form, "AB");
    assert!(form.has_errors());
    assert_eq!(form.error(Field::Title), None);

    form.next_field(now());
    assert_eq!(form.error(Field::Title), Some(ValidationError::TitleTooShort));
    assert_eq!(form.error(Field::PhoneNumber), None);
    assert_eq!(form.focused(), Field::PhoneNumber);
  }

  #[test]
  fn submit_touches_every_field() {
    let mut form = ReminderForm::new("UTC");
    assert_eq!(form.submit(now()), None);
    assert_eq!(form.error(Field::Title), Some(ValidationError::TitleTooShort));
    assert_eq!(
      form.error(Field::PhoneNumber),
      Some(ValidationError::InvalidPhoneFormat)
    );
    assert_eq!(form.error(Field::Date), Some(ValidationError::MissingDate));
    assert_eq!(form.error(Field::Time), Some(ValidationError::MissingTime));
    assert_eq!(
      form.error(Field::Message),
      Some(ValidationError::MessageTooShort)
    );
    assert_eq!(form.error(Field::Timezone), None);
  }

  #[test]
  fn past_time_is_flagged_on_date_and_time() {
    let mut form = filled();
    form.date = "2026-10-19".into();
    form.time = "11:00".into();
    assert_eq!(form.submit(now()), None);
    assert_eq!(form.error(Field::Date), Some(ValidationError::PastSchedule));
    assert_eq!(form.error(Field::Time), Some(ValidationError::PastSchedule));
  }

  #[test]
  fn malformed_date_and_unknown_timezone() {
    let mut form = filled();
    form.date = "20/10/2026".into();
    form.timezone = "Mars/Olympus".into();
    assert_eq!(form.submit(now()), None);
    assert_eq!(form.error(Field::Date), Some(ValidationError::InvalidDate));
    assert_eq!(
      form.error(Field::Timezone),
      Some(ValidationError::UnknownTimezone)
    );
  }

  #[test]
  fn valid_form_creates_in_its_timezone() {
    let mut form = filled();
    form.timezone = "America/New_York".into();
    let Some(Submission::Create(input)) = form.submit(now()) else {
      panic!("expected a create submission");
    };
    // 09:30 EDT
    assert_eq!(
      input.scheduled_for,
      Utc.with_ymd_and_hms(2026, 10, 20, 13, 30, 0).unwrap()
    );
    assert_eq!(input.timezone, "America/New_York");
    assert!(!form.has_errors());
  }

  #[test]
  fn edit_sends_only_changed_fields() {
    let Some(Submission::Create(input)) = filled().submit(now()) else {
      panic!("expected a create submission");
    };
    let mut original = Reminder::provisional(&input, now());
    original.id = ReminderId::Remote(uuid::Uuid::new_v4());
    original.status = ReminderStatus::Failed;

    let mut form = ReminderForm::edit(&original);
    assert!(form.is_editing());
    assert_eq!(form.date, "2026-10-20");
    assert_eq!(form.time, "09:30");
    assert_eq!(form.submit(now()), None);
    assert!(!form.has_errors());

    form.title = "Call Mom and Dad".into();
    let Some(Submission::Update(id, patch)) = form.submit(now()) else {
      panic!("expected an update submission");
    };
    assert_eq!(id, original.id);
    assert_eq!(patch, ReminderPatch {
      title: Some("Call Mom and Dad".into()),
      ..ReminderPatch::default()
    });
  }

  #[test]
  fn focus_wraps_both_ways() {
    let mut form = ReminderForm::new("UTC");
    form.prev_field(now());
    assert_eq!(form.focused(), Field::Message);
    form.next_field(now());
    assert_eq!(form.focused(), Field::Title);
  }
}
