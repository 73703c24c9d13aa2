//! Input validation for reminder fields.
//!
//! Everything here is pure and takes `now` explicitly, so the same rules run
//! in the form (on every keystroke) and in the store (before any request).

use std::{collections::BTreeMap, fmt, sync::LazyLock};

use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

use crate::input::ReminderDraft;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const MESSAGE_MIN: usize = 10;
pub const MESSAGE_MAX: usize = 500;

/// `+`, a non-zero country digit, then up to 14 more digits.
static E164: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\+[1-9]\d{1,14}$").expect("E.164 pattern compiles"));

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A single field-level rejection. Display strings are user-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("Please select a date")]
  MissingDate,
  #[error("Please select a time")]
  MissingTime,
  #[error("Please enter a date as YYYY-MM-DD")]
  InvalidDate,
  #[error("Please enter a valid time as HH:MM")]
  InvalidTime,
  #[error("Please select a date and time")]
  MissingSchedule,
  #[error("Selected time is in the past")]
  PastSchedule,
  #[error("Cannot schedule more than 1 year in advance")]
  TooFarInFuture,
  #[error("Phone number must be in E.164 format (e.g., +15551234567)")]
  InvalidPhoneFormat,
  #[error("Title must be at least 3 characters")]
  TitleTooShort,
  #[error("Title must be at most 100 characters")]
  TitleTooLong,
  #[error("Message must be at least 10 characters")]
  MessageTooShort,
  #[error("Message must be at most 500 characters")]
  MessageTooLong,
  #[error("Please select a timezone")]
  MissingTimezone,
  #[error("Unknown timezone")]
  UnknownTimezone,
}

/// The input a [`ValidationError`] is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
  Title,
  PhoneNumber,
  Date,
  Time,
  Timezone,
  Message,
}

impl Field {
  pub fn label(&self) -> &'static str {
    match self {
      Self::Title => "title",
      Self::PhoneNumber => "phone number",
      Self::Date => "date",
      Self::Time => "time",
      Self::Timezone => "timezone",
      Self::Message => "message",
    }
  }
}

/// Field-keyed validation failures; at most one error per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<Field, ValidationError>);

impl ValidationErrors {
  pub fn insert(&mut self, field: Field, error: ValidationError) {
    self.0.insert(field, error);
  }

  /// Record the error from `result`, if any.
  pub fn check(&mut self, field: Field, result: Result<(), ValidationError>) {
    if let Err(e) = result {
      self.insert(field, e);
    }
  }

  pub fn get(&self, field: Field) -> Option<ValidationError> { self.0.get(&field).copied() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn iter(&self) -> impl Iterator<Item = (Field, ValidationError)> + '_ {
    self.0.iter().map(|(f, e)| (*f, *e))
  }

  pub fn retain(&mut self, mut keep: impl FnMut(Field) -> bool) {
    self.0.retain(|field, _| keep(*field));
  }

  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl Extend<(Field, ValidationError)> for ValidationErrors {
  fn extend<I: IntoIterator<Item = (Field, ValidationError)>>(&mut self, iter: I) {
    self.0.extend(iter);
  }
}

impl IntoIterator for ValidationErrors {
  type Item = (Field, ValidationError);
  type IntoIter = std::collections::btree_map::IntoIter<Field, ValidationError>;

  fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, (field, error)) in self.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{}: {error}", field.label())?;
    }
    Ok(())
  }
}

impl std::error::Error for ValidationErrors {}

// ─── Field rules ─────────────────────────────────────────────────────────────

pub fn is_valid_phone_number(phone: &str) -> bool { E164.is_match(phone) }

pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
  if is_valid_phone_number(phone) {
    Ok(())
  } else {
    Err(ValidationError::InvalidPhoneFormat)
  }
}

/// Length bounds count characters of the trimmed title.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
  match title.trim().chars().count() {
    n if n < TITLE_MIN => Err(ValidationError::TitleTooShort),
    n if n > TITLE_MAX => Err(ValidationError::TitleTooLong),
    _ => Ok(()),
  }
}

pub fn validate_message(message: &str) -> Result<(), ValidationError> {
  match message.trim().chars().count() {
    n if n < MESSAGE_MIN => Err(ValidationError::MessageTooShort),
    n if n > MESSAGE_MAX => Err(ValidationError::MessageTooLong),
    _ => Ok(()),
  }
}

/// Resolve an IANA zone name.
pub fn validate_timezone(name: &str) -> Result<Tz, ValidationError> {
  let name = name.trim();
  if name.is_empty() {
    return Err(ValidationError::MissingTimezone);
  }
  name.parse().map_err(|_| ValidationError::UnknownTimezone)
}

/// The instant must be strictly after `now` and no more than one calendar
/// year ahead of it.
pub fn validate_schedule(at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
  if at <= now {
    return Err(ValidationError::PastSchedule);
  }
  let horizon = now
    .checked_add_months(Months::new(12))
    .unwrap_or(DateTime::<Utc>::MAX_UTC);
  if at > horizon {
    return Err(ValidationError::TooFarInFuture);
  }
  Ok(())
}

/// Parse an `HH:MM` time of day.
pub fn parse_time(time: &str) -> Result<NaiveTime, ValidationError> {
  NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| ValidationError::InvalidTime)
}

/// Combine a calendar date and an `HH:MM` wall-clock time in `tz` into one
/// instant. Seconds are zeroed. A wall-clock time skipped by a DST change is
/// rejected; an ambiguous one resolves to its earlier occurrence.
pub fn combine_date_and_time(
  date: NaiveDate,
  time: &str,
  tz: Tz,
) -> Result<DateTime<Utc>, ValidationError> {
  let time = parse_time(time)?;
  let local = date.and_time(time);
  tz.from_local_datetime(&local)
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or(ValidationError::InvalidTime)
}

// ─── Date/time input ─────────────────────────────────────────────────────────

/// The separate date and time inputs of the reminder form, with the
/// interaction state that decides whether a missing value is an error yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleInput {
  pub date:          Option<NaiveDate>,
  /// `HH:MM`; empty means no time chosen.
  pub time:          String,
  pub date_required: bool,
  pub time_required: bool,
  pub date_touched:  bool,
  pub time_touched:  bool,
}

impl Default for ScheduleInput {
  fn default() -> Self {
    Self {
      date:          None,
      time:          String::new(),
      date_required: true,
      time_required: true,
      date_touched:  false,
      time_touched:  false,
    }
  }
}

impl ScheduleInput {
  /// Pre-fill both inputs from an existing instant, shown in `tz`.
  pub fn from_instant(at: DateTime<Utc>, tz: Tz) -> Self {
    let local = at.with_timezone(&tz);
    Self {
      date: Some(local.date_naive()),
      time: format!("{:02}:{:02}", local.hour(), local.minute()),
      ..Self::default()
    }
  }

  pub fn touch_all(&mut self) {
    self.date_touched = true;
    self.time_touched = true;
  }

  /// Validate the inputs at `now`.
  ///
  /// Returns `Ok(None)` while either half is still blank and untouched, and
  /// `Ok(Some(instant))` once both are filled in and the combination is
  /// schedulable. Errors are keyed by [`Field::Date`] and [`Field::Time`].
  pub fn validate(
    &self,
    tz: Tz,
    now: DateTime<Utc>,
  ) -> Result<Option<DateTime<Utc>>, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let time = self.time.trim();

    if self.date.is_none() && self.date_required && self.date_touched {
      errors.insert(Field::Date, ValidationError::MissingDate);
    }
    if time.is_empty() && self.time_required && self.time_touched {
      errors.insert(Field::Time, ValidationError::MissingTime);
    }

    let Some(date) = self.date.filter(|_| !time.is_empty()) else {
      return errors.into_result().map(|()| None);
    };

    match combine_date_and_time(date, time, tz) {
      Ok(at) => match validate_schedule(at, now) {
        Ok(()) => Ok(Some(at)),
        Err(ValidationError::PastSchedule) => {
          errors.insert(Field::Date, ValidationError::PastSchedule);
          errors.insert(Field::Time, ValidationError::PastSchedule);
          Err(errors)
        }
        Err(e) => {
          errors.insert(Field::Date, e);
          Err(errors)
        }
      },
      Err(e) => {
        errors.insert(Field::Time, e);
        Err(errors)
      }
    }
  }

  /// Validate against the draft's timezone and, on success, write the
  /// combined instant into the draft's scheduled time.
  pub fn write_into(
    &self,
    draft: &mut ReminderDraft,
    now: DateTime<Utc>,
  ) -> Result<(), ValidationErrors> {
    let tz = validate_timezone(&draft.timezone).map_err(|e| {
      let mut errors = ValidationErrors::default();
      errors.insert(Field::Timezone, e);
      errors
    })?;
    if let Some(at) = self.validate(tz, now)? {
      draft.scheduled_for = Some(at);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeDelta};
  use chrono_tz::America::New_York;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap() }

  fn filled(date: NaiveDate, time: &str) -> ScheduleInput {
    ScheduleInput {
      date: Some(date),
      time: time.into(),
      ..ScheduleInput::default()
    }
  }

  // ─── Phone ───────────────────────────────────────────────────────────────

  #[test]
  fn phone_numbers_follow_e164() {
    assert!(is_valid_phone_number("+15551234567"));
    assert!(is_valid_phone_number("+442071234567"));
    assert!(!is_valid_phone_number("15551234567"));
    assert!(!is_valid_phone_number("+0555123456"));
    assert!(!is_valid_phone_number("+1-555-123-4567"));
    assert!(!is_valid_phone_number("+1"));
    assert!(!is_valid_phone_number("+1234567890123456"));
    assert_eq!(
      validate_phone_number("555"),
      Err(ValidationError::InvalidPhoneFormat)
    );
  }

  // ─── Lengths ─────────────────────────────────────────────────────────────

  #[test]
  fn title_bounds() {
    assert_eq!(validate_title("AB"), Err(ValidationError::TitleTooShort));
    assert_eq!(validate_title("ABC"), Ok(()));
    assert_eq!(validate_title(&"A".repeat(100)), Ok(()));
    assert_eq!(
      validate_title(&"A".repeat(101)),
      Err(ValidationError::TitleTooLong)
    );
  }

  #[test]
  fn message_bounds() {
    assert_eq!(validate_message("Short"), Err(ValidationError::MessageTooShort));
    assert_eq!(validate_message(&"A".repeat(500)), Ok(()));
    assert_eq!(
      validate_message(&"A".repeat(501)),
      Err(ValidationError::MessageTooLong)
    );
    // Characters, not bytes.
    assert_eq!(validate_message(&"é".repeat(300)), Ok(()));
  }

  #[test]
  fn timezones_must_be_iana_names() {
    assert_eq!(validate_timezone("America/New_York"), Ok(New_York));
    assert_eq!(validate_timezone(""), Err(ValidationError::MissingTimezone));
    assert_eq!(
      validate_timezone("Mars/Olympus"),
      Err(ValidationError::UnknownTimezone)
    );
  }

  // ─── Schedule ────────────────────────────────────────────────────────────

  #[test]
  fn time_already_passed_today_is_in_the_past() {
    let input = filled(now().date_naive(), "09:30");
    let errors = input.validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Date), Some(ValidationError::PastSchedule));
    assert_eq!(errors.get(Field::Time), Some(ValidationError::PastSchedule));
  }

  #[test]
  fn current_minute_is_not_strictly_after_now() {
    let input = filled(now().date_naive(), "12:00");
    let errors = input.validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Date), Some(ValidationError::PastSchedule));
  }

  #[test]
  fn four_hundred_days_out_is_too_far() {
    let date = now().date_naive() + Duration::days(400);
    let errors = filled(date, "10:00").validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Date), Some(ValidationError::TooFarInFuture));
    assert_eq!(errors.get(Field::Time), None);
  }

  #[test]
  fn tomorrow_at_any_time_is_valid() {
    let tomorrow = now().date_naive() + Duration::days(1);
    for time in ["00:00", "06:15", "12:00", "23:59"] {
      let at = filled(tomorrow, time)
        .validate(Tz::UTC, now())
        .unwrap()
        .expect("both halves present");
      assert!(at > now());
    }
  }

  #[test]
  fn combines_in_the_given_zone() {
    let date = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
    let at = combine_date_and_time(date, "09:00", New_York).unwrap();
    // EDT is UTC-4 in October.
    assert_eq!(at, Utc.with_ymd_and_hms(2026, 10, 20, 13, 0, 0).unwrap());
  }

  #[test]
  fn skipped_wall_clock_time_is_rejected() {
    // Clocks jump from 02:00 to 03:00 on 2027-03-14 in New York.
    let date = NaiveDate::from_ymd_opt(2027, 3, 14).unwrap();
    assert_eq!(
      combine_date_and_time(date, "02:30", New_York),
      Err(ValidationError::InvalidTime)
    );
  }

  #[test]
  fn malformed_time_is_rejected() {
    let tomorrow = now().date_naive() + Duration::days(1);
    let errors = filled(tomorrow, "25:99").validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Time), Some(ValidationError::InvalidTime));
  }

  #[test]
  fn missing_halves_only_error_once_touched() {
    let mut input = ScheduleInput::default();
    assert_eq!(input.validate(Tz::UTC, now()), Ok(None));

    input.date_touched = true;
    let errors = input.validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Date), Some(ValidationError::MissingDate));
    assert_eq!(errors.get(Field::Time), None);

    input.time_touched = true;
    let errors = input.validate(Tz::UTC, now()).unwrap_err();
    assert_eq!(errors.get(Field::Time), Some(ValidationError::MissingTime));
  }

  #[test]
  fn optional_halves_never_report_missing() {
    let mut input = ScheduleInput {
      date_required: false,
      time_required: false,
      ..ScheduleInput::default()
    };
    input.touch_all();
    assert_eq!(input.validate(Tz::UTC, now()), Ok(None));
  }

  #[test]
  fn write_into_sets_the_drafts_schedule() {
    let mut draft = ReminderDraft {
      timezone: "UTC".into(),
      ..ReminderDraft::default()
    };
    let tomorrow = now().date_naive() + Duration::days(1);
    filled(tomorrow, "08:45").write_into(&mut draft, now()).unwrap();
    assert_eq!(
      draft.scheduled_for,
      Some(Utc.with_ymd_and_hms(2026, 10, 20, 8, 45, 0).unwrap())
    );
  }

  #[test]
  fn write_into_rejects_unknown_zone() {
    let mut draft = ReminderDraft {
      timezone: "Nowhere/Special".into(),
      ..ReminderDraft::default()
    };
    let errors = filled(now().date_naive(), "13:00")
      .write_into(&mut draft, now())
      .unwrap_err();
    assert_eq!(
      errors.get(Field::Timezone),
      Some(ValidationError::UnknownTimezone)
    );
    assert!(draft.scheduled_for.is_none());
  }

  #[test]
  fn round_trips_an_existing_instant() {
    let at = now() + TimeDelta::days(2);
    let input = ScheduleInput::from_instant(at, New_York);
    assert_eq!(input.time, "08:00");
    assert_eq!(input.validate(New_York, now()), Ok(Some(at)));
  }
}
