//! The `ReminderApi` trait: the remote source of truth.
//!
//! Implemented by the HTTP client in `callme-cli`; the optimistic store in
//! `callme-store` depends on this abstraction, not on any transport.

use std::{future::Future, sync::Arc};

use uuid::Uuid;

use crate::{
  Result,
  filter::ListFilter,
  input::{NewReminder, ReminderPatch},
  reminder::Reminder,
};

/// Reminder CRUD against the backend.
///
/// All methods return `Send` futures so the store can drive them from
/// spawned tokio tasks.
pub trait ReminderApi: Send + Sync {
  /// `GET /reminders/[?status=..]`
  fn list(
    &self,
    filter: ListFilter,
  ) -> impl Future<Output = Result<Vec<Reminder>>> + Send + '_;

  /// `GET /reminders/{id}`
  fn get(&self, id: Uuid) -> impl Future<Output = Result<Reminder>> + Send + '_;

  /// `POST /reminders/`; returns the server's record with its real id.
  fn create<'a>(
    &'a self,
    input: &'a NewReminder,
  ) -> impl Future<Output = Result<Reminder>> + Send + 'a;

  /// `PUT /reminders/{id}` with only the fields present in `patch`.
  fn update<'a>(
    &'a self,
    id: Uuid,
    patch: &'a ReminderPatch,
  ) -> impl Future<Output = Result<Reminder>> + Send + 'a;

  /// `DELETE /reminders/{id}`
  fn delete(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send + '_;
}

impl<T: ReminderApi> ReminderApi for Arc<T> {
  fn list(
    &self,
    filter: ListFilter,
  ) -> impl Future<Output = Result<Vec<Reminder>>> + Send + '_ {
    (**self).list(filter)
  }

  fn get(&self, id: Uuid) -> impl Future<Output = Result<Reminder>> + Send + '_ {
    (**self).get(id)
  }

  fn create<'a>(
    &'a self,
    input: &'a NewReminder,
  ) -> impl Future<Output = Result<Reminder>> + Send + 'a {
    (**self).create(input)
  }

  fn update<'a>(
    &'a self,
    id: Uuid,
    patch: &'a ReminderPatch,
  ) -> impl Future<Output = Result<Reminder>> + Send + 'a {
    (**self).update(id, patch)
  }

  fn delete(&self, id: Uuid) -> impl Future<Output = Result<()>> + Send + '_ {
    (**self).delete(id)
  }
}
