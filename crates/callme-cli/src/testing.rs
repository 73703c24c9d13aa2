//! In-memory [`ReminderApi`] for the dashboard's tests.

use std::sync::Mutex;

use callme_core::{
  RemoteError, Result,
  api::ReminderApi,
  filter::ListFilter,
  input::{NewReminder, ReminderPatch},
  reminder::{Reminder, ReminderId},
};
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

/// Serves reads from `server`. Creates wait until `release` is notified;
/// updates and deletes fail as if offline.
#[derive(Default)]
pub struct FakeApi {
  pub server:  Mutex<Vec<Reminder>>,
  pub release: Notify,
}

impl FakeApi {
  pub fn with(reminders: Vec<Reminder>) -> Self {
    Self {
      server: Mutex::new(reminders),
      ..Self::default()
    }
  }
}

fn offline() -> RemoteError { RemoteError::Network("offline".into()) }

impl ReminderApi for FakeApi {
  async fn list(&self, filter: ListFilter) -> Result<Vec<Reminder>> {
    let server = self.server.lock().unwrap();
    Ok(server.iter().filter(|r| filter.matches(r)).cloned().collect())
  }

  async fn get(&self, id: Uuid) -> Result<Reminder> {
    let server = self.server.lock().unwrap();
    server
      .iter()
      .find(|r| r.id.remote() == Some(id))
      .cloned()
      .ok_or(RemoteError::Server {
        status:  404,
        message: "Reminder not found".into(),
      })
  }

  async fn create<'a>(&'a self, input: &'a NewReminder) -> Result<Reminder> {
    self.release.notified().await;
    let mut saved = Reminder::provisional(input, Utc::now());
    saved.id = ReminderId::Remote(Uuid::new_v4());
    self.server.lock().unwrap().push(saved.clone());
    Ok(saved)
  }

  async fn update<'a>(&'a self, _id: Uuid, _patch: &'a ReminderPatch) -> Result<Reminder> {
    Err(offline())
  }

  async fn delete(&self, _id: Uuid) -> Result<()> { Err(offline()) }
}
