//! Async HTTP client for the reminders REST API.

use std::time::Duration;

use anyhow::Context as _;
use callme_core::{
  RemoteError, Result,
  api::ReminderApi,
  filter::ListFilter,
  input::{NewReminder, ReminderPatch},
  reminder::Reminder,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, de::DeserializeOwned};
use uuid::Uuid;

/// Connection settings for the reminders API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

/// [`ReminderApi`] over HTTP.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

// ─── Wire shapes ──────────────────────────────────────────────────────────────

/// `GET /reminders/` answers either with a page envelope or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
  Page { reminders: Vec<Reminder> },
  Bare(Vec<Reminder>),
}

impl ListBody {
  fn into_vec(self) -> Vec<Reminder> {
    match self {
      Self::Page { reminders } => reminders,
      Self::Bare(reminders) => reminders,
    }
  }
}

#[derive(Deserialize)]
struct ErrorBody {
  detail: Detail,
}

/// `detail` is a plain message for handled errors and a list of field
/// errors for request validation failures.
#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
  Message(String),
  Fields(Vec<FieldDetail>),
}

#[derive(Deserialize)]
struct FieldDetail {
  msg: String,
}

impl Detail {
  fn into_message(self) -> String {
    match self {
      Self::Message(m) => m,
      Self::Fields(fields) => fields
        .into_iter()
        .map(|f| f.msg)
        .collect::<Vec<_>>()
        .join("; "),
    }
  }
}

// ─── Client ───────────────────────────────────────────────────────────────────

impl ApiClient {
  pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  /// Send `req`, turning transport failures and non-2xx answers into
  /// [`RemoteError`]s.
  async fn send(&self, req: RequestBuilder, what: &'static str) -> Result<Response> {
    tracing::debug!(request = what, "sending");
    let resp = req
      .send()
      .await
      .map_err(|e| RemoteError::Network(e.to_string()))?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let message = resp
      .json::<ErrorBody>()
      .await
      .ok()
      .map(|body| body.detail.into_message())
      .filter(|m| !m.is_empty())
      .unwrap_or_else(|| status.to_string());
    tracing::debug!(request = what, %status, %message, "request failed");
    Err(RemoteError::Server {
      status: status.as_u16(),
      message,
    })
  }

  async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status().as_u16();
    resp.json().await.map_err(|e| RemoteError::Server {
      status,
      message: format!("unexpected response: {e}"),
    })
  }
}

impl ReminderApi for ApiClient {
  async fn list(&self, filter: ListFilter) -> Result<Vec<Reminder>> {
    let req = self.client.get(self.url("/reminders/")).query(&filter.query());
    let resp = self.send(req, "GET /reminders/").await?;
    Self::decode::<ListBody>(resp).await.map(ListBody::into_vec)
  }

  async fn get(&self, id: Uuid) -> Result<Reminder> {
    let req = self.client.get(self.url(&format!("/reminders/{id}")));
    let resp = self.send(req, "GET /reminders/{id}").await?;
    Self::decode(resp).await
  }

  async fn create<'a>(&'a self, input: &'a NewReminder) -> Result<Reminder> {
    let req = self.client.post(self.url("/reminders/")).json(input);
    let resp = self.send(req, "POST /reminders/").await?;
    Self::decode(resp).await
  }

  async fn update<'a>(&'a self, id: Uuid, patch: &'a ReminderPatch) -> Result<Reminder> {
    let req = self
      .client
      .put(self.url(&format!("/reminders/{id}")))
      .json(patch);
    let resp = self.send(req, "PUT /reminders/{id}").await?;
    Self::decode(resp).await
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let req = self.client.delete(self.url(&format!("/reminders/{id}")));
    self.send(req, "DELETE /reminders/{id}").await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use axum::{
    Json, Router,
    extract::{Path, Query},
    http::StatusCode,
    routing::get,
  };
  use callme_core::reminder::ReminderStatus;
  use chrono::{TimeDelta, Utc};
  use serde_json::{Value, json};

  use super::*;

  const ID: &str = "6f1c2d3e-1111-4a2b-9c3d-444455556666";

  fn reminder_json(title: &str, status: &str) -> Value {
    json!({
      "id": ID,
      "title": title,
      "message": "Bring the insurance card",
      "phone_number": "+15551234567",
      "scheduled_for": "2026-11-01T09:00:00Z",
      "timezone": "America/New_York",
      "status": status,
      "retry_count": 0,
      "created_at": "2026-10-19T12:00:00Z",
      "updated_at": "2026-10-19T12:00:00Z",
      "call_attempts": [],
    })
  }

  async fn list(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let items = match q.get("status").map(String::as_str) {
      Some("failed") => vec![],
      _ => vec![reminder_json("Dentist", "scheduled")],
    };
    let total = items.len();
    Json(json!({
      "reminders": items,
      "total": total,
      "page": 1,
      "per_page": 20,
      "total_pages": 1,
    }))
  }

  async fn detail(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == ID {
      (StatusCode::OK, Json(reminder_json("Dentist", "completed")))
    } else {
      (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Reminder not found" })),
      )
    }
  }

  async fn create(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let title = body["title"].as_str().unwrap_or_default();
    (StatusCode::CREATED, Json(reminder_json(title, "scheduled")))
  }

  async fn update(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    // Only the fields being changed are sent.
    assert_eq!(body.as_object().map(|o| o.len()), Some(1));
    (
      StatusCode::UNPROCESSABLE_ENTITY,
      Json(json!({
        "detail": [
          { "loc": ["body", "timezone"], "msg": "Invalid timezone", "type": "value_error" }
        ]
      })),
    )
  }

  async fn remove() -> StatusCode { StatusCode::NO_CONTENT }

  fn router() -> Router {
    Router::new()
      .route("/api/reminders/", get(list).post(create))
      .route("/api/reminders/{id}", get(detail).put(update).delete(remove))
  }

  async fn serve(router: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}/"),
      timeout:  Duration::from_secs(5),
    })
    .unwrap()
  }

  fn id() -> Uuid { ID.parse().unwrap() }

  #[tokio::test]
  async fn lists_from_page_envelope_with_status_filter() {
    let client = serve(router()).await;

    let all = client.list(ListFilter::ALL).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id.remote(), Some(id()));

    let failed = client
      .list(ListFilter::status(ReminderStatus::Failed))
      .await
      .unwrap();
    assert!(failed.is_empty());
  }

  #[tokio::test]
  async fn lists_from_bare_array() {
    let router = Router::new().route(
      "/api/reminders/",
      get(|| async { Json(json!([reminder_json("Pharmacy", "failed")])) }),
    );
    let client = serve(router).await;

    let all = client.list(ListFilter::ALL).await.unwrap();
    assert_eq!(all[0].status, ReminderStatus::Failed);
  }

  #[tokio::test]
  async fn get_reports_detail_message_on_not_found() {
    let client = serve(router()).await;

    let found = client.get(id()).await.unwrap();
    assert_eq!(found.status, ReminderStatus::Completed);

    let err = client.get(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err, RemoteError::Server {
      status:  404,
      message: "Reminder not found".into(),
    });
  }

  #[tokio::test]
  async fn create_returns_server_record() {
    let client = serve(router()).await;
    let input = NewReminder {
      title:         "Call Mom".into(),
      message:       "Wish her a happy birthday".into(),
      phone_number:  "+15551234567".into(),
      scheduled_for: Utc::now() + TimeDelta::days(1),
      timezone:      "UTC".into(),
    };

    let saved = client.create(&input).await.unwrap();
    assert_eq!(saved.title, "Call Mom");
    assert!(!saved.id.is_provisional());
  }

  #[tokio::test]
  async fn update_joins_field_error_messages() {
    let client = serve(router()).await;
    let patch = ReminderPatch {
      timezone: Some("Mars/Olympus".into()),
      ..ReminderPatch::default()
    };

    let err = client.update(id(), &patch).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "Invalid timezone");
  }

  #[tokio::test]
  async fn delete_accepts_no_content() {
    let client = serve(router()).await;
    client.delete(id()).await.unwrap();
  }

  #[tokio::test]
  async fn undecodable_body_is_a_server_error() {
    let router = Router::new().route("/api/reminders/{id}", get(|| async { "not json" }));
    let client = serve(router).await;

    let err = client.get(id()).await.unwrap_err();
    assert_eq!(err.status(), Some(200));
    assert!(!err.is_network());
  }

  #[tokio::test]
  async fn error_without_detail_uses_status_line() {
    let router = Router::new().route(
      "/api/reminders/{id}",
      get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
    );
    let client = serve(router).await;

    let err = client.get(id()).await.unwrap_err();
    assert_eq!(err.to_string(), "500 Internal Server Error");
  }

  #[tokio::test]
  async fn unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}"),
      timeout:  Duration::from_secs(2),
    })
    .unwrap();
    let err = client.list(ListFilter::ALL).await.unwrap_err();
    assert!(err.is_network());
  }
}
