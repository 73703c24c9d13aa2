//! Error types for `callme-core`.

use thiserror::Error;

/// A failure reported by a [`ReminderApi`](crate::api::ReminderApi)
/// implementation.
///
/// Both variants are recoverable: the store rolls back whatever optimistic
/// change was riding on the call and hands the error to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
  /// The request never produced a response (connection refused, timeout).
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a non-2xx status, or with a body we could not
  /// decode.
  #[error("{message}")]
  Server { status: u16, message: String },
}

impl RemoteError {
  pub fn is_network(&self) -> bool { matches!(self, Self::Network(_)) }

  /// HTTP status of a server error; `None` for transport failures.
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Network(_) => None,
      Self::Server { status, .. } => Some(*status),
    }
  }
}

pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
