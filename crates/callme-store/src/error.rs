//! Error type for `callme-store`.

use callme_core::{RemoteError, reminder::ReminderId, validate::ValidationErrors};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
  /// Rejected locally; nothing was sent and the cache is untouched.
  #[error("invalid reminder: {0}")]
  Validation(#[from] ValidationErrors),

  /// The reminder has not been saved yet, so the server cannot address it.
  #[error("reminder {0} is still being saved")]
  Provisional(ReminderId),

  /// The server call failed; any optimistic change has been rolled back.
  #[error(transparent)]
  Remote(#[from] RemoteError),
}

impl Error {
  /// Message suitable for a status line.
  pub fn user_message(&self) -> String {
    match self {
      Self::Validation(errors) => errors.to_string(),
      Self::Provisional(_) => "Still saving, try again in a moment.".to_string(),
      Self::Remote(RemoteError::Network(_)) => {
        "Network error. Please check your connection.".to_string()
      }
      Self::Remote(err) => err.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
