//! Error taxonomy for the resource client.

use thiserror::Error;

/// Errors produced by the resource client.
///
/// The client never retries or swallows errors; callers decide what to do
/// with each class. Query and mutation handles carry these into their state
/// instead of propagating panics across view boundaries.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
  /// The server was unreachable or the connection failed mid-request.
  #[error("network error: {0}")]
  Transport(String),

  /// The server answered with a non-2xx status.
  #[error("server returned {status}: {body}")]
  Api { status: u16, body: String },

  /// The response body did not match the expected schema.
  #[error("failed to decode response: {0}")]
  Decode(String),

  /// A path template referenced a parameter that was not supplied.
  #[error("missing path parameter `{name}` for {template}")]
  InvalidPath {
    template: &'static str,
    name: String,
  },
}

impl ApiError {
  /// HTTP status code, if this error came from the server.
  pub fn status(&self) -> Option<u16> {
    match self {
      ApiError::Api { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Whether this error is the backend telling us the session is gone.
  ///
  /// The cache store halts further fetches when it records one of these.
  pub fn is_unauthenticated(&self) -> bool {
    self.status() == Some(401)
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      ApiError::Decode(err.to_string())
    } else {
      ApiError::Transport(err.to_string())
    }
  }
}
