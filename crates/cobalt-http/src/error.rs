/// Errors produced when a request could not be completed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
  #[error("invalid url '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("unsupported HTTP method: {method}")]
  UnsupportedMethod { method: String },

  #[error("request timed out: {url}")]
  Timeout { url: String },

  #[error("request failed: {message}")]
  Request { message: String },
}

impl From<reqwest::Error> for TransportError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      TransportError::Timeout {
        url: err.url().map(|u| u.to_string()).unwrap_or_default(),
      }
    } else {
      TransportError::Request {
        message: err.to_string(),
      }
    }
  }
}
