use thiserror::Error;

/// Errors returned by a component's `run`.
///
/// The engine never retries or rewraps these; they reach the caller as the
/// `source` of the run error.
#[derive(Debug, Error)]
pub enum ComponentError {
  /// Missing required input field.
  #[error("missing required input: {field}")]
  MissingInput { field: String },

  /// Invalid input value.
  #[error("invalid input '{field}': {message}")]
  InvalidInput { field: String, message: String },

  /// The component's own work failed.
  #[error("component error: {message}")]
  Failed { message: String },

  /// Component timed out.
  #[error("component timed out after {timeout_ms}ms")]
  Timeout { timeout_ms: u64 },

  /// Any other error raised by the implementation.
  #[error(transparent)]
  Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ComponentError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}
