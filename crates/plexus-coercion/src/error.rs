use thiserror::Error;

use crate::types::TypeKey;

/// Errors produced while converting a value to a declared type.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
  /// A primitive target could not be parsed from the value.
  #[error("cannot parse {value} as {target}: {message}")]
  Parse {
    target: TypeKey,
    value: String,
    message: String,
  },

  /// A structured target has no rule for the value's runtime type.
  #[error("no coercion rule from {source_type} to {target}")]
  NoRule {
    source_type: TypeKey,
    target: TypeKey,
  },
}

impl CoercionError {
  pub(crate) fn parse(target: TypeKey, value: &str, message: impl Into<String>) -> Self {
    Self::Parse {
      target,
      value: format!("'{}'", value),
      message: message.into(),
    }
  }
}
