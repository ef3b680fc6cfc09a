use thiserror::Error;

/// Errors raised while parsing or resolving references.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
  #[error("invalid template '{template}': {message}")]
  TemplateSyntax { template: String, message: String },

  #[error(
    "unresolved reference '{instance_id}.{port}' (available ports: [{}])",
    .available.join(", ")
  )]
  UnresolvedReference {
    instance_id: String,
    port: String,
    available: Vec<String>,
  },

  #[error("output '{instance_id}.{port}' is not a dict")]
  NotADict { instance_id: String, port: String },

  #[error("key '{key}' not found in dict '{instance_id}.{port}'")]
  KeyNotFound {
    key: String,
    instance_id: String,
    port: String,
  },
}

impl ResolveError {
  pub(crate) fn syntax(template: &str, message: impl Into<String>) -> Self {
    Self::TemplateSyntax {
      template: template.to_string(),
      message: message.into(),
    }
  }
}
