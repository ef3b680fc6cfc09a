use serde::{Deserialize, Serialize};

/// How a mapping moves data from source port to target port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStrategy {
  /// Copy the source port value into the target field.
  #[default]
  Direct,
  /// Reserved. Rejected when a plan is built.
  FunctionCall,
}

/// A data-flow edge between two components' ports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortMapping {
  pub source_id: String,
  pub source_port: String,
  pub target_id: String,
  pub target_port: String,
  #[serde(default)]
  pub strategy: MappingStrategy,
}

impl PortMapping {
  /// Create a direct mapping.
  pub fn direct(
    source_id: impl Into<String>,
    source_port: impl Into<String>,
    target_id: impl Into<String>,
    target_port: impl Into<String>,
  ) -> Self {
    Self {
      source_id: source_id.into(),
      source_port: source_port.into(),
      target_id: target_id.into(),
      target_port: target_port.into(),
      strategy: MappingStrategy::Direct,
    }
  }
}
