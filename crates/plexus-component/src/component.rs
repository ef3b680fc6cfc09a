use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::RunContext;
use crate::error::ComponentError;

/// Input handed to a component for one invocation.
#[derive(Debug, Clone)]
pub struct ComponentInput {
  /// Workflow execution ID.
  pub execution_id: String,
  /// Node ID within the plan.
  pub node_id: String,
  /// Gathered input fields.
  pub fields: Map<String, Value>,
  /// Snapshot of the run context when this node's batch started.
  pub context: RunContext,
}

impl ComponentInput {
  pub fn field(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  /// A required field, or [`ComponentError::MissingInput`].
  pub fn require(&self, name: &str) -> Result<&Value, ComponentError> {
    self.fields.get(name).ok_or_else(|| ComponentError::MissingInput {
      field: name.to_string(),
    })
  }
}

/// Output produced by a component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentOutput {
  /// Output data. For a typed component a map is read as `port -> value`.
  /// Otherwise the data becomes the value of the canonical output port, and
  /// a map's entries are also exposed as ports of their own.
  pub data: Value,
  /// Additions to merge into the run context.
  pub context: Map<String, Value>,
}

impl ComponentOutput {
  pub fn new(data: impl Into<Value>) -> Self {
    Self {
      data: data.into(),
      context: Map::new(),
    }
  }

  pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.context.insert(key.into(), value.into());
    self
  }
}

/// An independently implemented async unit of work.
///
/// Implementations are usually I/O bound (model calls, search, SQL). Timeouts
/// and retries are the implementation's own concern.
#[async_trait]
pub trait Component: Send + Sync {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError>;
}
