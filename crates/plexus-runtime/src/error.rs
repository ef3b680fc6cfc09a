//! Runtime error types.

use plexus_coercion::CoercionError;
use plexus_component::ComponentError;
use plexus_resolver::ResolveError;
use plexus_workflow::WorkflowError;

use crate::task::TaskStateError;

/// Errors that can occur while building or running a plan.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
  /// Structural or mapping validation failed.
  #[error("invalid plan: {0}")]
  Workflow(#[from] WorkflowError),

  #[error("expression targets unknown component '{node}'")]
  UnknownExpressionTarget { node: String },

  #[error("component '{node}' does not accept field expressions")]
  ExpressionTargetUnsupported { node: String },

  #[error("expression targets unknown input field '{node}.{field}'")]
  UnknownExpressionField { node: String, field: String },

  /// An expression or parameter template reads an output that can never exist.
  #[error("'{node}.{field}' references unknown output '{instance_id}.{port}'")]
  UnknownReference {
    node: String,
    field: String,
    instance_id: String,
    port: String,
  },

  /// A string parameter is not a valid template.
  #[error("invalid parameter '{field}' on node '{node_id}': {source}")]
  Template {
    node_id: String,
    field: String,
    #[source]
    source: ResolveError,
  },

  /// Failed to resolve a parameter, mapping, or expression for a node.
  #[error("input resolution failed for '{node_id}.{field}': {source}")]
  InputResolution {
    node_id: String,
    field: String,
    #[source]
    source: ResolveError,
  },

  /// A gathered input could not be converted to its declared type.
  #[error("input '{node_id}.{field}' does not match its declared type: {source}")]
  InputCoercion {
    node_id: String,
    field: String,
    #[source]
    source: CoercionError,
  },

  /// A component output could not be converted to its declared type.
  #[error("output '{node_id}.{port}' does not match its declared type: {source}")]
  OutputCoercion {
    node_id: String,
    port: String,
    #[source]
    source: CoercionError,
  },

  /// Component execution failed.
  #[error("component execution failed for node '{node_id}': {source}")]
  Component {
    node_id: String,
    #[source]
    source: ComponentError,
  },

  #[error(transparent)]
  TaskState(#[from] TaskStateError),

  /// Nodes were left unfinished with nothing ready to run.
  #[error("execution stalled with unfinished nodes: {}", .pending.join(", "))]
  Stalled { pending: Vec<String> },
}
