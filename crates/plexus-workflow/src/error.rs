use plexus_coercion::TypeKey;
use plexus_config::MappingStrategy;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("node id '{0}' is reserved for the run payload")]
  ReservedNodeId(String),

  #[error("no component registered for node '{0}'")]
  ComponentNotRegistered(String),

  #[error("edge references unknown node: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("no entry points found (all nodes have incoming edges)")]
  NoEntryPoints,

  #[error("node '{0}' has no predecessors but is not a start node (orphan node)")]
  OrphanNode(String),

  #[error("cycle detected: {}", .path.join(" -> "))]
  CycleDetected { path: Vec<String> },

  #[error(
    "node '{node}' has {} predecessors ({}) and no mapping or expression selecting its inputs",
    .predecessors.len(),
    .predecessors.join(", ")
  )]
  AmbiguousFanIn {
    node: String,
    predecessors: Vec<String>,
  },

  #[error("'{node}' has no {direction} port '{port}'")]
  UnknownPort {
    node: String,
    port: String,
    direction: &'static str,
  },

  #[error(
    "cannot map '{source_node}.{source_port}' ({source_type}) to '{target_node}.{target_port}' ({target_type})"
  )]
  IncompatibleMapping {
    source_node: String,
    source_port: String,
    source_type: TypeKey,
    target_node: String,
    target_port: String,
    target_type: TypeKey,
  },

  #[error("mapping '{source_node}' -> '{target_node}' uses unsupported strategy {strategy:?}")]
  UnsupportedStrategy {
    source_node: String,
    target_node: String,
    strategy: MappingStrategy,
  },
}
