//! Execution result types.

use std::collections::HashMap;

use plexus_component::RunContext;
use serde::Serialize;
use serde_json::{Map, Value};

/// Result of one complete run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
  /// Unique execution ID.
  pub execution_id: String,
  /// Output ports of every node that ran, keyed by node id.
  pub outputs: HashMap<String, Map<String, Value>>,
  /// Graph sinks the result is assembled from, sorted.
  pub terminal_nodes: Vec<String>,
  /// Run context after the last batch.
  pub context: RunContext,
  output: Value,
}

impl RunResult {
  pub(crate) fn new(
    execution_id: String,
    outputs: HashMap<String, Map<String, Value>>,
    terminal_nodes: Vec<(String, String)>,
    context: RunContext,
  ) -> Self {
    let canonical = |node_id: &str, port: &str| {
      outputs
        .get(node_id)
        .and_then(|ports| ports.get(port))
        .cloned()
        .unwrap_or(Value::Null)
    };

    let output = match terminal_nodes.as_slice() {
      [] => Value::Null,
      [(node_id, port)] => canonical(node_id.as_str(), port.as_str()),
      many => Value::Object(
        many
          .iter()
          .map(|(node_id, port)| (node_id.clone(), canonical(node_id.as_str(), port.as_str())))
          .collect(),
      ),
    };

    Self {
      execution_id,
      terminal_nodes: terminal_nodes.into_iter().map(|(id, _)| id).collect(),
      outputs,
      context,
      output,
    }
  }

  /// The canonical output of the single terminal node, or a map of terminal
  /// id to canonical output when there are several.
  pub fn output(&self) -> &Value {
    &self.output
  }

  /// One output port of one node.
  pub fn port(&self, node_id: &str, port: &str) -> Option<&Value> {
    self.outputs.get(node_id).and_then(|ports| ports.get(port))
  }
}
