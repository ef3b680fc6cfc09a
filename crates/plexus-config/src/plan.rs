use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::expression::FieldExpression;
use crate::input::ParamValue;
use crate::mapping::PortMapping;

/// A plan definition: graph, wiring, expressions, and static parameters.
///
/// Components themselves are supplied separately when the plan is built; the
/// definition only refers to them by node id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
  #[serde(default)]
  pub name: String,
  pub nodes: Vec<String>,
  /// Must-run-before edges as `(from, to)` pairs.
  #[serde(default)]
  pub edges: Vec<(String, String)>,
  /// Nodes fed by the run's initial payload. Inferred from the edges when empty.
  #[serde(default)]
  pub start_nodes: Vec<String>,
  #[serde(default)]
  pub mappings: Vec<PortMapping>,
  #[serde(default)]
  pub expressions: Vec<FieldExpression>,
  /// Static parameters per node id, keyed by field name.
  #[serde(default)]
  pub params: HashMap<String, HashMap<String, ParamValue>>,
}

impl PlanDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn node(mut self, node_id: impl Into<String>) -> Self {
    self.nodes.push(node_id.into());
    self
  }

  pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
    self.edges.push((from.into(), to.into()));
    self
  }

  pub fn start(mut self, node_id: impl Into<String>) -> Self {
    self.start_nodes.push(node_id.into());
    self
  }

  pub fn mapping(mut self, mapping: PortMapping) -> Self {
    self.mappings.push(mapping);
    self
  }

  pub fn expression(mut self, expression: FieldExpression) -> Self {
    self.expressions.push(expression);
    self
  }

  pub fn param(
    mut self,
    node_id: impl Into<String>,
    field: impl Into<String>,
    value: impl Into<ParamValue>,
  ) -> Self {
    self
      .params
      .entry(node_id.into())
      .or_default()
      .insert(field.into(), value.into());
    self
  }
}
