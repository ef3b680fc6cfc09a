//! Plan construction and validation.
//!
//! A [`Plan`] is the immutable, validated form of a [`PlanDef`]: the union
//! graph (structural edges, the virtual input, and one edge per mapping,
//! expression reference, and parameter template reference), the effective
//! mappings including synthesized ones, and parsed parameter templates.

use std::collections::{BTreeMap, HashMap, HashSet};

use plexus_coercion::{CoercionPolicy, CoercionRegistry};
use plexus_component::{ComponentRegistry, Registration};
use plexus_config::{FieldExpression, ParamValue, PlanDef, PortMapping, VIRTUAL_INPUT_ID};
use plexus_resolver::TemplateValue;
use plexus_workflow::{Graph, WorkflowError, synthesize_default_mappings, validate_port_mappings};
use tracing::debug;

use crate::error::RuntimeError;

/// Parsed static parameters of one node, sorted by field name.
pub type NodeParams = Vec<(String, TemplateValue)>;

#[derive(Debug, Clone)]
pub struct Plan {
  name: String,
  graph: Graph,
  components: ComponentRegistry,
  start_nodes: Vec<String>,
  /// Explicit mappings followed by synthesized ones.
  mappings: Vec<PortMapping>,
  explicit_mappings: usize,
  expressions: Vec<FieldExpression>,
  params: BTreeMap<String, NodeParams>,
  terminal_nodes: Vec<String>,
}

impl Plan {
  /// Validate a definition against the registered components.
  ///
  /// Every check happens here so a plan that builds can only fail at run
  /// time through resolution, coercion, or its components.
  pub fn build(
    def: PlanDef,
    components: ComponentRegistry,
    coercion: &CoercionRegistry,
    policy: &CoercionPolicy,
  ) -> Result<Self, RuntimeError> {
    let PlanDef {
      name,
      nodes,
      edges,
      start_nodes,
      mappings,
      expressions,
      params,
    } = def;

    if nodes.iter().any(|id| id == VIRTUAL_INPUT_ID) {
      return Err(WorkflowError::ReservedNodeId(VIRTUAL_INPUT_ID.to_string()).into());
    }

    if let Some(missing) = nodes.iter().find(|id| !components.contains(id)) {
      return Err(WorkflowError::ComponentNotRegistered(missing.clone()).into());
    }

    let structural = Graph::new(nodes.iter().cloned(), &edges)?;
    let start_nodes = resolve_start_nodes(&structural, start_nodes)?;
    let params = parse_params(&structural, params)?;

    // Nodes whose inputs are chosen explicitly, so fan-in is not ambiguous.
    let selected: HashSet<&str> = expressions
      .iter()
      .map(|e| e.target_id.as_str())
      .chain(
        params
          .iter()
          .filter(|(_, fields)| fields.iter().any(|(_, v)| !v.references().is_empty()))
          .map(|(node_id, _)| node_id.as_str()),
      )
      .collect();
    let expression_fields: HashSet<(&str, &str)> = expressions
      .iter()
      .map(|e| (e.target_id.as_str(), e.target_field.as_str()))
      .collect();

    let synthesized = synthesize_default_mappings(
      &structural,
      &components,
      VIRTUAL_INPUT_ID,
      &mappings,
      &selected,
      &expression_fields,
    )?;
    let explicit_mappings = mappings.len();
    let mut mappings = mappings;
    mappings.extend(synthesized);
    validate_port_mappings(&mappings, &components, VIRTUAL_INPUT_ID, coercion, policy)?;

    let mut graph = structural;
    graph.add_node(VIRTUAL_INPUT_ID);
    for start in &start_nodes {
      graph.add_edge(VIRTUAL_INPUT_ID, start)?;
    }
    for mapping in &mappings {
      graph.add_edge(&mapping.source_id, &mapping.target_id)?;
    }

    for field_expression in &expressions {
      validate_expression_target(&graph, &components, field_expression)?;
      let target = field_expression.target_id.as_str();
      for (instance_id, port) in field_expression.expression.references() {
        check_reference(
          &graph,
          &components,
          target,
          &field_expression.target_field,
          instance_id,
          port,
        )?;
        graph.add_edge(instance_id, target)?;
      }
    }

    for (node_id, fields) in &params {
      for (field, value) in fields {
        for (instance_id, port) in value.references() {
          check_reference(&graph, &components, node_id, field, instance_id, port)?;
          graph.add_edge(instance_id, node_id)?;
        }
      }
    }

    graph.check_acyclic()?;

    if let Some(orphan) = nodes
      .iter()
      .find(|id| !start_nodes.contains(id) && graph.upstream(id).is_empty())
    {
      return Err(WorkflowError::OrphanNode(orphan.clone()).into());
    }

    let terminal_nodes = graph
      .terminal_nodes()
      .into_iter()
      .filter(|id| id != VIRTUAL_INPUT_ID)
      .collect();

    debug!(
      plan = %name,
      nodes = nodes.len(),
      mappings = mappings.len(),
      synthesized = mappings.len() - explicit_mappings,
      expressions = expressions.len(),
      "plan_built"
    );

    Ok(Self {
      name,
      graph,
      components,
      start_nodes,
      mappings,
      explicit_mappings,
      expressions,
      params,
      terminal_nodes,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The union graph, including the virtual input node.
  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn components(&self) -> &ComponentRegistry {
    &self.components
  }

  pub fn start_nodes(&self) -> &[String] {
    &self.start_nodes
  }

  pub fn is_start(&self, node_id: &str) -> bool {
    self.start_nodes.iter().any(|s| s == node_id)
  }

  /// Effective mappings: explicit first, then synthesized.
  pub fn mappings(&self) -> &[PortMapping] {
    &self.mappings
  }

  pub fn synthesized_mappings(&self) -> &[PortMapping] {
    &self.mappings[self.explicit_mappings..]
  }

  pub fn expressions(&self) -> &[FieldExpression] {
    &self.expressions
  }

  /// Graph sinks, sorted. The run result is assembled from these.
  pub fn terminal_nodes(&self) -> &[String] {
    &self.terminal_nodes
  }

  pub fn mappings_into<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a PortMapping> {
    self.mappings.iter().filter(move |m| m.target_id == node_id)
  }

  pub fn expressions_into<'a>(
    &'a self,
    node_id: &'a str,
  ) -> impl Iterator<Item = &'a FieldExpression> {
    self.expressions.iter().filter(move |e| e.target_id == node_id)
  }

  pub fn params_of(&self, node_id: &str) -> &[(String, TemplateValue)] {
    self.params.get(node_id).map(Vec::as_slice).unwrap_or_default()
  }

  pub fn registration(&self, node_id: &str) -> Result<&Registration, RuntimeError> {
    self
      .components
      .get(node_id)
      .ok_or_else(|| WorkflowError::ComponentNotRegistered(node_id.to_string()).into())
  }
}

fn resolve_start_nodes(
  structural: &Graph,
  start_nodes: Vec<String>,
) -> Result<Vec<String>, RuntimeError> {
  if let Some(unknown) = start_nodes.iter().find(|id| !structural.contains(id)) {
    return Err(WorkflowError::NodeNotFound(unknown.clone()).into());
  }

  let start_nodes = if start_nodes.is_empty() {
    structural.entry_points()
  } else {
    start_nodes
  };

  if start_nodes.is_empty() {
    return Err(WorkflowError::NoEntryPoints.into());
  }
  Ok(start_nodes)
}

fn parse_params(
  structural: &Graph,
  params: HashMap<String, HashMap<String, ParamValue>>,
) -> Result<BTreeMap<String, NodeParams>, RuntimeError> {
  let mut parsed = BTreeMap::new();
  for (node_id, fields) in params {
    if !structural.contains(&node_id) {
      return Err(WorkflowError::NodeNotFound(node_id).into());
    }

    let mut node_params = Vec::with_capacity(fields.len());
    for (field, value) in fields {
      let template = TemplateValue::parse(&value).map_err(|source| RuntimeError::Template {
        node_id: node_id.clone(),
        field: field.clone(),
        source,
      })?;
      node_params.push((field, template));
    }
    node_params.sort_by(|a, b| a.0.cmp(&b.0));
    parsed.insert(node_id, node_params);
  }
  Ok(parsed)
}

fn validate_expression_target(
  graph: &Graph,
  components: &ComponentRegistry,
  field_expression: &FieldExpression,
) -> Result<(), RuntimeError> {
  let target_id = field_expression.target_id.as_str();
  let target = components
    .get(target_id)
    .filter(|_| graph.contains(target_id))
    .ok_or_else(|| RuntimeError::UnknownExpressionTarget {
      node: target_id.to_string(),
    })?;

  if !target.expression_target {
    return Err(RuntimeError::ExpressionTargetUnsupported {
      node: target.display_name().to_string(),
    });
  }

  if !target.accepts_input(&field_expression.target_field) {
    return Err(RuntimeError::UnknownExpressionField {
      node: target.display_name().to_string(),
      field: field_expression.target_field.clone(),
    });
  }
  Ok(())
}

/// A reference must name a plan node (or the virtual input) and, for a typed
/// component, one of its declared output ports.
fn check_reference(
  graph: &Graph,
  components: &ComponentRegistry,
  node_id: &str,
  field: &str,
  instance_id: &str,
  port: &str,
) -> Result<(), RuntimeError> {
  let known = instance_id == VIRTUAL_INPUT_ID
    || (graph.contains(instance_id)
      && components
        .get(instance_id)
        .is_some_and(|source| source.provides_output(port)));

  if known {
    return Ok(());
  }
  Err(RuntimeError::UnknownReference {
    node: components.display_name(node_id).to_string(),
    field: field.to_string(),
    instance_id: instance_id.to_string(),
    port: port.to_string(),
  })
}
