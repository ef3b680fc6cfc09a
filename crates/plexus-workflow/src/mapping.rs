//! Port mapping synthesis and validation.
//!
//! Explicit mappings always win. For a node with exactly one real
//! predecessor and no mapping targeting it, a direct mapping from the
//! predecessor's canonical output to the node's canonical input is
//! synthesized, unless an expression already fills that input. Nodes fed only by the virtual input are left alone (their
//! input is a passthrough of the run payload). Anything more ambiguous is
//! rejected rather than guessed.

use std::collections::HashSet;

use plexus_coercion::{CoercionPolicy, CoercionRegistry, Severity, Tier, TypeKey};
use plexus_component::{ComponentRegistry, Registration};
use plexus_config::{MappingStrategy, PortMapping};
use tracing::{debug, warn};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// Create implicit direct mappings for unambiguous single-predecessor nodes.
///
/// Returns only the synthesized mappings. `selected` holds nodes whose inputs
/// are chosen explicitly; `expression_fields` holds the `(node, field)` pairs
/// that field expressions fill. Fails with [`WorkflowError::AmbiguousFanIn`]
/// when a node has two or more real predecessors and is not selected.
pub fn synthesize_default_mappings(
  graph: &Graph,
  components: &ComponentRegistry,
  virtual_input_id: &str,
  existing: &[PortMapping],
  selected: &HashSet<&str>,
  expression_fields: &HashSet<(&str, &str)>,
) -> Result<Vec<PortMapping>, WorkflowError> {
  let mapped: HashSet<&str> = existing.iter().map(|m| m.target_id.as_str()).collect();
  let mut synthesized = Vec::new();

  for node_id in graph.nodes() {
    if node_id == virtual_input_id || mapped.contains(node_id) {
      continue;
    }

    let predecessors: Vec<&String> = graph
      .upstream(node_id)
      .iter()
      .filter(|id| *id != virtual_input_id)
      .collect();

    match predecessors.as_slice() {
      [] => {}
      [predecessor] => {
        let source = registration(components, predecessor)?;
        let target = registration(components, node_id)?;
        if expression_fields.contains(&(node_id, target.ports.input.as_str())) {
          debug!(
            target_id = %node_id,
            target_port = %target.ports.input,
            "default mapping skipped for expression field"
          );
          continue;
        }
        let mapping = PortMapping::direct(
          predecessor.as_str(),
          source.ports.output.as_str(),
          node_id,
          target.ports.input.as_str(),
        );
        debug!(
          source_id = %mapping.source_id,
          source_port = %mapping.source_port,
          target_id = %mapping.target_id,
          target_port = %mapping.target_port,
          "synthesized default mapping"
        );
        synthesized.push(mapping);
      }
      _ if selected.contains(node_id) => {}
      _ => {
        return Err(WorkflowError::AmbiguousFanIn {
          node: node_id.to_string(),
          predecessors: predecessors.iter().map(|id| id.to_string()).collect(),
        });
      }
    }
  }

  Ok(synthesized)
}

/// Validate mappings against registered components and declared types.
///
/// Legacy endpoints (and the virtual input) are treated as `string`.
/// Incompatible pairs are handled by `policy` according to the endpoints'
/// tiers.
pub fn validate_port_mappings(
  mappings: &[PortMapping],
  components: &ComponentRegistry,
  virtual_input_id: &str,
  coercion: &CoercionRegistry,
  policy: &CoercionPolicy,
) -> Result<(), WorkflowError> {
  for mapping in mappings {
    let source_name = components.display_name(&mapping.source_id);
    let target_name = components.display_name(&mapping.target_id);

    if mapping.strategy != MappingStrategy::Direct {
      return Err(WorkflowError::UnsupportedStrategy {
        source_node: source_name.to_string(),
        target_node: target_name.to_string(),
        strategy: mapping.strategy,
      });
    }

    let (source_tier, source_type) = if mapping.source_id == virtual_input_id {
      (Tier::Legacy, TypeKey::String)
    } else {
      let source = registration(components, &mapping.source_id)?;
      let declared = declared_type(
        source,
        &mapping.source_port,
        "output",
        Registration::output_type,
      )?;
      (source.tier(), declared)
    };

    let target = registration(components, &mapping.target_id)?;
    let target_type = declared_type(
      target,
      &mapping.target_port,
      "input",
      Registration::input_type,
    )?;

    if coercion.can_coerce(source_type, target_type) {
      continue;
    }

    match policy.severity(source_tier, target.tier()) {
      Severity::Error => {
        return Err(WorkflowError::IncompatibleMapping {
          source_node: source_name.to_string(),
          source_port: mapping.source_port.clone(),
          source_type,
          target_node: target_name.to_string(),
          target_port: mapping.target_port.clone(),
          target_type,
        });
      }
      Severity::Warn => {
        warn!(
          source = %source_name,
          source_port = %mapping.source_port,
          source_type = %source_type,
          target = %target_name,
          target_port = %mapping.target_port,
          target_type = %target_type,
          "mapping types may not coerce; deferring to run time"
        );
      }
      Severity::Ignore => {}
    }
  }

  Ok(())
}

fn registration<'a>(
  components: &'a ComponentRegistry,
  node_id: &str,
) -> Result<&'a Registration, WorkflowError> {
  components
    .get(node_id)
    .ok_or_else(|| WorkflowError::ComponentNotRegistered(node_id.to_string()))
}

/// Declared type of a port; legacy components fall back to `string`.
fn declared_type(
  registration: &Registration,
  port: &str,
  direction: &'static str,
  lookup: fn(&Registration, &str) -> Option<TypeKey>,
) -> Result<TypeKey, WorkflowError> {
  match registration.tier() {
    Tier::Legacy => Ok(TypeKey::String),
    Tier::Typed => lookup(registration, port).ok_or_else(|| WorkflowError::UnknownPort {
      node: registration.display_name().to_string(),
      port: port.to_string(),
      direction,
    }),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;
  use plexus_component::{Component, ComponentError, ComponentInput, ComponentOutput};

  const VIRTUAL: &str = "__input__";

  struct Noop;

  #[async_trait]
  impl Component for Noop {
    async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
      Ok(ComponentOutput::default())
    }
  }

  fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
    let mut graph = Graph::default();
    graph.add_node(VIRTUAL);
    for node in nodes {
      graph.add_node(*node);
    }
    for (from, to) in edges {
      graph.add_edge(from, to).unwrap();
    }
    graph
  }

  fn legacy(ids: &[&str]) -> ComponentRegistry {
    ids.iter().fold(ComponentRegistry::new(), |registry, id| {
      registry.with(Registration::legacy(*id, Noop))
    })
  }

  fn defaults(
    graph: &Graph,
    components: &ComponentRegistry,
    existing: &[PortMapping],
  ) -> Result<Vec<PortMapping>, WorkflowError> {
    synthesize_default_mappings(
      graph,
      components,
      VIRTUAL,
      existing,
      &HashSet::new(),
      &HashSet::new(),
    )
  }

  #[test]
  fn test_synthesizes_single_predecessor() {
    let graph = graph(&["a", "b"], &[(VIRTUAL, "a"), ("a", "b")]);
    let components = legacy(&["a", "b"]);

    let mappings = defaults(&graph, &components, &[]).unwrap();

    assert_eq!(mappings, vec![PortMapping::direct("a", "output", "b", "input")]);
  }

  #[test]
  fn test_uses_canonical_ports() {
    let graph = graph(&["a", "b"], &[(VIRTUAL, "a"), ("a", "b")]);
    let components = ComponentRegistry::new()
      .with(Registration::legacy("a", Noop).with_ports("query", "text"))
      .with(Registration::legacy("b", Noop).with_ports("prompt", "reply"));

    let mappings = defaults(&graph, &components, &[]).unwrap();

    assert_eq!(mappings, vec![PortMapping::direct("a", "text", "b", "prompt")]);
  }

  #[test]
  fn test_existing_mapping_suppresses_synthesis() {
    let graph = graph(&["a", "b"], &[(VIRTUAL, "a"), ("a", "b")]);
    let components = legacy(&["a", "b"]);
    let existing = [PortMapping::direct("a", "output", "b", "context")];

    let mappings = defaults(&graph, &components, &existing).unwrap();

    assert!(mappings.is_empty());
  }

  #[test]
  fn test_expression_field_suppresses_synthesis() {
    let graph = graph(&["a", "b"], &[(VIRTUAL, "a"), ("a", "b")]);
    let components = legacy(&["a", "b"]);

    let filled = HashSet::from([("b", "input")]);
    let mappings =
      synthesize_default_mappings(&graph, &components, VIRTUAL, &[], &HashSet::new(), &filled)
        .unwrap();
    assert!(mappings.is_empty());

    // An expression on another field leaves the canonical input to the default.
    let other = HashSet::from([("b", "context")]);
    let mappings =
      synthesize_default_mappings(&graph, &components, VIRTUAL, &[], &HashSet::new(), &other)
        .unwrap();
    assert_eq!(mappings, vec![PortMapping::direct("a", "output", "b", "input")]);
  }

  #[test]
  fn test_virtual_only_predecessor_is_passthrough() {
    let graph = graph(&["a"], &[(VIRTUAL, "a")]);
    let components = legacy(&["a"]);

    let mappings = defaults(&graph, &components, &[]).unwrap();

    assert!(mappings.is_empty());
  }

  #[test]
  fn test_fan_in_without_mapping_fails() {
    let graph = graph(
      &["a", "c", "join"],
      &[(VIRTUAL, "a"), (VIRTUAL, "c"), ("a", "join"), ("c", "join")],
    );
    let components = legacy(&["a", "c", "join"]);

    let err = defaults(&graph, &components, &[]).unwrap_err();

    assert_eq!(
      err,
      WorkflowError::AmbiguousFanIn {
        node: "join".to_string(),
        predecessors: vec!["a".to_string(), "c".to_string()],
      }
    );
  }

  #[test]
  fn test_fan_in_with_expression_is_accepted() {
    let graph = graph(
      &["a", "c", "join"],
      &[(VIRTUAL, "a"), (VIRTUAL, "c"), ("a", "join"), ("c", "join")],
    );
    let components = legacy(&["a", "c", "join"]);
    let targets = HashSet::from(["join"]);

    let mappings =
      synthesize_default_mappings(&graph, &components, VIRTUAL, &[], &targets, &HashSet::new())
        .unwrap();

    assert!(mappings.is_empty());
  }

  #[test]
  fn test_typed_incompatible_mapping_fails() {
    let components = ComponentRegistry::new()
      .with(
        Registration::typed("counter", Noop, [], [("count", TypeKey::Integer)])
          .with_display_name("Counter"),
      )
      .with(
        Registration::typed("chat", Noop, [("history", TypeKey::MessageList)], [])
          .with_display_name("Chat"),
      );
    let mappings = [PortMapping::direct("counter", "count", "chat", "history")];

    let err = validate_port_mappings(
      &mappings,
      &components,
      VIRTUAL,
      &CoercionRegistry::new(),
      &CoercionPolicy::default(),
    )
    .unwrap_err();

    assert_eq!(
      err.to_string(),
      "cannot map 'Counter.count' (integer) to 'Chat.history' (message_list)"
    );
  }

  #[test]
  fn test_legacy_endpoint_only_warns() {
    let components = ComponentRegistry::new()
      .with(Registration::legacy("old", Noop))
      .with(Registration::typed("chat", Noop, [("history", TypeKey::MessageList)], []));
    let mappings = [PortMapping::direct("old", "output", "chat", "history")];
    // No string -> message_list rule, so the pair cannot coerce.
    let coercion = CoercionRegistry::empty();

    validate_port_mappings(
      &mappings,
      &components,
      VIRTUAL,
      &coercion,
      &CoercionPolicy::default(),
    )
    .unwrap();

    let err = validate_port_mappings(
      &mappings,
      &components,
      VIRTUAL,
      &coercion,
      &CoercionPolicy::strict(),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::IncompatibleMapping { .. }));
  }

  #[test]
  fn test_unknown_typed_port() {
    let components = ComponentRegistry::new()
      .with(Registration::typed("a", Noop, [], [("text", TypeKey::String)]))
      .with(Registration::legacy("b", Noop));
    let mappings = [PortMapping::direct("a", "output", "b", "input")];

    let err = validate_port_mappings(
      &mappings,
      &components,
      VIRTUAL,
      &CoercionRegistry::new(),
      &CoercionPolicy::default(),
    )
    .unwrap_err();

    assert_eq!(
      err,
      WorkflowError::UnknownPort {
        node: "a".to_string(),
        port: "output".to_string(),
        direction: "output",
      }
    );
  }

  #[test]
  fn test_function_call_strategy_rejected() {
    let components = legacy(&["a", "b"]);
    let mut mapping = PortMapping::direct("a", "output", "b", "input");
    mapping.strategy = MappingStrategy::FunctionCall;

    let err = validate_port_mappings(
      &[mapping],
      &components,
      VIRTUAL,
      &CoercionRegistry::new(),
      &CoercionPolicy::default(),
    )
    .unwrap_err();

    assert!(matches!(err, WorkflowError::UnsupportedStrategy { .. }));
  }

  #[test]
  fn test_virtual_input_source_is_accepted() {
    let components = ComponentRegistry::new()
      .with(Registration::typed("n", Noop, [("count", TypeKey::Integer)], []));
    let mappings = [PortMapping::direct(VIRTUAL, "count", "n", "count")];

    validate_port_mappings(
      &mappings,
      &components,
      VIRTUAL,
      &CoercionRegistry::new(),
      &CoercionPolicy::default(),
    )
    .unwrap();
  }
}
