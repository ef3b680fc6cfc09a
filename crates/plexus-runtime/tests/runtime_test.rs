//! Integration tests for Runtime::run using in-memory components.

mod common;

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use common::*;
use plexus_coercion::TypeKey;
use plexus_component::{ComponentError, ComponentRegistry, Registration};
use plexus_config::{Expression, FieldExpression, PlanDef, PortMapping};
use plexus_runtime::{Runtime, RuntimeConfig, RuntimeError, TaskState};
use serde_json::json;

fn runtime(def: PlanDef, components: ComponentRegistry) -> Runtime {
  Runtime::new(def, components, RuntimeConfig::default()).expect("plan should build")
}

#[tokio::test]
async fn test_concatenation_expression_feeds_echo() {
  let def = PlanDef::new("scenario-a")
    .node("a")
    .node("b")
    .start("a")
    .expression(FieldExpression::new(
      "b",
      "input",
      Expression::concat([Expression::literal("x:"), Expression::reference("a", "output")]),
    ));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("va"))))
    .with(Registration::legacy("b", Echo));

  let result = runtime(def, components)
    .run(payload(json!({ "input": "seed" })))
    .await
    .unwrap();

  assert_eq!(result.output(), &json!("echo[x:va]"));
  assert_eq!(result.terminal_nodes, vec!["b"]);
}

#[tokio::test]
async fn test_literal_expression_overrides_mapping() {
  let def = PlanDef::new("scenario-b")
    .node("a")
    .node("b")
    .edge("a", "b")
    .mapping(PortMapping::direct("a", "output", "b", "input"))
    .expression(FieldExpression::new("b", "input", Expression::literal("OVR")));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("va"))))
    .with(Registration::legacy("b", Echo));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!("echo[OVR]"));
}

#[tokio::test]
async fn test_fan_in_with_mapping_and_expression() {
  let def = PlanDef::new("scenario-c")
    .node("a")
    .node("c")
    .node("dual")
    .edge("a", "dual")
    .edge("c", "dual")
    .mapping(PortMapping::direct("a", "output", "dual", "a"))
    .expression(FieldExpression::new("dual", "b", Expression::literal("X")));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("AA"))))
    .with(Registration::legacy("c", Constant(json!("CC"))))
    .with(Registration::legacy("dual", DualConcat));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!("a[AA]|b[X]"));
  assert_eq!(result.port("c", "output"), Some(&json!("CC")));
}

fn dict_plan(source: serde_json::Value, key: &str) -> (PlanDef, ComponentRegistry) {
  let def = PlanDef::new("scenario-d")
    .node("dict")
    .node("echo")
    .start("dict")
    .expression(FieldExpression::new(
      "echo",
      "input",
      Expression::reference_key("dict", "output", key),
    ));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("dict", Constant(source)))
    .with(Registration::legacy("echo", Echo));
  (def, components)
}

#[tokio::test]
async fn test_key_extraction_from_dict_output() {
  let (def, components) = dict_plan(json!({ "messages": "hello", "data": 42 }), "messages");
  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();
  assert_eq!(result.output(), &json!("echo[hello]"));
}

#[tokio::test]
async fn test_key_extraction_with_structural_edge() {
  let (def, components) = dict_plan(json!({ "messages": "hello", "data": 42 }), "messages");
  let def = def.edge("dict", "echo");

  let mut runtime = runtime(def, components);
  assert!(runtime.plan().synthesized_mappings().is_empty());

  let result = runtime.run(payload(json!({}))).await.unwrap();
  assert_eq!(result.output(), &json!("echo[hello]"));
}

#[tokio::test]
async fn test_key_extraction_missing_key() {
  let (def, components) = dict_plan(json!({ "messages": "hello", "data": 42 }), "nope");
  let err = runtime(def, components)
    .run(payload(json!({})))
    .await
    .unwrap_err();

  assert!(matches!(err, RuntimeError::InputResolution { ref node_id, .. } if node_id == "echo"));
  assert!(err.to_string().contains("not found in dict"));
}

#[tokio::test]
async fn test_key_extraction_from_non_dict() {
  let (def, components) = dict_plan(json!("just text"), "messages");
  let err = runtime(def, components)
    .run(payload(json!({})))
    .await
    .unwrap_err();

  assert!(err.to_string().contains("not a dict"));
}

#[tokio::test]
async fn test_implicit_mappings_match_explicit() {
  let chain = || {
    PlanDef::new("chain")
      .node("a")
      .node("b")
      .node("c")
      .edge("a", "b")
      .edge("b", "c")
  };
  let components = || {
    ComponentRegistry::new()
      .with(Registration::legacy("a", Constant(json!("va"))))
      .with(Registration::legacy("b", Echo))
      .with(Registration::legacy("c", Echo))
  };

  let implicit = runtime(chain(), components())
    .run(payload(json!({})))
    .await
    .unwrap();
  let explicit = runtime(
    chain()
      .mapping(PortMapping::direct("a", "output", "b", "input"))
      .mapping(PortMapping::direct("b", "output", "c", "input")),
    components(),
  )
  .run(payload(json!({})))
  .await
  .unwrap();

  assert_eq!(implicit.output(), &json!("echo[echo[va]]"));
  assert_eq!(implicit.output(), explicit.output());
  assert_eq!(implicit.outputs, explicit.outputs);
}

#[tokio::test]
async fn test_pure_reference_yields_to_mapping() {
  let def = PlanDef::new("precedence")
    .node("a")
    .node("other")
    .node("b")
    .edge("a", "b")
    .edge("other", "b")
    .mapping(PortMapping::direct("a", "output", "b", "input"))
    .expression(FieldExpression::new(
      "b",
      "input",
      Expression::reference("other", "output"),
    ));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("from-mapping"))))
    .with(Registration::legacy("other", Constant(json!("from-expression"))))
    .with(Registration::legacy("b", Echo));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!("echo[from-mapping]"));
}

#[tokio::test]
async fn test_computed_reference_overrides_mapping() {
  let def = PlanDef::new("precedence")
    .node("a")
    .node("other")
    .node("b")
    .edge("a", "b")
    .edge("other", "b")
    .mapping(PortMapping::direct("a", "output", "b", "input"))
    .expression(FieldExpression::new(
      "b",
      "input",
      Expression::concat([Expression::reference("other", "output")]),
    ));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("from-mapping"))))
    .with(Registration::legacy("other", Constant(json!("from-expression"))))
    .with(Registration::legacy("b", Echo));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!("echo[from-expression]"));
}

#[tokio::test]
async fn test_bare_reference_keeps_structure() {
  let def = PlanDef::new("structure")
    .node("src")
    .node("sink")
    .start("src")
    .expression(FieldExpression::new(
      "sink",
      "data",
      Expression::reference("src", "output"),
    ))
    .expression(FieldExpression::new(
      "sink",
      "text",
      Expression::concat([Expression::reference("src", "output")]),
    ));
  let components = ComponentRegistry::new()
    .with(Registration::legacy("src", Constant(json!({ "ids": [1, 2] }))))
    .with(Registration::legacy("sink", Inspect));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.port("sink", "data"), Some(&json!({ "ids": [1, 2] })));
  assert_eq!(result.port("sink", "text"), Some(&json!(r#"{"ids":[1,2]}"#)));
}

#[tokio::test]
async fn test_start_node_passthrough() {
  let def = PlanDef::new("passthrough")
    .node("legacy")
    .node("typed");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("legacy", Inspect))
    .with(Registration::typed(
      "typed",
      Inspect,
      [("query", TypeKey::String), ("limit", TypeKey::Integer)],
      [],
    ));

  let result = runtime(def, components)
    .run(payload(json!({ "query": "rust", "limit": "5", "extra": true })))
    .await
    .unwrap();

  assert_eq!(
    result.port("legacy", "output"),
    Some(&json!({ "query": "rust", "limit": "5", "extra": true }))
  );
  assert_eq!(
    result.port("typed", "output"),
    Some(&json!({ "query": "rust", "limit": 5 }))
  );
}

#[tokio::test]
async fn test_chat_payload_remapped_onto_canonical_input() {
  let def = PlanDef::new("chat").node("chat");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("chat", Inspect).with_ports("prompt", "reply"));

  let result = runtime(def, components)
    .run(payload(json!({ "message": "hi there" })))
    .await
    .unwrap();

  assert_eq!(
    result.output(),
    &json!({ "message": "hi there", "prompt": "hi there" })
  );
}

#[tokio::test]
async fn test_no_passthrough_when_expressions_present() {
  let def = PlanDef::new("no-passthrough")
    .node("a")
    .expression(FieldExpression::new("a", "fixed", Expression::literal(1)));
  let components = ComponentRegistry::new().with(Registration::legacy("a", Inspect));

  let result = runtime(def, components)
    .run(payload(json!({ "input": "ignored" })))
    .await
    .unwrap();

  assert_eq!(result.output(), &json!({ "fixed": 1 }));
}

#[tokio::test]
async fn test_params_resolve_templates() {
  let def = PlanDef::new("params")
    .node("fetch")
    .node("prompt")
    .edge("fetch", "prompt")
    .param("prompt", "template", "found {{@fetch.count}} items")
    .param("prompt", "raw", "{{@fetch.output}}")
    .param("prompt", "limit", 10);
  let components = ComponentRegistry::new()
    .with(Registration::legacy("fetch", Constant(json!({ "count": 2 }))))
    .with(Registration::legacy("prompt", Inspect));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(
    result.output(),
    &json!({
      "input": { "count": 2 },
      "template": "found 2 items",
      "raw": { "count": 2 },
      "limit": 10
    })
  );
}

#[tokio::test]
async fn test_params_win_over_mappings() {
  let def = PlanDef::new("params")
    .node("a")
    .node("b")
    .edge("a", "b")
    .param("b", "input", "static");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("va"))))
    .with(Registration::legacy("b", Echo));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!("echo[static]"));
}

#[tokio::test]
async fn test_typed_inputs_are_coerced() {
  let def = PlanDef::new("typed")
    .node("n")
    .param("n", "count", "3")
    .param("n", "ratio", 1);
  let components = ComponentRegistry::new().with(Registration::typed(
    "n",
    Inspect,
    [("count", TypeKey::Integer), ("ratio", TypeKey::Number)],
    [],
  ));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!({ "count": 3, "ratio": 1.0 }));
}

#[tokio::test]
async fn test_typed_input_coercion_failure() {
  let def = PlanDef::new("typed").node("n").param("n", "count", "many");
  let components = ComponentRegistry::new().with(Registration::typed(
    "n",
    Inspect,
    [("count", TypeKey::Integer)],
    [],
  ));

  let err = runtime(def, components)
    .run(payload(json!({})))
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    RuntimeError::InputCoercion { ref node_id, ref field, .. } if node_id == "n" && field == "count"
  ));
}

#[tokio::test]
async fn test_context_visible_to_later_nodes() {
  let def = PlanDef::new("context")
    .node("writer")
    .node("reader")
    .edge("writer", "reader");
  let components = ComponentRegistry::new()
    .with(Registration::legacy(
      "writer",
      ContextWriter {
        key: "user",
        value: "ada",
      },
    ))
    .with(Registration::legacy("reader", ContextReader));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.output(), &json!({ "user": "ada" }));
  assert_eq!(result.context.get("user"), Some(&json!("ada")));
}

#[tokio::test]
async fn test_siblings_see_batch_start_context() {
  let def = PlanDef::new("context")
    .node("writer")
    .node("reader");
  let components = ComponentRegistry::new()
    .with(Registration::legacy(
      "writer",
      ContextWriter {
        key: "user",
        value: "ada",
      },
    ))
    .with(Registration::legacy("reader", ContextReader));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.port("reader", "output"), Some(&json!({})));
  assert_eq!(result.context.get("user"), Some(&json!("ada")));
}

#[tokio::test]
async fn test_multiple_terminals() {
  let def = PlanDef::new("fan-out")
    .node("a")
    .node("left")
    .node("right")
    .edge("a", "left")
    .edge("a", "right");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("va"))))
    .with(Registration::legacy("left", Echo))
    .with(Registration::legacy("right", Echo));

  let result = runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(result.terminal_nodes, vec!["left", "right"]);
  assert_eq!(
    result.output(),
    &json!({ "left": "echo[va]", "right": "echo[va]" })
  );
}

#[tokio::test]
async fn test_component_error_propagates() {
  let def = PlanDef::new("failing")
    .node("a")
    .node("b")
    .edge("a", "b");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Failing))
    .with(Registration::legacy("b", Echo));
  let mut runtime = runtime(def, components);

  let err = runtime.run(payload(json!({}))).await.unwrap_err();

  assert!(matches!(err, RuntimeError::Component { ref node_id, .. } if node_id == "a"));
  let source = err.source().and_then(|s| s.downcast_ref::<ComponentError>());
  assert!(matches!(source, Some(ComponentError::Failed { .. })));
  assert_eq!(runtime.tasks().state("b"), Some(TaskState::NotReady));
}

#[tokio::test]
async fn test_reset_and_rerun() {
  let def = PlanDef::new("rerun").node("a").node("b").edge("a", "b");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("a", Constant(json!("va"))))
    .with(Registration::legacy("b", Echo));
  let mut runtime = runtime(def, components);

  let first = runtime.run(payload(json!({}))).await.unwrap();
  assert_eq!(runtime.tasks().state("b"), Some(TaskState::Completed));
  assert!(runtime.tasks().unfinished().is_empty());

  runtime.reset();
  assert!(runtime.tasks().is_empty());

  let second = runtime.run(payload(json!({}))).await.unwrap();
  assert_eq!(first.output(), second.output());
  assert_ne!(first.execution_id, second.execution_id);
}

#[tokio::test]
async fn test_ready_siblings_run_concurrently() {
  let active = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  let def = PlanDef::new("parallel").node("g1").node("g2").node("g3");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("g1", Gate::new(&active, &peak)))
    .with(Registration::legacy("g2", Gate::new(&active, &peak)))
    .with(Registration::legacy("g3", Gate::new(&active, &peak)));

  runtime(def, components).run(payload(json!({}))).await.unwrap();

  assert_eq!(peak.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_max_concurrency_bounds_batch() {
  let active = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));
  let def = PlanDef::new("serial").node("g1").node("g2").node("g3");
  let components = ComponentRegistry::new()
    .with(Registration::legacy("g1", Gate::new(&active, &peak)))
    .with(Registration::legacy("g2", Gate::new(&active, &peak)))
    .with(Registration::legacy("g3", Gate::new(&active, &peak)));
  let config = RuntimeConfig {
    max_concurrency: 1,
    ..RuntimeConfig::default()
  };

  Runtime::new(def, components, config)
    .unwrap()
    .run(payload(json!({})))
    .await
    .unwrap();

  assert_eq!(peak.load(std::sync::atomic::Ordering::SeqCst), 1);
}
