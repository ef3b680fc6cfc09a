//! Graph scheduler.
//!
//! The [`Runtime`] owns a validated [`Plan`] and the task table for its
//! current run. Each loop iteration takes every ready node, gathers inputs,
//! runs the components concurrently, and then applies the results in batch
//! order: outputs stored, context additions merged, successors released.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use plexus_coercion::CoercionRegistry;
use plexus_component::{
  Component, ComponentError, ComponentInput, ComponentOutput, ComponentRegistry, RunContext,
};
use plexus_config::{PlanDef, VIRTUAL_INPUT_ID};
use plexus_resolver::Outputs;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::input::gather_input;
use crate::output::normalize_output;
use crate::plan::Plan;
use crate::result::RunResult;
use crate::task::TaskTable;

/// The plan runtime.
///
/// `run` takes `&mut self`; concurrent runs of one plan need separate
/// runtimes.
#[derive(Debug)]
pub struct Runtime {
  plan: Plan,
  coercion: CoercionRegistry,
  config: RuntimeConfig,
  tasks: TaskTable,
}

impl Runtime {
  /// Validate `def` against `components` using the built-in coercion rules.
  pub fn new(
    def: PlanDef,
    components: ComponentRegistry,
    config: RuntimeConfig,
  ) -> Result<Self, RuntimeError> {
    Self::with_coercion(def, components, CoercionRegistry::new(), config)
  }

  pub fn with_coercion(
    def: PlanDef,
    components: ComponentRegistry,
    coercion: CoercionRegistry,
    config: RuntimeConfig,
  ) -> Result<Self, RuntimeError> {
    let plan = Plan::build(def, components, &coercion, &config.coercion_policy)?;
    Ok(Self {
      plan,
      coercion,
      config,
      tasks: TaskTable::default(),
    })
  }

  pub fn plan(&self) -> &Plan {
    &self.plan
  }

  /// Task states left by the most recent run.
  pub fn tasks(&self) -> &TaskTable {
    &self.tasks
  }

  /// Clear task state. The validated plan is kept.
  pub fn reset(&mut self) {
    self.tasks.clear();
  }

  /// Execute the plan with the given initial payload.
  #[instrument(
    name = "runtime_run",
    skip(self, payload),
    fields(
      plan = %self.plan.name(),
    )
  )]
  pub async fn run(&mut self, payload: Map<String, Value>) -> Result<RunResult, RuntimeError> {
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(execution_id = %execution_id, "run_started");
    debug!(
      execution_id = %execution_id,
      payload = %serde_json::Value::Object(payload.clone()),
      "run_payload"
    );

    let result = self.execute(&execution_id, payload).await;

    match &result {
      Ok(run) => {
        info!(execution_id = %execution_id, "run_completed");
        debug!(execution_id = %execution_id, output = %run.output(), "run_output");
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "run_failed");
      }
    }

    result
  }

  async fn execute(
    &mut self,
    execution_id: &str,
    payload: Map<String, Value>,
  ) -> Result<RunResult, RuntimeError> {
    let plan = &self.plan;
    let coercion = &self.coercion;
    let tasks = &mut self.tasks;
    *tasks = TaskTable::new(plan.graph());

    let mut outputs = Outputs::new();
    outputs.insert(VIRTUAL_INPUT_ID.to_string(), payload);
    let mut context = RunContext::new();
    complete(plan, tasks, VIRTUAL_INPUT_ID)?;

    loop {
      let ready = tasks.ready();
      if ready.is_empty() {
        break;
      }

      debug!(execution_id = %execution_id, ready_nodes = ?ready, "batch_started");

      let mut invocations = Vec::with_capacity(ready.len());
      for node_id in ready {
        let component = plan.registration(&node_id)?.component.clone();
        let fields = gather_input(plan, &node_id, &outputs, coercion)?;
        let input = ComponentInput {
          execution_id: execution_id.to_string(),
          node_id: node_id.clone(),
          fields,
          context: context.clone(),
        };
        invocations.push((node_id, component, input));
      }

      let results: Vec<_> = stream::iter(invocations)
        .map(|(node_id, component, input)| invoke(node_id, component, input))
        .buffered(self.config.concurrency())
        .collect()
        .await;

      for (node_id, result) in results {
        let output = result.map_err(|source| RuntimeError::Component {
          node_id: node_id.clone(),
          source,
        })?;
        let registration = plan.registration(&node_id)?;
        let ports = normalize_output(registration, &node_id, output.data, coercion)?;
        context.merge(output.context);
        outputs.insert(node_id.clone(), ports);
        complete(plan, tasks, &node_id)?;
      }
    }

    let pending = tasks.unfinished();
    if !pending.is_empty() {
      return Err(RuntimeError::Stalled { pending });
    }

    outputs.remove(VIRTUAL_INPUT_ID);
    let terminals = plan
      .terminal_nodes()
      .iter()
      .map(|node_id| {
        let port = plan.registration(node_id)?.ports.output.clone();
        Ok((node_id.clone(), port))
      })
      .collect::<Result<Vec<_>, RuntimeError>>()?;

    Ok(RunResult::new(
      execution_id.to_string(),
      outputs,
      terminals,
      context,
    ))
  }
}

/// Mark `node_id` completed and release its successors.
fn complete(plan: &Plan, tasks: &mut TaskTable, node_id: &str) -> Result<(), RuntimeError> {
  tasks.complete(node_id)?;
  for successor in plan.graph().downstream(node_id) {
    tasks.decrement(successor)?;
  }
  Ok(())
}

async fn invoke(
  node_id: String,
  component: Arc<dyn Component>,
  input: ComponentInput,
) -> (String, Result<ComponentOutput, ComponentError>) {
  info!(execution_id = %input.execution_id, node_id = %node_id, "task_started");
  debug!(
    node_id = %node_id,
    input = %serde_json::Value::Object(input.fields.clone()),
    "task_input"
  );

  let result = component.run(input).await;

  match &result {
    Ok(output) => {
      info!(node_id = %node_id, "task_completed");
      debug!(node_id = %node_id, output = %output.data, "task_output");
    }
    Err(e) => {
      error!(node_id = %node_id, error = %e, "task_failed");
    }
  }

  (node_id, result)
}
