//! Per-run task table.
//!
//! Every node moves `not_ready -> ready -> completed` and never back. A
//! transition out of order is a scheduler bug and fails immediately.

use std::collections::BTreeMap;
use std::fmt;

use plexus_workflow::Graph;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
  NotReady,
  Ready,
  Completed,
}

impl fmt::Display for TaskState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::NotReady => "not_ready",
      Self::Ready => "ready",
      Self::Completed => "completed",
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskStateError {
  #[error("no task for node '{0}'")]
  UnknownTask(String),

  #[error("cannot decrement dependencies of '{node_id}' in state {state}")]
  NotWaiting { node_id: String, state: TaskState },

  #[error("cannot complete '{node_id}' in state {state}")]
  NotReady { node_id: String, state: TaskState },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Task {
  pub pending_deps: usize,
  pub state: TaskState,
}

/// Task state for every node of one plan, sorted by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskTable {
  tasks: BTreeMap<String, Task>,
}

impl TaskTable {
  /// One task per graph node, waiting on its in-degree. Nodes without
  /// dependencies start ready.
  pub fn new(graph: &Graph) -> Self {
    let tasks = graph
      .nodes()
      .map(|node_id| {
        let pending_deps = graph.in_degree(node_id);
        let state = if pending_deps == 0 {
          TaskState::Ready
        } else {
          TaskState::NotReady
        };
        (
          node_id.to_string(),
          Task {
            pending_deps,
            state,
          },
        )
      })
      .collect();
    Self { tasks }
  }

  pub fn get(&self, node_id: &str) -> Option<&Task> {
    self.tasks.get(node_id)
  }

  pub fn state(&self, node_id: &str) -> Option<TaskState> {
    self.get(node_id).map(|task| task.state)
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  /// Ready node ids, sorted.
  pub fn ready(&self) -> Vec<String> {
    self.ids_where(|task| task.state == TaskState::Ready)
  }

  /// Node ids that have not completed, sorted.
  pub fn unfinished(&self) -> Vec<String> {
    self.ids_where(|task| task.state != TaskState::Completed)
  }

  /// Record that one dependency of `node_id` completed. Returns `true` when
  /// the node became ready.
  pub fn decrement(&mut self, node_id: &str) -> Result<bool, TaskStateError> {
    let task = self.task_mut(node_id)?;
    if task.state != TaskState::NotReady || task.pending_deps == 0 {
      return Err(TaskStateError::NotWaiting {
        node_id: node_id.to_string(),
        state: task.state,
      });
    }

    task.pending_deps -= 1;
    if task.pending_deps == 0 {
      task.state = TaskState::Ready;
      return Ok(true);
    }
    Ok(false)
  }

  pub fn complete(&mut self, node_id: &str) -> Result<(), TaskStateError> {
    let task = self.task_mut(node_id)?;
    if task.state != TaskState::Ready {
      return Err(TaskStateError::NotReady {
        node_id: node_id.to_string(),
        state: task.state,
      });
    }
    task.state = TaskState::Completed;
    Ok(())
  }

  pub fn clear(&mut self) {
    self.tasks.clear();
  }

  fn task_mut(&mut self, node_id: &str) -> Result<&mut Task, TaskStateError> {
    self
      .tasks
      .get_mut(node_id)
      .ok_or_else(|| TaskStateError::UnknownTask(node_id.to_string()))
  }

  fn ids_where(&self, predicate: impl Fn(&Task) -> bool) -> Vec<String> {
    self
      .tasks
      .iter()
      .filter(|(_, task)| predicate(task))
      .map(|(id, _)| id.clone())
      .collect()
  }
}
