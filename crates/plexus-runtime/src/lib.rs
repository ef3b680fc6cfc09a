//! Plexus Runtime
//!
//! This crate turns a [`PlanDef`](plexus_config::PlanDef) plus a component
//! registry into a validated [`Plan`] and executes it.
//!
//! - [`Plan::build`] runs every construction-time check: structure, mapping
//!   synthesis and type validation, expression and template references, and
//!   a single cycle check over the merged graph
//! - [`Runtime::run`] drives the task table, gathering each ready node's
//!   input and running ready siblings concurrently
//! - [`RunResult`] carries every node's outputs, the terminal output, and
//!   the final run context

mod config;
mod error;
mod input;
mod output;
mod plan;
mod result;
mod runtime;
mod task;

pub use config::{DEFAULT_MAX_CONCURRENCY, RuntimeConfig};
pub use error::RuntimeError;
pub use input::gather_input;
pub use output::normalize_output;
pub use plan::{NodeParams, Plan};
pub use result::RunResult;
pub use runtime::Runtime;
pub use task::{Task, TaskState, TaskStateError, TaskTable};
