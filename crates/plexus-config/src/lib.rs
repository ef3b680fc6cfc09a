//! Plexus Config
//!
//! This crate contains the serializable plan definition types for Plexus.
//! These types describe a graph of components before it is validated and
//! turned into an executable plan by the runtime.
//!
//! Definitions can be loaded from:
//! - JSON files (via the CLI)
//! - Any other serde-compatible source chosen by the embedding application
//!
//! The runtime takes these definition types, validates them against the
//! registered components' schemas, and locks them into a plan for execution.

mod expression;
mod input;
mod mapping;
mod plan;

pub use expression::{Expression, FieldExpression};
pub use input::ParamValue;
pub use mapping::{MappingStrategy, PortMapping};
pub use plan::PlanDef;

/// Node id of the synthetic node that carries a run's initial payload.
pub const VIRTUAL_INPUT_ID: &str = "__input__";

/// Default canonical input port name.
pub const DEFAULT_INPUT_PORT: &str = "input";

/// Default canonical output port name.
pub const DEFAULT_OUTPUT_PORT: &str = "output";
