//! Plexus Workflow
//!
//! This crate provides the structural half of plan validation:
//!
//! - [`Graph`]: must-run-before edges with upstream/downstream lookup,
//!   in-degrees, terminal nodes, and cycle detection
//! - [`synthesize_default_mappings`]: implicit wiring for unambiguous
//!   single-predecessor connections
//! - [`validate_port_mappings`]: checks every mapping's endpoints and declared
//!   types against the coercion registry and strictness policy

mod error;
mod graph;
mod mapping;

pub use error::WorkflowError;
pub use graph::Graph;
pub use mapping::{synthesize_default_mappings, validate_port_mappings};
