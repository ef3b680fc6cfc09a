//! Plexus Component
//!
//! The uniform contract every unit of work implements, plus the registration
//! record the engine uses to wire it: canonical ports, an explicit
//! typed/legacy capability tag with schemas, and whether the component accepts
//! field expressions.

mod component;
mod context;
mod error;
mod registration;
mod registry;

pub use component::{Component, ComponentInput, ComponentOutput};
pub use context::RunContext;
pub use error::ComponentError;
pub use registration::{CanonicalPorts, ComponentKind, Registration, Schema};
pub use registry::ComponentRegistry;
