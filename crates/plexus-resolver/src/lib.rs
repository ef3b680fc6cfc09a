//! Plexus Resolver
//!
//! Resolves values that read other components' outputs:
//!
//! - [`Template`]: legacy `{{@instance.port}}` string templates used in
//!   static parameters
//! - [`TemplateValue`]: a parameter value with templates in any nested string
//! - [`evaluate`]: field expressions (literal, reference, concatenation)
//!
//! Both resolve against [`Outputs`], the completed nodes' output ports.

mod error;
mod expression;
mod outputs;
mod template;

pub use error::ResolveError;
pub use expression::evaluate;
pub use outputs::{Outputs, lookup};
pub use template::{Segment, Template, TemplateValue};
