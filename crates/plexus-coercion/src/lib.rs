//! Plexus Coercion
//!
//! Components exchange data that is conceptually equivalent but structurally
//! different: a single chat message, a list of messages, a generic map
//! payload, or plain text. Instead of forcing one wire type, this crate keeps
//! a registry of small conversion rules keyed by `(source, target)` type
//! pairs, with two fallbacks:
//!
//! - unknown source, textual target → canonical text rendering
//! - structured target without a rule → explicit [`CoercionError::NoRule`]
//!
//! The same registry answers build-time "can this declared type convert to
//! that declared type" queries. How strictly a negative answer is treated
//! depends on whether the endpoints are typed or legacy, see
//! [`CoercionPolicy`].

mod error;
mod policy;
mod registry;
mod text;
mod types;

pub use error::CoercionError;
pub use policy::{CoercionPolicy, Severity, Tier};
pub use registry::{CoercionRegistry, CoercionRule};
pub use text::to_text;
pub use types::{TypeKey, is_message, type_key_of};
