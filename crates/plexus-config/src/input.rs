//! Static parameter values for node configuration.
//!
//! Parameters are plain JSON values. String parameters may contain legacy
//! template references that are resolved against upstream outputs at run time.
//!
//! # Examples
//!
//! ```json
//! {
//!   "system_prompt": "You are terse.",
//!   "question": "Summarize: {{@search.output}}",
//!   "documents": "{{@retriever.documents}}",
//!   "temperature": 0.2
//! }
//! ```
//!
//! After resolution:
//! - `"question"` → text with the search output spliced in
//! - `"documents"` → the retriever's `documents` value, unconverted (list/map kept)
//! - `"temperature"` → `0.2` (non-string values are passed through)

/// A parameter value is any JSON value; strings are parsed as templates.
pub type ParamValue = serde_json::Value;
