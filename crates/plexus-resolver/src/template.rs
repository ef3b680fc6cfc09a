//! Legacy string templates.
//!
//! A template is plain text with `{{@instance.port}}` references. Whitespace
//! inside the braces is ignored and the port is everything after the last
//! dot, so instance ids may themselves contain dots. `\{{` produces a literal
//! `{{`, and `{{` not followed by `@` is kept as text.

use plexus_coercion::to_text;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::outputs::{Outputs, lookup};

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
  Text(String),
  Reference { instance_id: String, port: String },
}

/// A parsed template string.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
  source: String,
  segments: Vec<Segment>,
}

impl Template {
  pub fn parse(source: &str) -> Result<Self, ResolveError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(ch) = rest.chars().next() {
      if let Some(after) = rest.strip_prefix("\\{{") {
        text.push_str("{{");
        rest = after;
        continue;
      }

      if let Some(after) = rest.strip_prefix("{{") {
        match after.trim_start().strip_prefix('@') {
          Some(body) => {
            let end = body
              .find("}}")
              .ok_or_else(|| ResolveError::syntax(source, "unterminated reference"))?;
            let (instance_id, port) = split_reference(source, body[..end].trim())?;
            if !text.is_empty() {
              segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Reference { instance_id, port });
            rest = &body[end + 2..];
          }
          None => {
            text.push_str("{{");
            rest = after;
          }
        }
        continue;
      }

      text.push(ch);
      rest = &rest[ch.len_utf8()..];
    }

    if !text.is_empty() {
      segments.push(Segment::Text(text));
    }

    Ok(Self {
      source: source.to_string(),
      segments,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn segments(&self) -> &[Segment] {
    &self.segments
  }

  /// Every `(instance_id, port)` pair referenced, in order of appearance.
  pub fn references(&self) -> Vec<(&str, &str)> {
    self
      .segments
      .iter()
      .filter_map(|segment| match segment {
        Segment::Reference { instance_id, port } => Some((instance_id.as_str(), port.as_str())),
        Segment::Text(_) => None,
      })
      .collect()
  }

  pub fn has_references(&self) -> bool {
    self
      .segments
      .iter()
      .any(|segment| matches!(segment, Segment::Reference { .. }))
  }

  /// Render against completed outputs.
  ///
  /// A template that is exactly one reference yields the referenced value
  /// unconverted. Anything else is rendered to a string.
  pub fn resolve(&self, outputs: &Outputs) -> Result<Value, ResolveError> {
    if let [Segment::Reference { instance_id, port }] = self.segments.as_slice() {
      return lookup(outputs, instance_id, port).cloned();
    }

    let mut rendered = String::new();
    for segment in &self.segments {
      match segment {
        Segment::Text(text) => rendered.push_str(text),
        Segment::Reference { instance_id, port } => {
          rendered.push_str(&to_text(lookup(outputs, instance_id, port)?));
        }
      }
    }
    Ok(Value::String(rendered))
  }
}

fn split_reference(source: &str, body: &str) -> Result<(String, String), ResolveError> {
  match body.rsplit_once('.') {
    Some((instance_id, port)) if !instance_id.trim().is_empty() && !port.trim().is_empty() => {
      Ok((instance_id.trim().to_string(), port.trim().to_string()))
    }
    _ => Err(ResolveError::syntax(
      source,
      format!("reference '@{body}' must be of the form '@instance.port'"),
    )),
  }
}

/// A parameter value with templates parsed out of every string it contains.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
  Template(Template),
  Array(Vec<TemplateValue>),
  Object(Vec<(String, TemplateValue)>),
  Value(Value),
}

impl TemplateValue {
  pub fn parse(value: &Value) -> Result<Self, ResolveError> {
    Ok(match value {
      Value::String(s) => Self::Template(Template::parse(s)?),
      Value::Array(items) => Self::Array(items.iter().map(Self::parse).collect::<Result<_, _>>()?),
      Value::Object(fields) => Self::Object(
        fields
          .iter()
          .map(|(key, value)| Ok((key.clone(), Self::parse(value)?)))
          .collect::<Result<_, ResolveError>>()?,
      ),
      other => Self::Value(other.clone()),
    })
  }

  pub fn references(&self) -> Vec<(&str, &str)> {
    match self {
      Self::Template(template) => template.references(),
      Self::Array(items) => items.iter().flat_map(Self::references).collect(),
      Self::Object(fields) => fields.iter().flat_map(|(_, v)| v.references()).collect(),
      Self::Value(_) => Vec::new(),
    }
  }

  pub fn resolve(&self, outputs: &Outputs) -> Result<Value, ResolveError> {
    match self {
      Self::Template(template) => template.resolve(outputs),
      Self::Array(items) => items
        .iter()
        .map(|item| item.resolve(outputs))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array),
      Self::Object(fields) => {
        let mut resolved = Map::new();
        for (key, value) in fields {
          resolved.insert(key.clone(), value.resolve(outputs)?);
        }
        Ok(Value::Object(resolved))
      }
      Self::Value(value) => Ok(value.clone()),
    }
  }
}
