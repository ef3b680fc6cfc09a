use serde::{Deserialize, Serialize};

/// A small expression computing one input field.
///
/// The node set is closed: a literal, a reference to another instance's
/// output port (optionally extracting one map key), or an ordered
/// concatenation of sub-expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
  Literal {
    value: serde_json::Value,
  },
  Reference {
    instance_id: String,
    port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
  },
  Concatenation {
    parts: Vec<Expression>,
  },
}

impl Expression {
  pub fn literal(value: impl Into<serde_json::Value>) -> Self {
    Self::Literal {
      value: value.into(),
    }
  }

  pub fn reference(instance_id: impl Into<String>, port: impl Into<String>) -> Self {
    Self::Reference {
      instance_id: instance_id.into(),
      port: port.into(),
      key: None,
    }
  }

  pub fn reference_key(
    instance_id: impl Into<String>,
    port: impl Into<String>,
    key: impl Into<String>,
  ) -> Self {
    Self::Reference {
      instance_id: instance_id.into(),
      port: port.into(),
      key: Some(key.into()),
    }
  }

  pub fn concat(parts: impl IntoIterator<Item = Expression>) -> Self {
    Self::Concatenation {
      parts: parts.into_iter().collect(),
    }
  }

  /// A bare reference with nothing around it.
  ///
  /// A pure reference yields to a direct mapping on the same field; every
  /// other expression overrides the mapping.
  pub fn is_pure_reference(&self) -> bool {
    matches!(self, Self::Reference { .. })
  }

  /// Every `(instance_id, port)` pair this expression reads, in order.
  pub fn references(&self) -> Vec<(&str, &str)> {
    let mut refs = Vec::new();
    self.collect_references(&mut refs);
    refs
  }

  fn collect_references<'a>(&'a self, refs: &mut Vec<(&'a str, &'a str)>) {
    match self {
      Self::Literal { .. } => {}
      Self::Reference {
        instance_id, port, ..
      } => refs.push((instance_id.as_str(), port.as_str())),
      Self::Concatenation { parts } => {
        for part in parts {
          part.collect_references(refs);
        }
      }
    }
  }
}

/// An expression attached to one input field of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExpression {
  pub target_id: String,
  pub target_field: String,
  pub expression: Expression,
}

impl FieldExpression {
  pub fn new(
    target_id: impl Into<String>,
    target_field: impl Into<String>,
    expression: Expression,
  ) -> Self {
    Self {
      target_id: target_id.into(),
      target_field: target_field.into(),
      expression,
    }
  }
}
