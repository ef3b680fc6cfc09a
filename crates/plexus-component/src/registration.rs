use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use plexus_coercion::{Tier, TypeKey};
use plexus_config::{DEFAULT_INPUT_PORT, DEFAULT_OUTPUT_PORT};

use crate::component::Component;

/// Declared field types, keyed by field name.
pub type Schema = BTreeMap<String, TypeKey>;

/// Capability tag: does the component declare its port types?
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
  Typed {
    input_schema: Schema,
    output_schema: Schema,
  },
  /// No schemas. Inputs are passed through unconverted and mismatches only
  /// warn at build time.
  Legacy,
}

/// Default input/output field names used for auto-wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPorts {
  pub input: String,
  pub output: String,
}

impl Default for CanonicalPorts {
  fn default() -> Self {
    Self {
      input: DEFAULT_INPUT_PORT.to_string(),
      output: DEFAULT_OUTPUT_PORT.to_string(),
    }
  }
}

/// A component instance as registered for one plan.
#[derive(Clone)]
pub struct Registration {
  pub id: String,
  pub display_name: Option<String>,
  pub component: Arc<dyn Component>,
  pub kind: ComponentKind,
  pub ports: CanonicalPorts,
  /// Whether field expressions may target this component's inputs.
  pub expression_target: bool,
}

impl fmt::Debug for Registration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Registration")
      .field("id", &self.id)
      .field("display_name", &self.display_name)
      .field("kind", &self.kind)
      .field("ports", &self.ports)
      .field("expression_target", &self.expression_target)
      .finish_non_exhaustive()
  }
}

impl Registration {
  /// Register an untyped component.
  pub fn legacy(id: impl Into<String>, component: impl Component + 'static) -> Self {
    Self {
      id: id.into(),
      display_name: None,
      component: Arc::new(component),
      kind: ComponentKind::Legacy,
      ports: CanonicalPorts::default(),
      expression_target: true,
    }
  }

  /// Register a component with declared input and output schemas.
  pub fn typed(
    id: impl Into<String>,
    component: impl Component + 'static,
    input_schema: impl IntoIterator<Item = (&'static str, TypeKey)>,
    output_schema: impl IntoIterator<Item = (&'static str, TypeKey)>,
  ) -> Self {
    Self {
      kind: ComponentKind::Typed {
        input_schema: to_schema(input_schema),
        output_schema: to_schema(output_schema),
      },
      ..Self::legacy(id, component)
    }
  }

  pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
    self.display_name = Some(name.into());
    self
  }

  pub fn with_ports(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
    self.ports = CanonicalPorts {
      input: input.into(),
      output: output.into(),
    };
    self
  }

  /// Reject field expressions targeting this component.
  pub fn without_expressions(mut self) -> Self {
    self.expression_target = false;
    self
  }

  /// Name used in error messages.
  pub fn display_name(&self) -> &str {
    self.display_name.as_deref().unwrap_or(&self.id)
  }

  pub fn tier(&self) -> Tier {
    match self.kind {
      ComponentKind::Typed { .. } => Tier::Typed,
      ComponentKind::Legacy => Tier::Legacy,
    }
  }

  pub fn input_schema(&self) -> Option<&Schema> {
    match &self.kind {
      ComponentKind::Typed { input_schema, .. } => Some(input_schema),
      ComponentKind::Legacy => None,
    }
  }

  pub fn output_schema(&self) -> Option<&Schema> {
    match &self.kind {
      ComponentKind::Typed { output_schema, .. } => Some(output_schema),
      ComponentKind::Legacy => None,
    }
  }

  /// Whether `field` is a valid input. Legacy components accept any field.
  pub fn accepts_input(&self, field: &str) -> bool {
    self.input_schema().is_none_or(|s| s.contains_key(field))
  }

  /// Whether `port` is a valid output. Legacy components may emit any port.
  pub fn provides_output(&self, port: &str) -> bool {
    self.output_schema().is_none_or(|s| s.contains_key(port))
  }

  /// Declared input type; `None` for legacy components or unknown fields.
  pub fn input_type(&self, field: &str) -> Option<TypeKey> {
    self.input_schema().and_then(|s| s.get(field).copied())
  }

  /// Declared output type; `None` for legacy components or unknown ports.
  pub fn output_type(&self, port: &str) -> Option<TypeKey> {
    self.output_schema().and_then(|s| s.get(port).copied())
  }
}

fn to_schema(fields: impl IntoIterator<Item = (&'static str, TypeKey)>) -> Schema {
  fields
    .into_iter()
    .map(|(name, key)| (name.to_string(), key))
    .collect()
}
