//! Built-in components available to plan files.

use std::collections::BTreeMap;

use async_trait::async_trait;
use plexus_coercion::{TypeKey, to_text};
use plexus_component::{
  CanonicalPorts, Component, ComponentError, ComponentInput, ComponentKind, ComponentOutput,
  Registration,
};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Which built-in to instantiate, with its settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuiltinSpec {
  /// Emits `value`, optionally adding `context` entries to the run context.
  Constant {
    value: Value,
    #[serde(default)]
    context: Map<String, Value>,
  },
  /// Emits its canonical input, wrapped in `prefix`/`suffix` when either is set.
  Echo {
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    suffix: String,
  },
  /// Joins the text of `fields` (all fields, sorted by name, when empty).
  Join {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default = "default_separator")]
    separator: String,
  },
  /// Emits every input field as a map.
  Passthrough,
}

fn default_separator() -> String {
  "\n".to_string()
}

fn default_true() -> bool {
  true
}

/// One component entry of a plan file.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentSpec {
  #[serde(flatten)]
  pub builtin: BuiltinSpec,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub ports: Option<PortNames>,
  /// Declared input types. Declaring either schema makes the component typed.
  #[serde(default)]
  pub inputs: Option<BTreeMap<String, TypeKey>>,
  #[serde(default)]
  pub outputs: Option<BTreeMap<String, TypeKey>>,
  #[serde(default = "default_true")]
  pub expressions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortNames {
  pub input: String,
  pub output: String,
}

impl ComponentSpec {
  pub fn into_registration(self, id: &str) -> Registration {
    let ports = self
      .ports
      .map(|p| CanonicalPorts {
        input: p.input,
        output: p.output,
      })
      .unwrap_or_default();

    let mut registration = match self.builtin {
      BuiltinSpec::Constant { value, context } => {
        Registration::legacy(id, Constant { value, context })
      }
      BuiltinSpec::Echo { prefix, suffix } => Registration::legacy(
        id,
        Echo {
          field: ports.input.clone(),
          prefix,
          suffix,
        },
      ),
      BuiltinSpec::Join { fields, separator } => {
        Registration::legacy(id, Join { fields, separator })
      }
      BuiltinSpec::Passthrough => Registration::legacy(id, Passthrough),
    };

    registration.ports = ports;
    registration.display_name = self.display_name;
    registration.expression_target = self.expressions;
    if self.inputs.is_some() || self.outputs.is_some() {
      registration.kind = ComponentKind::Typed {
        input_schema: self.inputs.unwrap_or_default(),
        output_schema: self.outputs.unwrap_or_default(),
      };
    }
    registration
  }
}

struct Constant {
  value: Value,
  context: Map<String, Value>,
}

#[async_trait]
impl Component for Constant {
  async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput {
      data: self.value.clone(),
      context: self.context.clone(),
    })
  }
}

struct Echo {
  field: String,
  prefix: String,
  suffix: String,
}

#[async_trait]
impl Component for Echo {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    let value = input.require(&self.field)?;
    if self.prefix.is_empty() && self.suffix.is_empty() {
      return Ok(ComponentOutput::new(value.clone()));
    }
    Ok(ComponentOutput::new(format!(
      "{}{}{}",
      self.prefix,
      to_text(value),
      self.suffix
    )))
  }
}

struct Join {
  fields: Vec<String>,
  separator: String,
}

#[async_trait]
impl Component for Join {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    let parts = if self.fields.is_empty() {
      let mut names: Vec<&String> = input.fields.keys().collect();
      names.sort();
      names
        .into_iter()
        .map(|name| to_text(&input.fields[name.as_str()]))
        .collect::<Vec<_>>()
    } else {
      self
        .fields
        .iter()
        .map(|name| input.require(name).map(to_text))
        .collect::<Result<Vec<_>, _>>()?
    };
    Ok(ComponentOutput::new(parts.join(&self.separator)))
  }
}

struct Passthrough;

#[async_trait]
impl Component for Passthrough {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput::new(Value::Object(input.fields)))
  }
}
