use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::CoercionError;
use crate::text::to_text;
use crate::types::{TypeKey, type_key_of};

/// A conversion from one runtime type to a declared target type.
pub type CoercionRule = Arc<dyn Fn(Value) -> Result<Value, CoercionError> + Send + Sync>;

/// Registry of `(source, target)` coercion rules.
///
/// Cloning is cheap; rules are shared.
#[derive(Clone)]
pub struct CoercionRegistry {
  rules: HashMap<(TypeKey, TypeKey), CoercionRule>,
}

impl fmt::Debug for CoercionRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut pairs: Vec<_> = self.rules.keys().collect();
    pairs.sort();
    f.debug_struct("CoercionRegistry")
      .field("rules", &pairs)
      .finish()
  }
}

impl Default for CoercionRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl CoercionRegistry {
  /// Create a registry with the built-in rules.
  pub fn new() -> Self {
    let mut registry = Self::empty();

    registry.register(TypeKey::String, TypeKey::Message, |v| {
      Ok(json!({ "role": "user", "content": to_text(&v) }))
    });
    registry.register(TypeKey::String, TypeKey::MessageList, |v| {
      Ok(json!([{ "role": "user", "content": to_text(&v) }]))
    });
    registry.register(TypeKey::Message, TypeKey::MessageList, |v| Ok(json!([v])));
    registry.register(TypeKey::MessageList, TypeKey::Message, |v| {
      let source_type = type_key_of(&v);
      let last = match v {
        Value::Array(mut items) => items.pop(),
        _ => None,
      };
      last.ok_or(CoercionError::NoRule {
        source_type,
        target: TypeKey::Message,
      })
    });
    registry.register(TypeKey::Message, TypeKey::String, |v| {
      Ok(Value::String(to_text(v.get("content").unwrap_or(&Value::Null))))
    });
    registry.register(TypeKey::MessageList, TypeKey::String, |v| {
      let contents: Vec<String> = v
        .as_array()
        .map(|items| {
          items
            .iter()
            .map(|m| to_text(m.get("content").unwrap_or(&Value::Null)))
            .collect()
        })
        .unwrap_or_default();
      Ok(Value::String(contents.join("\n")))
    });
    registry.register(TypeKey::Message, TypeKey::Map, Ok);
    registry.register(TypeKey::MessageList, TypeKey::List, Ok);
    registry.register(TypeKey::String, TypeKey::List, |v| {
      parse_json_text(v, TypeKey::List, Value::is_array)
    });
    registry.register(TypeKey::String, TypeKey::Map, |v| {
      parse_json_text(v, TypeKey::Map, Value::is_object)
    });
    registry.register(TypeKey::Integer, TypeKey::Number, |v| {
      parse_primitive(v, TypeKey::Number)
    });

    registry
  }

  /// Create a registry with no rules. Only identity and text fallbacks apply.
  pub fn empty() -> Self {
    Self {
      rules: HashMap::new(),
    }
  }

  /// Register (or replace) the rule for a `(source, target)` pair.
  pub fn register<F>(&mut self, source: TypeKey, target: TypeKey, rule: F)
  where
    F: Fn(Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
  {
    self.rules.insert((source, target), Arc::new(rule));
  }

  /// Whether a rule exists for the pair. Identity and fallbacks are not rules.
  pub fn has_rule(&self, source: TypeKey, target: TypeKey) -> bool {
    self.rules.contains_key(&(source, target))
  }

  /// Convert a value into the target type.
  ///
  /// The source type is `source_hint` when given (a declared output type),
  /// otherwise the value's runtime type.
  pub fn coerce(
    &self,
    value: Value,
    target: TypeKey,
    source_hint: Option<TypeKey>,
  ) -> Result<Value, CoercionError> {
    let source = match source_hint {
      Some(TypeKey::Any) | None => type_key_of(&value),
      Some(hint) => hint,
    };

    if source == target || target == TypeKey::Any {
      return Ok(value);
    }

    if let Some(rule) = self.rules.get(&(source, target)) {
      return rule(value);
    }

    if target.is_primitive() {
      return parse_primitive(value, target);
    }

    // A declared hint may be stale; retry with the runtime type before giving up.
    let actual = type_key_of(&value);
    if actual == target {
      return Ok(value);
    }
    if actual != source {
      if let Some(rule) = self.rules.get(&(actual, target)) {
        return rule(value);
      }
    }

    Err(CoercionError::NoRule {
      source_type: source,
      target,
    })
  }

  /// Build-time check: can a value declared as `source` become `target`?
  ///
  /// Always true when the types are equal. This never inspects values, so a
  /// `true` answer can still fail at run time (e.g. unparseable text).
  pub fn can_coerce(&self, source: TypeKey, target: TypeKey) -> bool {
    if source == target || target == TypeKey::Any || source == TypeKey::Any {
      return true;
    }
    if target == TypeKey::String || self.has_rule(source, target) {
      return true;
    }
    match target {
      TypeKey::Integer => matches!(source, TypeKey::String | TypeKey::Number),
      TypeKey::Number | TypeKey::Boolean | TypeKey::Null => source == TypeKey::String,
      _ => false,
    }
  }
}

fn parse_json_text(
  value: Value,
  target: TypeKey,
  accept: fn(&Value) -> bool,
) -> Result<Value, CoercionError> {
  let text = to_text(&value);
  match serde_json::from_str::<Value>(&text) {
    Ok(parsed) if accept(&parsed) => Ok(parsed),
    Ok(parsed) => Err(CoercionError::parse(
      target,
      &text,
      format!("parsed as {}", type_key_of(&parsed)),
    )),
    Err(e) => Err(CoercionError::parse(target, &text, e.to_string())),
  }
}

fn parse_primitive(value: Value, target: TypeKey) -> Result<Value, CoercionError> {
  match target {
    TypeKey::String => Ok(Value::String(to_text(&value))),

    TypeKey::Integer => {
      if let Some(n) = value.as_i64() {
        return Ok(json!(n));
      }
      if let Some(n) = value.as_f64() {
        if n.fract() == 0.0 {
          // i64::MAX as f64 rounds up to 2^63, which is already out of range.
          if (i64::MIN as f64..i64::MAX as f64).contains(&n) {
            return Ok(json!(n as i64));
          }
          return Err(CoercionError::parse(
            target,
            &to_text(&value),
            "out of range for integer",
          ));
        }
      }
      let text = to_text(&value);
      text
        .trim()
        .parse::<i64>()
        .map(|n| json!(n))
        .map_err(|e| CoercionError::parse(target, &text, e.to_string()))
    }

    TypeKey::Number => {
      let text = to_text(&value);
      text
        .trim()
        .parse::<f64>()
        .map_err(|e| e.to_string())
        .and_then(|n| serde_json::Number::from_f64(n).ok_or_else(|| "not finite".to_string()))
        .map(Value::Number)
        .map_err(|message| CoercionError::parse(target, &text, message))
    }

    TypeKey::Boolean => {
      let text = to_text(&value);
      match text.trim().to_lowercase().as_str() {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        _ => Err(CoercionError::parse(target, &text, "expected true or false")),
      }
    }

    TypeKey::Null => {
      let text = to_text(&value);
      if text.is_empty() || text == "null" {
        Ok(Value::Null)
      } else {
        Err(CoercionError::parse(target, &text, "expected empty or null"))
      }
    }

    _ => Err(CoercionError::NoRule {
      source_type: type_key_of(&value),
      target,
    }),
  }
}
