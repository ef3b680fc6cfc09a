use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared type of a port, and the runtime discriminator for values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKey {
  /// Accepts anything unchanged.
  Any,
  String,
  Integer,
  Number,
  Boolean,
  Null,
  List,
  Map,
  /// A map with string `role` and `content` fields.
  Message,
  /// A non-empty list of messages.
  MessageList,
}

impl TypeKey {
  /// Primitive targets are parsed from text; structured targets need a rule.
  pub fn is_primitive(self) -> bool {
    matches!(
      self,
      Self::String | Self::Integer | Self::Number | Self::Boolean | Self::Null
    )
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Any => "any",
      Self::String => "string",
      Self::Integer => "integer",
      Self::Number => "number",
      Self::Boolean => "boolean",
      Self::Null => "null",
      Self::List => "list",
      Self::Map => "map",
      Self::Message => "message",
      Self::MessageList => "message_list",
    }
  }
}

impl fmt::Display for TypeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Whether a value looks like a single chat message.
pub fn is_message(value: &Value) -> bool {
  value
    .as_object()
    .is_some_and(|obj| {
      obj.get("role").is_some_and(Value::is_string) && obj.get("content").is_some_and(Value::is_string)
    })
}

/// Runtime type of an untyped value.
pub fn type_key_of(value: &Value) -> TypeKey {
  match value {
    Value::Null => TypeKey::Null,
    Value::Bool(_) => TypeKey::Boolean,
    Value::Number(n) if n.is_i64() || n.is_u64() => TypeKey::Integer,
    Value::Number(_) => TypeKey::Number,
    Value::String(_) => TypeKey::String,
    Value::Array(items) if !items.is_empty() && items.iter().all(is_message) => {
      TypeKey::MessageList
    }
    Value::Array(_) => TypeKey::List,
    Value::Object(_) if is_message(value) => TypeKey::Message,
    Value::Object(_) => TypeKey::Map,
  }
}
