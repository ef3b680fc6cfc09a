use serde_json::Value;

/// Render a value as text.
///
/// `null` renders empty, strings render as themselves, numbers and booleans
/// render naturally, and lists/maps render as compact JSON.
pub fn to_text(value: &Value) -> String {
  match value {
    Value::Null => String::new(),
    Value::String(s) => s.clone(),
    Value::Bool(b) => b.to_string(),
    Value::Number(n) => n.to_string(),
    Value::Array(_) | Value::Object(_) => value.to_string(),
  }
}
