use plexus_coercion::to_text;
use plexus_config::Expression;
use serde_json::Value;

use crate::error::ResolveError;
use crate::outputs::{Outputs, lookup};

/// Evaluate a field expression against completed outputs.
///
/// Literals are returned as written; conversion to the target field's
/// declared type happens when the input is assembled. A reference with a
/// `key` requires the port value to be a map holding that key. A
/// concatenation stringifies each part and joins them.
pub fn evaluate(expression: &Expression, outputs: &Outputs) -> Result<Value, ResolveError> {
  match expression {
    Expression::Literal { value } => Ok(value.clone()),
    Expression::Reference {
      instance_id,
      port,
      key,
    } => {
      let value = lookup(outputs, instance_id, port)?;
      let Some(key) = key else {
        return Ok(value.clone());
      };
      let map = value.as_object().ok_or_else(|| ResolveError::NotADict {
        instance_id: instance_id.clone(),
        port: port.clone(),
      })?;
      map.get(key).cloned().ok_or_else(|| ResolveError::KeyNotFound {
        key: key.clone(),
        instance_id: instance_id.clone(),
        port: port.clone(),
      })
    }
    Expression::Concatenation { parts } => {
      let mut joined = String::new();
      for part in parts {
        joined.push_str(&to_text(&evaluate(part, outputs)?));
      }
      Ok(Value::String(joined))
    }
  }
}
