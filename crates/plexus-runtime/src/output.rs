//! Output normalization.

use plexus_coercion::CoercionRegistry;
use plexus_component::Registration;
use serde_json::{Map, Value};

use crate::error::RuntimeError;

/// Turn a component's output data into `port -> value`.
///
/// A typed component returning a map that names at least one declared port
/// is read port by port, and declared ports are coerced to their types.
/// Anything else is stored under the canonical output port. For legacy
/// components a map's entries are additionally exposed as ports, without
/// replacing the canonical one.
pub fn normalize_output(
  registration: &Registration,
  node_id: &str,
  data: Value,
  coercion: &CoercionRegistry,
) -> Result<Map<String, Value>, RuntimeError> {
  let canonical = registration.ports.output.clone();

  let Some(schema) = registration.output_schema() else {
    let mut ports = match &data {
      Value::Object(map) => map.clone(),
      _ => Map::new(),
    };
    ports.insert(canonical, data);
    return Ok(ports);
  };

  let mut ports = match data {
    Value::Object(map) if map.keys().any(|key| schema.contains_key(key)) => map,
    other => Map::from_iter([(canonical, other)]),
  };

  for (port, target) in schema {
    if let Some(value) = ports.remove(port) {
      let value = coercion
        .coerce(value, *target, None)
        .map_err(|source| RuntimeError::OutputCoercion {
          node_id: node_id.to_string(),
          port: port.clone(),
          source,
        })?;
      ports.insert(port.clone(), value);
    }
  }
  Ok(ports)
}
