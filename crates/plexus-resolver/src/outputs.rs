use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Output ports of completed nodes, keyed by node id.
pub type Outputs = HashMap<String, Map<String, Value>>;

/// Look up one output port of one node.
pub fn lookup<'a>(
  outputs: &'a Outputs,
  instance_id: &str,
  port: &str,
) -> Result<&'a Value, ResolveError> {
  let ports = outputs.get(instance_id);
  ports.and_then(|ports| ports.get(port)).ok_or_else(|| {
    let mut available: Vec<String> = ports
      .map(|ports| ports.keys().cloned().collect())
      .unwrap_or_default();
    available.sort();
    ResolveError::UnresolvedReference {
      instance_id: instance_id.to_string(),
      port: port.to_string(),
      available,
    }
  })
}
