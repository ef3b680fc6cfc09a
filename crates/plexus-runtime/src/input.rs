//! Input gathering.
//!
//! Fields are filled in priority order:
//!
//! 1. static parameters, with legacy templates resolved
//! 2. computed expressions (anything but a bare reference), overwriting
//! 3. direct mappings into still-empty fields (first write wins), then bare
//!    reference expressions into whatever is still empty
//! 4. for a start node with no mappings and no expressions, matching keys of
//!    the run payload, with chat-shaped payloads also copied onto the
//!    canonical input
//!
//! Typed components then have every declared field coerced to its type.

use plexus_coercion::CoercionRegistry;
use plexus_component::Registration;
use plexus_config::{FieldExpression, VIRTUAL_INPUT_ID};
use plexus_resolver::{Outputs, ResolveError, evaluate, lookup};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RuntimeError;
use crate::plan::Plan;

/// Payload keys that are copied onto the canonical input when it is empty.
const CHAT_PAYLOAD_KEYS: [&str; 2] = ["messages", "message"];

/// Assemble the input fields for `node_id` from completed outputs.
///
/// `outputs` must hold the run payload under the virtual input id.
pub fn gather_input(
  plan: &Plan,
  node_id: &str,
  outputs: &Outputs,
  coercion: &CoercionRegistry,
) -> Result<Map<String, Value>, RuntimeError> {
  let registration = plan.registration(node_id)?;
  let mut fields = Map::new();

  for (field, value) in plan.params_of(node_id) {
    let resolved = value
      .resolve(outputs)
      .map_err(|source| resolution_error(node_id, field, source))?;
    fields.insert(field.clone(), resolved);
  }

  let (pure, computed): (Vec<&FieldExpression>, Vec<&FieldExpression>) = plan
    .expressions_into(node_id)
    .partition(|e| e.expression.is_pure_reference());

  for field_expression in &computed {
    let value = evaluate(&field_expression.expression, outputs)
      .map_err(|source| resolution_error(node_id, &field_expression.target_field, source))?;
    fields.insert(field_expression.target_field.clone(), value);
  }

  let mut mapped = false;
  for mapping in plan.mappings_into(node_id) {
    mapped = true;
    if fields.contains_key(&mapping.target_port) {
      debug!(
        node_id = %node_id,
        field = %mapping.target_port,
        source_id = %mapping.source_id,
        "mapping_skipped"
      );
      continue;
    }
    let value = lookup(outputs, &mapping.source_id, &mapping.source_port)
      .map_err(|source| resolution_error(node_id, &mapping.target_port, source))?;
    fields.insert(mapping.target_port.clone(), value.clone());
  }

  for field_expression in &pure {
    if fields.contains_key(&field_expression.target_field) {
      debug!(
        node_id = %node_id,
        field = %field_expression.target_field,
        "reference_expression_skipped"
      );
      continue;
    }
    let value = evaluate(&field_expression.expression, outputs)
      .map_err(|source| resolution_error(node_id, &field_expression.target_field, source))?;
    fields.insert(field_expression.target_field.clone(), value);
  }

  if plan.is_start(node_id) && !mapped && pure.is_empty() && computed.is_empty() {
    if let Some(payload) = outputs.get(VIRTUAL_INPUT_ID) {
      passthrough(registration, payload, &mut fields);
    }
  }

  coerce_fields(registration, node_id, fields, coercion)
}

fn passthrough(
  registration: &Registration,
  payload: &Map<String, Value>,
  fields: &mut Map<String, Value>,
) {
  for (key, value) in payload {
    if registration.accepts_input(key) && !fields.contains_key(key) {
      fields.insert(key.clone(), value.clone());
    }
  }

  let canonical = &registration.ports.input;
  if fields.contains_key(canonical) || !registration.accepts_input(canonical) {
    return;
  }
  if let Some(value) = CHAT_PAYLOAD_KEYS.iter().find_map(|key| payload.get(*key)) {
    fields.insert(canonical.clone(), value.clone());
  }
}

fn coerce_fields(
  registration: &Registration,
  node_id: &str,
  fields: Map<String, Value>,
  coercion: &CoercionRegistry,
) -> Result<Map<String, Value>, RuntimeError> {
  if registration.input_schema().is_none() {
    return Ok(fields);
  }

  let mut coerced = Map::new();
  for (field, value) in fields {
    let value = match registration.input_type(&field) {
      Some(target) => {
        coercion
          .coerce(value, target, None)
          .map_err(|source| RuntimeError::InputCoercion {
            node_id: node_id.to_string(),
            field: field.clone(),
            source,
          })?
      }
      None => value,
    };
    coerced.insert(field, value);
  }
  Ok(coerced)
}

fn resolution_error(node_id: &str, field: &str, source: ResolveError) -> RuntimeError {
  RuntimeError::InputResolution {
    node_id: node_id.to_string(),
    field: field.to_string(),
    source,
  }
}
