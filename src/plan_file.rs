//! Plan file format read by the CLI.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use plexus_component::ComponentRegistry;
use plexus_config::PlanDef;
use plexus_runtime::RuntimeConfig;
use serde::Deserialize;

use crate::builtin::ComponentSpec;

/// A plan definition together with the built-in components it wires.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
  pub plan: PlanDef,
  #[serde(default)]
  pub components: BTreeMap<String, ComponentSpec>,
  #[serde(default)]
  pub runtime: RuntimeConfig,
}

impl PlanFile {
  pub async fn load(path: &Path) -> Result<Self> {
    let content = tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read plan file: {}", path.display()))?;

    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse plan file: {}", path.display()))
  }

  pub fn registry(&self) -> ComponentRegistry {
    self
      .components
      .iter()
      .fold(ComponentRegistry::new(), |registry, (id, spec)| {
        registry.with(spec.clone().into_registration(id))
      })
  }
}
