use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Side-channel data accumulated across one run.
///
/// Only the scheduler writes to it, by merging the additions each component
/// returns. Entries are never removed during a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunContext(Map<String, Value>);

impl RunContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// Merge additions; later writes to the same key win.
  pub fn merge(&mut self, additions: Map<String, Value>) {
    self.0.extend(additions);
  }

  pub fn as_map(&self) -> &Map<String, Value> {
    &self.0
  }

  pub fn into_map(self) -> Map<String, Value> {
    self.0
  }
}
