use plexus_coercion::CoercionPolicy;
use serde::{Deserialize, Serialize};

/// Ready nodes run at most this many at a time unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Configuration for the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
  /// Upper bound on concurrently running components within one batch.
  /// Zero is treated as one.
  pub max_concurrency: usize,
  /// How mappings that cannot coerce are handled at build time.
  pub coercion_policy: CoercionPolicy,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      max_concurrency: DEFAULT_MAX_CONCURRENCY,
      coercion_policy: CoercionPolicy::default(),
    }
  }
}

impl RuntimeConfig {
  pub fn strict() -> Self {
    Self {
      coercion_policy: CoercionPolicy::strict(),
      ..Self::default()
    }
  }

  pub(crate) fn concurrency(&self) -> usize {
    self.max_concurrency.max(1)
  }
}
