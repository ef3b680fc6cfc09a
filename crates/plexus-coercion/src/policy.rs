use serde::{Deserialize, Serialize};

/// Whether a mapping endpoint declares types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
  Typed,
  Legacy,
}

/// What to do with a mapping whose declared types cannot be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  /// Reject the plan.
  Error,
  /// Log a warning; any failure surfaces at run time.
  Warn,
  /// Accept silently.
  Ignore,
}

/// Graduated strictness for build-time coercion checks, per endpoint tier pair.
///
/// The default rejects incompatible typed → typed mappings and only warns
/// when either endpoint is legacy. Use [`CoercionPolicy::strict`] when every
/// component is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionPolicy {
  pub typed_to_typed: Severity,
  pub typed_to_legacy: Severity,
  pub legacy_to_typed: Severity,
  pub legacy_to_legacy: Severity,
}

impl Default for CoercionPolicy {
  fn default() -> Self {
    Self {
      typed_to_typed: Severity::Error,
      typed_to_legacy: Severity::Warn,
      legacy_to_typed: Severity::Warn,
      legacy_to_legacy: Severity::Warn,
    }
  }
}

impl CoercionPolicy {
  /// Every incompatible pair is an error.
  pub fn strict() -> Self {
    Self {
      typed_to_typed: Severity::Error,
      typed_to_legacy: Severity::Error,
      legacy_to_typed: Severity::Error,
      legacy_to_legacy: Severity::Error,
    }
  }

  pub fn severity(&self, source: Tier, target: Tier) -> Severity {
    match (source, target) {
      (Tier::Typed, Tier::Typed) => self.typed_to_typed,
      (Tier::Typed, Tier::Legacy) => self.typed_to_legacy,
      (Tier::Legacy, Tier::Typed) => self.legacy_to_typed,
      (Tier::Legacy, Tier::Legacy) => self.legacy_to_legacy,
    }
  }
}
