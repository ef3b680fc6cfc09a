//! In-memory components shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use plexus_coercion::to_text;
use plexus_component::{Component, ComponentError, ComponentInput, ComponentOutput};
use serde_json::{Map, Value};

/// Emits a fixed value.
pub struct Constant(pub Value);

#[async_trait]
impl Component for Constant {
  async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput::new(self.0.clone()))
  }
}

/// Emits `echo[<input>]`.
pub struct Echo;

#[async_trait]
impl Component for Echo {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    let text = to_text(input.require("input")?);
    Ok(ComponentOutput::new(format!("echo[{text}]")))
  }
}

/// Emits `a[<a>]|b[<b>]`.
pub struct DualConcat;

#[async_trait]
impl Component for DualConcat {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    let a = to_text(input.require("a")?);
    let b = to_text(input.require("b")?);
    Ok(ComponentOutput::new(format!("a[{a}]|b[{b}]")))
  }
}

/// Emits its gathered input fields as a map.
pub struct Inspect;

#[async_trait]
impl Component for Inspect {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput::new(Value::Object(input.fields)))
  }
}

/// Adds one context entry and emits its value.
pub struct ContextWriter {
  pub key: &'static str,
  pub value: &'static str,
}

#[async_trait]
impl Component for ContextWriter {
  async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput::new(self.value).with_context(self.key, self.value))
  }
}

/// Emits the run context it was given.
pub struct ContextReader;

#[async_trait]
impl Component for ContextReader {
  async fn run(&self, input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Ok(ComponentOutput::new(Value::Object(input.context.into_map())))
  }
}

/// Always fails.
pub struct Failing;

#[async_trait]
impl Component for Failing {
  async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    Err(ComponentError::failed("upstream service unavailable"))
  }
}

/// Sleeps while tracking how many instances are running at once.
pub struct Gate {
  pub active: Arc<AtomicUsize>,
  pub peak: Arc<AtomicUsize>,
}

impl Gate {
  pub fn new(active: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
    Self {
      active: active.clone(),
      peak: peak.clone(),
    }
  }
}

#[async_trait]
impl Component for Gate {
  async fn run(&self, _input: ComponentInput) -> Result<ComponentOutput, ComponentError> {
    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(30)).await;
    self.active.fetch_sub(1, Ordering::SeqCst);
    Ok(ComponentOutput::new(now))
  }
}

pub fn payload(value: Value) -> Map<String, Value> {
  match value {
    Value::Object(map) => map,
    other => panic!("payload must be an object, got {other}"),
  }
}
