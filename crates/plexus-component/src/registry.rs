use std::collections::HashMap;

use crate::registration::Registration;

/// The components available to one plan, keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
  components: HashMap<String, Registration>,
}

impl ComponentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a registration, replacing any previous one with the same id.
  pub fn register(&mut self, registration: Registration) -> &mut Self {
    self
      .components
      .insert(registration.id.clone(), registration);
    self
  }

  pub fn with(mut self, registration: Registration) -> Self {
    self.register(registration);
    self
  }

  pub fn get(&self, id: &str) -> Option<&Registration> {
    self.components.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.components.contains_key(id)
  }

  /// Display name for `id`, falling back to the id itself.
  pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
    self.get(id).map_or(id, Registration::display_name)
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.components.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.components.len()
  }

  pub fn is_empty(&self) -> bool {
    self.components.is_empty()
  }
}
