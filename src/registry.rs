//! Append-only name to plugin registries.

use crate::core::{Notifier, SlotSource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Sources keyed by the schedule expression they run on. An empty key runs the
/// source on the default schedule.
pub type SourceRegistry = Registry<dyn SlotSource>;

/// Notifiers keyed by channel name.
pub type NotifierRegistry = Registry<dyn Notifier>;

/// A mapping of lower-cased names to plugins.
///
/// The first plugin registered under a name wins; later registrations under the
/// same name are ignored. Entries are never removed.
pub struct Registry<P: ?Sized> {
    entries: HashMap<String, Arc<P>>,
}

impl<P: ?Sized> Registry<P> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `plugin` under `name`.
    ///
    /// # Returns
    /// * `true` if the plugin was stored.
    /// * `false` if a plugin already occupies that name.
    pub fn register(&mut self, name: &str, plugin: Arc<P>) -> bool {
        let key = name.to_lowercase();
        if self.entries.contains_key(&key) {
            debug!(name = %key, "Name already registered, ignoring later registration");
            return false;
        }
        self.entries.insert(key, plugin);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Arc<P>> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<P>)> {
        self.entries.iter().map(|(name, plugin)| (name.as_str(), plugin))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: ?Sized> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    struct Hello;
    struct Howdy;

    impl Greeter for Hello {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    impl Greeter for Howdy {
        fn greet(&self) -> &'static str {
            "howdy"
        }
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry: Registry<dyn Greeter> = Registry::new();
        assert!(registry.register("greeter", Arc::new(Hello)));
        assert!(!registry.register("greeter", Arc::new(Howdy)));

        assert_eq!(registry.len(), 1);
        let greetings: Vec<_> = registry.iter().map(|(_, g)| g.greet()).collect();
        assert_eq!(greetings, vec!["hello"]);
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut registry: Registry<dyn Greeter> = Registry::new();
        registry.register("FormSpree", Arc::new(Hello));
        assert!(!registry.register("FORMSPREE", Arc::new(Howdy)));

        let (name, _) = registry.iter().next().unwrap();
        assert_eq!(name, "formspree");
        assert_eq!(registry.get("formSPREE").unwrap().greet(), "hello");
    }

    #[test]
    fn test_empty_name_is_a_valid_key() {
        let mut registry: Registry<dyn Greeter> = Registry::default();
        assert!(registry.is_empty());
        assert!(registry.register("", Arc::new(Hello)));
        assert!(registry.get("").is_some());
    }
}
