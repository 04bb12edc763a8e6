//! Step Registry - Config-driven step creation
//!
//! The registry maps function type names to factories, so a
//! `[[functions]]` entry in the config becomes a boxed [`Step`].
//!
//! # Example
//!
//! ```ignore
//! let registry = default_registry();
//! let steps = registry.build_steps(&config.functions)?;
//! let chain = Chain::new(steps);
//! ```

use std::collections::HashMap;

use ferry_config::FunctionInstanceConfig;

use crate::{Step, TransformError, TransformResult};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Factory trait for creating steps from config
pub trait StepFactory: Send + Sync {
    /// Create a step instance
    ///
    /// # Errors
    /// Returns `TransformError::Config` if configuration is invalid
    fn create(&self, config: &FunctionInstanceConfig) -> TransformResult<Box<dyn Step>>;

    /// Type name this factory builds (for error messages)
    fn name(&self) -> &'static str;

    /// Default options for this function type
    fn default_config(&self) -> Option<HashMap<String, toml::Value>> {
        None
    }
}

/// Registry of step factories keyed by function type
pub struct StepRegistry {
    factories: HashMap<String, Box<dyn StepFactory>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory
    ///
    /// # Panics
    /// Panics if a factory is already registered with this name.
    /// Use `try_register` for fallible registration.
    pub fn register<F: StepFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if self.factories.contains_key(type_name) {
            panic!("Step factory '{}' already registered", type_name);
        }
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    /// Try to register a factory
    ///
    /// Returns `false` if a factory is already registered with this name.
    pub fn try_register<F: StepFactory + 'static>(&mut self, type_name: &str, factory: F) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories.insert(type_name.to_string(), Box::new(factory));
        true
    }

    /// Create a step from a function instance config
    ///
    /// # Errors
    /// - `TransformError::UnknownType` if the type is not registered
    /// - `TransformError::Config` if the factory rejects the config
    pub fn create(&self, config: &FunctionInstanceConfig) -> TransformResult<Box<dyn Step>> {
        let factory = self
            .factories
            .get(&config.function_type)
            .ok_or_else(|| TransformError::UnknownType {
                function_type: config.function_type.clone(),
                available: self.available_types().join(", "),
            })?;

        factory.create(config)
    }

    /// Build steps for every enabled function, in order
    pub fn build_steps(
        &self,
        configs: &[FunctionInstanceConfig],
    ) -> TransformResult<Vec<Box<dyn Step>>> {
        configs
            .iter()
            .filter(|c| c.enabled)
            .map(|c| self.create(c))
            .collect()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered function types, sorted
    pub fn available_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        types.sort_unstable();
        types
    }

    /// Default options for a function type
    pub fn default_config(&self, type_name: &str) -> Option<HashMap<String, toml::Value>> {
        self.factories.get(type_name).and_then(|f| f.default_config())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory for [`NoopStep`](crate::NoopStep)
pub struct NoopFactory;

impl StepFactory for NoopFactory {
    fn create(&self, config: &FunctionInstanceConfig) -> TransformResult<Box<dyn Step>> {
        Ok(Box::new(crate::noop::NoopStep::from_config(config)))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Create a registry with all built-in function types
///
/// - `noop` - pass-through
/// - `filter` - drop or keep events by condition
pub fn default_registry() -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.register("noop", NoopFactory);
    registry.register("filter", crate::filter::FilterFactory);
    registry
}
