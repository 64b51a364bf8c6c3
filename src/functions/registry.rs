//! Function registry
//!
//! Holds the functions one agent exposes to its model. Names are unique and
//! declaration order is preserved so requests are reproducible.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info};

use crate::error::{ParleyError, Result};
use crate::providers::FunctionSchema;

use super::{CallContext, Function};

/// Registry of the functions available to one agent.
#[derive(Default, Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
    order: Vec<String>,
}

impl FunctionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function.
    ///
    /// Fails with a configuration error if the name is already taken.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use parley::functions::{FnFunction, FunctionRegistry};
    /// use serde_json::json;
    ///
    /// let noop = FnFunction::new("noop", "Does nothing", json!({}), |_| async { Ok(json!(null)) });
    /// let mut registry = FunctionRegistry::new();
    /// registry.register(Arc::new(noop.clone())).unwrap();
    /// assert!(registry.register(Arc::new(noop)).is_err());
    /// ```
    pub fn register(&mut self, function: Arc<dyn Function>) -> Result<()> {
        let name = function.name().to_string();
        if self.functions.contains_key(&name) {
            return Err(ParleyError::Config(format!(
                "Function {} is already registered",
                name
            )));
        }
        info!(function = %name, "Registering function");
        self.order.push(name.clone());
        self.functions.insert(name, function);
        Ok(())
    }

    /// Look up a function by exact name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.get(name)
    }

    /// Whether a function with this name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Schemas of all functions, in declaration order.
    pub fn schemas(&self) -> Vec<FunctionSchema> {
        self.order
            .iter()
            .filter_map(|name| self.functions.get(name))
            .map(|f| f.schema())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Validate and run the named function.
    ///
    /// Fails with `FunctionNotFound` if no function has that name.
    pub async fn call(&self, name: &str, args: Value, ctx: &CallContext) -> Result<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ParleyError::FunctionNotFound(name.to_string()))?;

        let start = Instant::now();

        match function.call(args, ctx).await {
            Ok(output) => {
                info!(
                    function = name,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Function executed successfully"
                );
                Ok(output)
            }
            Err(e) => {
                error!(
                    function = name,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Function execution failed"
                );
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.order)
            .finish()
    }
}
