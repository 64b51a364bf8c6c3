//! Function types and traits
//!
//! This module defines the core `Function` trait that all model-callable
//! functions implement, plus the context passed to each invocation.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::error::{ParleyError, Result};
use crate::providers::FunctionSchema;

/// Context for a single function invocation.
///
/// Carries the delegation depth of the conversation that requested the call
/// and the name of the agent running that conversation.
///
/// # Example
/// ```
/// use parley::functions::CallContext;
///
/// let ctx = CallContext::new().with_agent("Supervisor");
/// assert_eq!(ctx.depth, 0);
/// assert_eq!(ctx.agent.as_deref(), Some("Supervisor"));
/// assert_eq!(ctx.nested().depth, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// How many delegation hops separate this conversation from the caller
    pub depth: usize,
    /// Agent whose conversation requested the call
    pub agent: Option<String>,
}

impl CallContext {
    /// Create a top-level context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the calling agent.
    pub fn with_agent(mut self, agent: &str) -> Self {
        self.agent = Some(agent.to_string());
        self
    }

    /// Set the delegation depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// The same context one delegation hop deeper.
    pub fn nested(&self) -> Self {
        Self {
            depth: self.depth + 1,
            agent: self.agent.clone(),
        }
    }
}

/// Trait for model-callable functions.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use parley::error::Result;
/// use parley::functions::{CallContext, Function};
/// use serde_json::{json, Value};
///
/// struct Add;
///
/// #[async_trait]
/// impl Function for Add {
///     fn name(&self) -> &str { "add" }
///     fn description(&self) -> &str { "Add two numbers" }
///     fn parameters(&self) -> Value {
///         json!({
///             "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
///             "required": ["a", "b"]
///         })
///     }
///     async fn perform(&self, args: Value, _ctx: &CallContext) -> Result<Value> {
///         let a = args["a"].as_f64().unwrap_or_default();
///         let b = args["b"].as_f64().unwrap_or_default();
///         Ok(json!(a + b))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let ctx = CallContext::new();
/// assert_eq!(Add.call(json!({"a": 1, "b": 2}), &ctx).await.unwrap(), json!(3.0));
/// assert!(Add.call(json!({"a": 1}), &ctx).await.is_err());
/// # });
/// ```
#[async_trait]
pub trait Function: Send + Sync {
    /// Unique name within one agent.
    fn name(&self) -> &str;

    /// Description shown to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the parameters object.
    fn parameters(&self) -> Value;

    /// Run the function. Arguments have already been validated by `call`.
    async fn perform(&self, args: Value, ctx: &CallContext) -> Result<Value>;

    /// Provider-neutral declaration of this function.
    fn schema(&self) -> FunctionSchema {
        FunctionSchema::new(self.name(), self.description(), self.parameters())
    }

    /// Validate `args` against the schema, then run `perform`.
    ///
    /// Missing required keys fail with `InvalidArguments` and the handler is
    /// never invoked.
    async fn call(&self, args: Value, ctx: &CallContext) -> Result<Value> {
        validate_arguments(&self.schema(), &args)?;
        self.perform(args, ctx).await
    }
}

/// Check that `args` is an object holding every required key of `schema`.
///
/// # Example
/// ```
/// use parley::functions::validate_arguments;
/// use parley::providers::FunctionSchema;
/// use serde_json::json;
///
/// let schema = FunctionSchema::new("f", "d", json!({"required": ["a", "b"]}));
/// let err = validate_arguments(&schema, &json!({})).unwrap_err();
/// assert_eq!(err.to_string(), "Invalid arguments: missing keywords: a, b");
/// ```
pub fn validate_arguments(schema: &FunctionSchema, args: &Value) -> Result<()> {
    let object = match args {
        Value::Object(map) => map,
        Value::Null => return check_missing(schema.required()),
        other => {
            return Err(ParleyError::InvalidArguments(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    let missing: Vec<&str> = schema
        .required()
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .collect();
    check_missing(missing)
}

fn check_missing(missing: Vec<&str>) -> Result<()> {
    match missing.len() {
        0 => Ok(()),
        1 => Err(ParleyError::InvalidArguments(format!(
            "missing keyword: {}",
            missing[0]
        ))),
        _ => Err(ParleyError::InvalidArguments(format!(
            "missing keywords: {}",
            missing.join(", ")
        ))),
    }
}

type Handler = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// A function backed by an async closure.
///
/// # Example
/// ```
/// use parley::functions::{CallContext, FnFunction, Function};
/// use serde_json::json;
///
/// let weather = FnFunction::new(
///     "get_weather",
///     "Current weather for a city",
///     json!({"properties": {"city": {"type": "string"}}, "required": ["city"]}),
///     |args| async move { Ok(json!({"city": args["city"], "sky": "clear"})) },
/// );
/// assert_eq!(weather.name(), "get_weather");
///
/// # tokio_test::block_on(async {
/// let out = weather.call(json!({"city": "Oslo"}), &CallContext::new()).await.unwrap();
/// assert_eq!(out["sky"], "clear");
/// # });
/// ```
#[derive(Clone)]
pub struct FnFunction {
    name: String,
    description: String,
    parameters: Value,
    handler: Arc<Handler>,
}

impl FnFunction {
    pub fn new<F, Fut>(name: &str, description: &str, parameters: Value, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
            handler: Arc::new(move |args| handler(args).boxed()),
        }
    }
}

impl std::fmt::Debug for FnFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFunction")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Function for FnFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> Value {
        self.parameters.clone()
    }

    async fn perform(&self, args: Value, _ctx: &CallContext) -> Result<Value> {
        (self.handler)(args).await
    }
}
