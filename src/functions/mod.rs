//! Functions module - model-callable functions
//!
//! This module provides the `Function` trait, the per-agent
//! `FunctionRegistry`, and the `DelegateFunction` used by supervisor agencies.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use parley::functions::{CallContext, FnFunction, FunctionRegistry};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mut registry = FunctionRegistry::new();
//! registry
//!     .register(Arc::new(FnFunction::new(
//!         "shout",
//!         "Upper-case a message",
//!         json!({"properties": {"text": {"type": "string"}}, "required": ["text"]}),
//!         |args| async move {
//!             Ok(json!(args["text"].as_str().unwrap_or_default().to_uppercase()))
//!         },
//!     )))
//!     .unwrap();
//!
//! let out = registry
//!     .call("shout", json!({"text": "hi"}), &CallContext::new())
//!     .await
//!     .unwrap();
//! assert_eq!(out, json!("HI"));
//! # });
//! ```

pub mod delegate;
pub mod registry;
pub mod types;

pub use delegate::{DelegateFunction, DELEGATE_FUNCTION_NAME};
pub use registry::FunctionRegistry;
pub use types::{validate_arguments, CallContext, FnFunction, Function};
