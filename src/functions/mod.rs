// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Function registry
//!
//! Holds the client-side functions advertised to the model and dispatches
//! the calls the model requests. Argument payloads arrive as free-form JSON
//! text and are parsed and schema-checked here before any handler runs.

pub mod builtin;
pub mod schema;

pub use schema::SchemaBuilder;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ParleyError, Result};

/// Function definition advertised to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Function name (unique within a registry)
    pub name: String,

    /// Description shown to the model
    pub description: String,

    /// Parameter schema (JSON Schema object)
    pub parameters: Value,
}

/// Handler invoked when the model calls a function
pub type FunctionHandler = Box<dyn Fn(&Value) -> anyhow::Result<String> + Send + Sync>;

/// A registered function: spec plus invocable handler
pub struct FunctionDescriptor {
    spec: FunctionSpec,
    handler: FunctionHandler,
}

impl FunctionDescriptor {
    /// Create a descriptor from its parts
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            spec: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
            handler: Box::new(handler),
        }
    }

    /// The advertised spec
    pub fn spec(&self) -> &FunctionSpec {
        &self.spec
    }

    /// The function name
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("spec", &self.spec)
            .finish()
    }
}

/// Registry of client-side functions, keyed by exact name
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: Vec<FunctionDescriptor>,
}

impl FunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in demo functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin::all() {
            // Names are distinct by construction; register cannot fail here.
            let _ = registry.register(descriptor);
        }
        registry
    }

    /// Register a function
    pub fn register(&mut self, descriptor: FunctionDescriptor) -> Result<()> {
        if self.contains(descriptor.name()) {
            return Err(ParleyError::DuplicateFunction(descriptor.name().to_string()));
        }
        self.functions.push(descriptor);
        Ok(())
    }

    /// Check if a function name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.iter().any(|d| d.name() == name)
    }

    /// Specs of all registered functions, in registration order
    pub fn specs(&self) -> Vec<FunctionSpec> {
        self.functions.iter().map(|d| d.spec.clone()).collect()
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invoke a registered function with the model-supplied argument text.
    ///
    /// The argument text must parse as a JSON object and carry every
    /// property the spec marks as required. Handler failures are wrapped
    /// rather than propagated raw so a misbehaving function cannot take the
    /// session down.
    pub fn invoke(&self, name: &str, arguments_text: &str) -> Result<String> {
        let descriptor = self
            .functions
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| ParleyError::UnknownFunction(name.to_string()))?;

        let arguments = parse_arguments(arguments_text)?;
        check_required(&descriptor.spec.parameters, &arguments)?;

        (descriptor.handler)(&arguments)
            .map_err(|e| ParleyError::FunctionExecution(e.to_string()))
    }
}

/// Parse the provider-supplied argument text into a JSON object.
/// Models sometimes send an empty payload for zero-argument functions.
fn parse_arguments(arguments_text: &str) -> Result<Value> {
    let trimmed = arguments_text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ParleyError::InvalidArguments(format!("malformed JSON: {}", e)))?;

    if !value.is_object() {
        return Err(ParleyError::InvalidArguments(format!(
            "expected a JSON object, got: {}",
            trimmed
        )));
    }

    Ok(value)
}

/// Verify all schema-required properties are present.
fn check_required(parameters: &Value, arguments: &Value) -> Result<()> {
    let Some(required) = parameters.get("required").and_then(Value::as_array) else {
        return Ok(());
    };

    for property in required.iter().filter_map(Value::as_str) {
        if arguments.get(property).is_none() {
            return Err(ParleyError::InvalidArguments(format!(
                "missing required property: {}",
                property
            )));
        }
    }

    Ok(())
}
