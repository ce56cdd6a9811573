// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Creation of record types from rules, and validation of configuration
//! values against them.

mod field_type;
mod record;
mod tree;
mod validators;

pub use field_type::{Bounds, FieldType, Pattern};
pub(crate) use tree::NONE_SENTINEL;
pub use record::{synthesize, Field, Record, RecordType};
pub use validators::{
    BoundValidator, ValidationContext, ValidatorFn, ValidatorOpts, ValidatorRegistry,
    ValidatorScope,
};

use serde_yaml::Value;

use crate::{SchemaConfig, Warnings};

/// Turns rules into record types.
///
/// The builder owns the validator functions that rules may refer to by
/// name, and collects the warnings raised while types are created.  Types
/// and records are created by the methods defined in the sibling modules:
///
/// - [`resolve_type`][SchemaBuilder::resolve_type] and
///   [`resolve_validators`][SchemaBuilder::resolve_validators] for single
///   rules,
/// - [`config_type`][SchemaBuilder::config_type] and
///   [`config`][SchemaBuilder::config] for whole rule trees,
/// - [`properties`][SchemaBuilder::properties],
///   [`nodes`][SchemaBuilder::nodes] and [`edges`][SchemaBuilder::edges] for
///   inheritance hierarchies.
pub struct SchemaBuilder {
    config: SchemaConfig,
    registry: ValidatorRegistry,
    pub(crate) warnings: Warnings,
}

impl SchemaBuilder {
    /// Creates a new `SchemaBuilder` with the built-in validators.
    pub fn new(config: SchemaConfig) -> Self {
        Self::with_registry(config, ValidatorRegistry::default())
    }

    /// Creates a new `SchemaBuilder` that resolves validator names with the
    /// given registry.
    pub fn with_registry(config: SchemaConfig, registry: ValidatorRegistry) -> Self {
        Self {
            config,
            registry,
            warnings: Warnings::default(),
        }
    }

    /// Returns the configuration of the builder.
    pub fn schema_config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Returns the validator registry of the builder.
    pub fn registry_mut(&mut self) -> &mut ValidatorRegistry {
        &mut self.registry
    }

    /// Returns the warnings recorded so far.
    pub fn warnings(&self) -> &Warnings {
        &self.warnings
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new(SchemaConfig::default())
    }
}

/// Renders a value for use in error messages.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{s:?}"),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Returns the value as a number, if it is one.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
