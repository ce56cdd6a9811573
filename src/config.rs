// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the configuration options for the `SchemaBuilder`.

use std::path::PathBuf;

/// Configuration options for the `SchemaBuilder`.
#[derive(Clone, Debug)]
pub struct SchemaConfig {
    /// Directory that `ConfFilePath` fields are resolved against.  When this
    /// is `None`, paths are resolved against the working directory, and a
    /// warning is recorded for every `ConfFilePath` rule.
    pub confdir: Option<PathBuf>,

    /// Name of the base type that all properties inherit from.
    pub base_property_name: String,

    /// Name of the base type that all nodes inherit from.
    pub base_node_name: String,

    /// Name of the base type that all edges inherit from.
    pub base_edge_name: String,

    /// Whether property, node or edge specs may contain keys that match none
    /// of the attribute rules.  When this is `false`, such keys are dropped
    /// with a warning.
    pub deny_unknown_attributes: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            confdir: None,
            base_property_name: "baseprop".to_string(),
            base_node_name: "basenode".to_string(),
            base_edge_name: "baseedge".to_string(),
            deny_unknown_attributes: false,
        }
    }
}
