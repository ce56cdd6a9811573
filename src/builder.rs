// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Building whole models from rule and config files.

use std::path::Path;

use serde_yaml::Value;

use crate::properties::{AttributeRules, PropertySet};
use crate::rules::merge::{merge_files, read_json, read_yaml};
use crate::schema::{Record, SchemaBuilder};
use crate::{EdgeSet, Error, Network, NodeSet, SchemaConfig, Warnings};

/// Builds the properties, nodes and edges of a model, step by step.
///
/// Every step reads one or more files, which are merged in order, so that
/// later files can override parts of earlier ones.  Files ending in `.json`
/// are read as JSON, all others as YAML.
pub struct ModelBuilder {
    schema: SchemaBuilder,
    attrs: AttributeRules,
    properties: Option<PropertySet>,
    nodes: Option<NodeSet>,
    edges: Option<EdgeSet>,
    network: Option<Network>,
}

impl ModelBuilder {
    /// Creates a `ModelBuilder` from the attribute rules of the properties.
    pub fn from_rule_files<P: AsRef<Path>>(
        rule_files: &[P],
        config: SchemaConfig,
    ) -> Result<Self, Error> {
        let rules = merge_files(rule_files, read_document)?;
        Ok(Self::new(&rules, config))
    }

    /// Creates a `ModelBuilder` from a rule tree that is already loaded.
    pub fn new(rules: &Value, config: SchemaConfig) -> Self {
        Self {
            schema: SchemaBuilder::new(config),
            attrs: AttributeRules::new(rules),
            properties: None,
            nodes: None,
            edges: None,
            network: None,
        }
    }

    /// Creates the properties, from the merged property specs in `confs`.
    ///
    /// Any nodes and edges created before are dropped, as they refer to the
    /// old properties.
    pub fn make_properties<P: AsRef<Path>>(&mut self, confs: &[P]) -> Result<&PropertySet, Error> {
        let specs = merge_files(confs, read_document)?;
        let properties = self.schema.properties(&self.attrs, &specs)?;
        self.nodes = None;
        self.edges = None;
        self.network = None;
        Ok(&*self.properties.insert(properties))
    }

    /// Creates the nodes, validating their attributes with the rules in
    /// `attr_files`.
    pub fn add_nodes<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        attr_files: &[P],
        confs: &[Q],
    ) -> Result<&NodeSet, Error> {
        let attrs = AttributeRules::new(&merge_files(attr_files, read_document)?);
        let specs = merge_files(confs, read_document)?;
        let properties = self.properties.as_ref().ok_or_else(|| {
            Error::invalid_rule("Properties must be created before nodes.")
        })?;
        let nodes = self.schema.nodes(&attrs, properties, &specs)?;
        self.network = None;
        Ok(&*self.nodes.insert(nodes))
    }

    /// Creates the edges, validating their attributes with the rules in
    /// `attr_files`.
    pub fn add_edges<P: AsRef<Path>, Q: AsRef<Path>>(
        &mut self,
        attr_files: &[P],
        confs: &[Q],
    ) -> Result<&EdgeSet, Error> {
        let attrs = AttributeRules::new(&merge_files(attr_files, read_document)?);
        let specs = merge_files(confs, read_document)?;
        let properties = self.properties.as_ref().ok_or_else(|| {
            Error::invalid_rule("Properties must be created before edges.")
        })?;
        let edges = self.schema.edges(&attrs, properties, &specs)?;
        self.network = None;
        Ok(&*self.edges.insert(edges))
    }

    pub fn properties(&self) -> Option<&PropertySet> {
        self.properties.as_ref()
    }

    pub fn nodes(&self) -> Option<&NodeSet> {
        self.nodes.as_ref()
    }

    pub fn edges(&self) -> Option<&EdgeSet> {
        self.edges.as_ref()
    }

    /// Returns the network of the nodes and edges created so far.
    ///
    /// The network is created on first use, and again after nodes or edges
    /// change.
    pub fn network(&mut self) -> Result<&Network, Error> {
        if self.network.is_none() {
            let nodes = self.nodes.clone().ok_or_else(|| {
                Error::invalid_rule("Nodes must be created before the network.")
            })?;
            let edges = self.edges.iter().flat_map(|e| e.iter().cloned()).collect::<Vec<_>>();
            self.network = Some(Network::try_new(nodes, edges)?);
        }
        self.network
            .as_ref()
            .ok_or_else(|| Error::internal("Network not created."))
    }

    /// Returns the warnings recorded so far.
    pub fn warnings(&self) -> &Warnings {
        self.schema.warnings()
    }
}

/// Validates the merged config files against the merged rule files.
pub fn config_from_files<P: AsRef<Path>, Q: AsRef<Path>>(
    rule_files: &[P],
    conf_files: &[Q],
    config: SchemaConfig,
) -> Result<Record, Error> {
    let rules = merge_files(rule_files, read_document)?;
    let conf = merge_files(conf_files, read_document)?;
    SchemaBuilder::new(config).config(&rules, &conf)
}

fn read_document(path: &Path) -> Result<Value, Error> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => read_json(path),
        _ => read_yaml(path),
    }
}
