// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Nodes and edges, each holding a set of properties.
//!
//! Nodes and edges are created like properties: their attributes form an
//! inheritance hierarchy under a base type.  In addition, every node or edge
//! may list the properties it uses under the `techs` key, optionally with
//! some of their values overridden.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::properties::{AttributeRules, PropertySet};
use crate::rules::merge::merge_values;
use crate::rules::paths::{is_node, key_string, lookup, paths_if, PathKey};
use crate::schema::{render, Record, RecordType, SchemaBuilder};
use crate::Error;

/// Key under which nodes and edges list their properties.
pub(crate) const TECHS_KEY: &str = "techs";

/// A node, with its attributes and properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    name: String,
    attrs: Record,
    techs: BTreeMap<String, Record>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the validated attributes of the node.
    pub fn attrs(&self) -> &Record {
        &self.attrs
    }

    /// Returns the properties of the node, by name.
    pub fn techs(&self) -> &BTreeMap<String, Record> {
        &self.techs
    }
}

/// An edge between two nodes, with its attributes and properties.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    name: String,
    from: String,
    to: String,
    attrs: Record,
    techs: BTreeMap<String, Record>,
}

impl Edge {
    /// Returns the name of the edge, `"{from}_{to}"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn attrs(&self) -> &Record {
        &self.attrs
    }

    pub fn techs(&self) -> &BTreeMap<String, Record> {
        &self.techs
    }
}

/// Validated nodes, in declaration order.
#[derive(Clone, Debug)]
pub struct NodeSet {
    base: Arc<RecordType>,
    nodes: Vec<Node>,
}

impl NodeSet {
    /// Returns the base type that all node types derive from.
    pub fn base_type(&self) -> &Arc<RecordType> {
        &self.base
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(Node::name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl IntoIterator for NodeSet {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Validated edges, in declaration order.
#[derive(Clone, Debug)]
pub struct EdgeSet {
    base: Arc<RecordType>,
    edges: Vec<Edge>,
}

impl EdgeSet {
    /// Returns the base type that all edge types derive from.
    pub fn base_type(&self) -> &Arc<RecordType> {
        &self.base
    }

    /// Returns the edge declared from `from` to `to`.
    pub fn get(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl IntoIterator for EdgeSet {
    type Item = Edge;
    type IntoIter = std::vec::IntoIter<Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.into_iter()
    }
}

/// Node and edge assembly.
impl SchemaBuilder {
    /// Creates nodes from `specs`, a mapping of node names to attribute
    /// values.
    ///
    /// Nodes may inherit attributes from a `parent` node, and are validated
    /// against `attr_rules`.  The properties listed under `techs` are taken
    /// from `properties`, with the given values overridden.  Properties are
    /// not inherited.
    ///
    /// All validation errors are reported together.
    pub fn nodes(
        &mut self,
        attr_rules: &AttributeRules,
        properties: &PropertySet,
        specs: &Value,
    ) -> Result<NodeSet, Error> {
        let specs = spec_mapping("Node specs", specs)?;

        let mut errors = vec![];
        let mut attr_specs = Mapping::new();
        let mut all_techs = vec![];
        for (name, spec) in specs {
            let name = key_string(&name);
            let mut spec = spec_mapping(&name, &spec)?;
            let techs = spec.remove(TECHS_KEY).unwrap_or(Value::Null);
            match specialise(properties, &techs) {
                Ok(techs) => all_techs.push((name.clone(), techs)),
                Err(err) if err.is_validation() => {
                    tracing::error!("Validation failed: node {name}: {err}");
                    errors.push(err.context(&name));
                }
                Err(err) => return Err(err.context(&name)),
            }
            attr_specs.insert(Value::String(name), Value::Mapping(spec));
        }

        let base_name = self.schema_config().base_node_name.clone();
        let attrs = self.attribute_records(attr_rules, attr_specs, &base_name, errors)?;

        let nodes = all_techs
            .into_iter()
            .map(|(name, techs)| {
                let attrs = attr_record(&attrs, &name)?;
                Ok(Node { name, attrs, techs })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(NodeSet {
            base: attrs.base_type().clone(),
            nodes,
        })
    }

    /// Creates edges from `specs`.
    ///
    /// Edge specs are nested by the names of the two nodes an edge connects:
    ///
    /// ```yaml
    /// node1:
    ///   techs: {...}
    ///   node2:
    ///     techs: {...}
    ///     distance: 10
    /// ```
    ///
    /// Each edge is named `"{node1}_{node2}"`, which is also the name other
    /// edges use to inherit from it.  The `techs` of `node1` apply to all its
    /// edges, and are merged with the `techs` of the edge, which take
    /// precedence.  Otherwise edges are created like [nodes][Self::nodes].
    pub fn edges(
        &mut self,
        attr_rules: &AttributeRules,
        properties: &PropertySet,
        specs: &Value,
    ) -> Result<EdgeSet, Error> {
        let specs = spec_mapping("Edge specs", specs)?;

        let mut errors = vec![];
        let mut attr_specs = Mapping::new();
        let mut all_techs = vec![];
        for (from, targets) in specs {
            let from = key_string(&from);
            let mut targets = spec_mapping(&from, &targets)?;
            let shared_techs = targets.remove(TECHS_KEY).unwrap_or(Value::Null);

            for (to, spec) in targets {
                let to = key_string(&to);
                let name = format!("{from}_{to}");
                if attr_specs.contains_key(name.as_str()) {
                    return Err(Error::invalid_edge(format!(
                        "Edge:({from}, {to}) Duplicate edge name: {name}"
                    )));
                }

                let mut spec = spec_mapping(&name, &spec)?;
                let own_techs = spec.remove(TECHS_KEY).unwrap_or(Value::Null);
                let techs = merge_values(&[non_null(&shared_techs), non_null(&own_techs)]);
                match specialise(properties, &techs) {
                    Ok(techs) => all_techs.push((name.clone(), from.clone(), to, techs)),
                    Err(err) if err.is_validation() => {
                        tracing::error!("Validation failed: edge {name}: {err}");
                        errors.push(err.context(&name));
                    }
                    Err(err) => return Err(err.context(&name)),
                }
                attr_specs.insert(Value::String(name), Value::Mapping(spec));
            }
        }

        let base_name = self.schema_config().base_edge_name.clone();
        let attrs = self.attribute_records(attr_rules, attr_specs, &base_name, errors)?;

        let edges = all_techs
            .into_iter()
            .map(|(name, from, to, techs)| {
                let attrs = attr_record(&attrs, &name)?;
                Ok(Edge {
                    name,
                    from,
                    to,
                    attrs,
                    techs,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(EdgeSet {
            base: attrs.base_type().clone(),
            edges,
        })
    }

    /// Runs the attribute specs through the property hierarchy.  Validation
    /// errors are added to `errors`, so that the caller can report them
    /// together with its own.
    fn attribute_records(
        &mut self,
        attr_rules: &AttributeRules,
        specs: Mapping,
        base_name: &str,
        mut errors: Vec<Error>,
    ) -> Result<PropertySet, Error> {
        let attrs =
            match self.properties_with_base(attr_rules, &Value::Mapping(specs), base_name) {
                Ok(attrs) => Some(attrs),
                Err(err) if err.is_validation() => {
                    errors.push(err);
                    None
                }
                Err(err) => return Err(err),
            };
        match attrs {
            Some(attrs) if errors.is_empty() => Ok(attrs),
            _ => Err(Error::aggregate(errors)),
        }
    }
}

/// Looks up the named properties, and applies the given overrides to them.
///
/// Overrides may be given by field name, or nested like the attribute rules
/// of the properties.
fn specialise(properties: &PropertySet, techs: &Value) -> Result<BTreeMap<String, Record>, Error> {
    let techs = spec_mapping(TECHS_KEY, techs)?;
    let mut errors = vec![];
    let mut specialised = BTreeMap::new();
    for (name, overrides) in techs {
        let name = key_string(&name);
        let Some(property) = properties.get(&name) else {
            errors.push(Error::unknown_property(format!("Unknown property: {name}")));
            continue;
        };
        let overrides = field_overrides(properties.attr_rules(), &overrides);
        let record = if overrides.is_empty() {
            Ok(property.clone())
        } else {
            property.with_overrides(&overrides)
        };
        match record {
            Ok(record) => {
                specialised.insert(name, record);
            }
            Err(err) if err.is_validation() => errors.push(err),
            Err(err) => return Err(err),
        }
    }
    if !errors.is_empty() {
        return Err(Error::aggregate(errors));
    }
    Ok(specialised)
}

/// Flattens overrides into a mapping keyed by field name.
fn field_overrides(attr_rules: &AttributeRules, overrides: &Value) -> Mapping {
    let mut flat = Mapping::new();
    for path in paths_if(overrides, is_node) {
        let flat_key = path.len() == 1 && !attr_rules.is_known(&path);
        if !(flat_key || attr_rules.is_leaf(&path)) {
            continue;
        }
        if let (Some(key), Some(value)) = (
            path.last().and_then(PathKey::as_key),
            lookup(overrides, &path),
        ) {
            flat.insert(Value::String(key.to_string()), value.clone());
        }
    }
    flat
}

fn spec_mapping(name: &str, spec: &Value) -> Result<Mapping, Error> {
    match spec {
        Value::Mapping(spec) => Ok(spec.clone()),
        Value::Null => Ok(Mapping::new()),
        other => Err(Error::invalid_rule(format!(
            "{name}: expected a mapping, found {}",
            render(other)
        ))),
    }
}

fn non_null(value: &Value) -> Value {
    match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other.clone(),
    }
}

fn attr_record(attrs: &PropertySet, name: &str) -> Result<Record, Error> {
    attrs
        .get(name)
        .cloned()
        .ok_or_else(|| Error::internal(format!("{name}: attributes not created.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{location_rules, tech_rules, tech_specs, yaml};
    use crate::ErrorKind;

    fn properties(builder: &mut SchemaBuilder) -> Result<PropertySet, Error> {
        builder.properties(&AttributeRules::new(&tech_rules()), &tech_specs())
    }

    #[test]
    fn test_nodes() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let props = properties(&mut builder)?;
        let attrs = AttributeRules::new(&location_rules());
        let nodes = builder.nodes(
            &attrs,
            &props,
            &yaml(
                r#"
                region1:
                  coordinates: {lat: 40, lon: -2}
                  available_area: 100
                  techs:
                    ccgt: {constraints: {energy_cap_max: 30}}
                    demand:
                region2:
                  parent: region1
                  techs:
                    supply: {energy_cap_max: 5}
                "#,
            ),
        )?;

        assert!(nodes.names().eq(["region1", "region2"]));
        assert_eq!(nodes.base_type().name(), "basenode");

        let region1 = nodes.get("region1").ok_or(Error::internal("no region1"))?;
        assert_eq!(region1.attrs().get("available_area"), Some(&yaml("100.0")));
        assert_eq!(
            region1.techs().keys().map(String::as_str).collect::<Vec<_>>(),
            ["ccgt", "demand"]
        );
        assert_eq!(region1.techs()["ccgt"].get("energy_cap_max"), Some(&yaml("30.0")));
        assert_eq!(region1.techs().get("demand"), props.get("demand"));
        assert_eq!(
            props.get("ccgt").and_then(|r| r.get("energy_cap_max")),
            Some(&yaml("10.0"))
        );

        let region2 = nodes.get("region2").ok_or(Error::internal("no region2"))?;
        assert_eq!(region2.attrs().get("available_area"), Some(&yaml("100.0")));
        assert_eq!(
            region2.attrs().record_type().lineage(),
            ["region2", "region1", "basenode"]
        );
        assert_eq!(
            region2.techs().keys().map(String::as_str).collect::<Vec<_>>(),
            ["supply"]
        );
        assert_eq!(region2.techs()["supply"].get("energy_cap_max"), Some(&yaml("5.0")));
        Ok(())
    }

    #[test]
    fn test_node_errors() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let props = properties(&mut builder)?;
        let attrs = AttributeRules::new(&location_rules());

        let err = builder.nodes(
            &attrs,
            &props,
            &yaml(
                r#"
                region1: {techs: {battery: {}}}
                region2: {available_area: -1}
                region3: {techs: {ccgt: {constraints: {energy_eff: 2}}}}
                "#,
            ),
        );
        assert!(err.is_err_and(|e| e.kind() == ErrorKind::AggregateValidation
            && e.desc().contains("region1: Unknown property: battery")
            && e.desc().contains("region2.available_area = -1")
            && e.desc().contains("region3: ccgt.energy_eff = 2")));

        assert!(builder
            .nodes(&attrs, &props, &yaml("{region1: {techs: {battery: {}}}}"))
            .is_err_and(|e| e == Error::unknown_property("region1: Unknown property: battery")));

        assert!(builder
            .nodes(&attrs, &props, &yaml("{region1: {parent: region0}}"))
            .is_err_and(|e| e.kind() == ErrorKind::UnknownParent));
        Ok(())
    }

    #[test]
    fn test_edges() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let props = properties(&mut builder)?;
        let attrs = AttributeRules::new(&location_rules());
        let edges = builder.edges(
            &attrs,
            &props,
            &yaml(
                r#"
                region1:
                  techs:
                    supply: {energy_cap_max: 2}
                    demand:
                  region2:
                    distance: 50
                    techs:
                      supply: {energy_cap_max: 3}
                  region3:
                region2:
                  region3: {parent: region1_region2}
                "#,
            ),
        )?;

        assert_eq!(edges.len(), 3);
        assert_eq!(edges.base_type().name(), "baseedge");

        let edge = edges.get("region1", "region2").ok_or(Error::internal("no edge"))?;
        assert_eq!(edge.name(), "region1_region2");
        assert_eq!(edge.attrs().get("distance"), Some(&yaml("50.0")));
        assert_eq!(edge.techs()["supply"].get("energy_cap_max"), Some(&yaml("3.0")));
        assert!(edge.techs().contains_key("demand"));

        let edge = edges.get("region1", "region3").ok_or(Error::internal("no edge"))?;
        assert_eq!(edge.techs()["supply"].get("energy_cap_max"), Some(&yaml("2.0")));
        assert!(edge.attrs().get("distance").is_none());

        let edge = edges.get("region2", "region3").ok_or(Error::internal("no edge"))?;
        assert_eq!(edge.attrs().get("distance"), Some(&yaml("50.0")));
        assert!(edge.techs().is_empty());
        assert!(edges.get("region3", "region2").is_none());
        Ok(())
    }

    #[test]
    fn test_edge_errors() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let props = properties(&mut builder)?;
        let attrs = AttributeRules::new(&location_rules());

        assert!(builder
            .edges(&attrs, &props, &yaml("{a: {b_c: {}}, a_b: {c: {}}}"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidEdge));
        assert!(builder
            .edges(&attrs, &props, &yaml("{a: {b: {distance: 0}}}"))
            .is_err_and(|e| e.kind() == ErrorKind::FieldValidation
                && e.desc().starts_with("a_b.distance = 0:")));
        assert!(builder
            .edges(&attrs, &props, &yaml("{a: [b, c]}"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));
        Ok(())
    }
}
