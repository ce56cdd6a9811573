// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Hierarchies of properties: named records that inherit attribute values
//! from a parent property.
//!
//! The attributes a property may set are given as a rule tree.  Each property
//! gets its own record type, derived from the type of its parent, or from a
//! base type holding the mandatory attributes.  A property's type only has
//! the fields the property (or one of its ancestors) sets, so two properties
//! may have different fields even when they share a parent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use crate::graph::InheritanceGraph;
use crate::rules::paths::{
    del_from_leaf, get_from_leaf, is_leaf, is_mandatory, is_node, lookup, path_to_string,
    paths_if, PathKey, RulePath,
};
use crate::schema::{
    render, synthesize, BoundValidator, Field, Record, RecordType, SchemaBuilder, NONE_SENTINEL,
};
use crate::Error;

/// Keys of attribute rules that don't affect validation.
const IGNORED_RULE_KEYS: [&str; 3] = ["default", "doc", "scaling_label"];

/// Attribute rules, with the default values separated out.
///
/// Defaults are keyed by the last key of their path, so attribute names are
/// expected to be unique across the rule tree.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRules {
    rules: Value,
    defaults: Mapping,
    leaves: Vec<RulePath>,
}

impl AttributeRules {
    /// Splits the given rule tree into rules and defaults.
    pub fn new(rules: &Value) -> Self {
        let defaults = attr_defaults(rules);
        let rules = del_from_leaf(rules, &IGNORED_RULE_KEYS);
        let leaves = paths_if(&rules, is_leaf);
        Self {
            rules,
            defaults,
            leaves,
        }
    }

    /// Returns the rules, without defaults.
    pub fn rules(&self) -> &Value {
        &self.rules
    }

    /// Returns the default values, keyed by attribute name.
    pub fn defaults(&self) -> &Mapping {
        &self.defaults
    }

    /// Returns the paths of all attribute rules, in document order.
    pub fn leaves(&self) -> &[RulePath] {
        &self.leaves
    }

    pub(crate) fn is_leaf(&self, path: &[PathKey]) -> bool {
        self.leaves.iter().any(|l| l.as_slice() == path)
    }

    /// A path that leads to a rule, or into the value of one, is known.
    pub(crate) fn is_known(&self, path: &[PathKey]) -> bool {
        self.leaves
            .iter()
            .any(|l| l.starts_with(path) || path.starts_with(l))
    }
}

/// Returns the default values of the leaf rules in `rules`, keyed by the
/// last key of their path.  A `_None` default stands for `null`.
pub fn attr_defaults(rules: &Value) -> Mapping {
    let picked = get_from_leaf(rules, &["default"]);
    let mut defaults = Mapping::new();
    for path in paths_if(&picked, |_, v| v.get("default").is_some()) {
        let (Some(key), Some(default)) = (
            path.last().and_then(PathKey::as_key),
            lookup(&picked, &path).and_then(|v| v.get("default")),
        ) else {
            continue;
        };
        let default = match default.as_str() {
            Some(NONE_SENTINEL) => Value::Null,
            _ => default.clone(),
        };
        defaults.insert(Value::String(key.to_string()), default);
    }
    defaults
}

/// A set of validated properties.
#[derive(Clone, Debug)]
pub struct PropertySet {
    attr_rules: AttributeRules,
    base: Arc<RecordType>,
    order: Vec<String>,
    records: HashMap<String, Record>,
}

impl PropertySet {
    /// Returns the attribute rules the properties were created from.
    pub fn attr_rules(&self) -> &AttributeRules {
        &self.attr_rules
    }

    /// Returns the base type that all the properties derive from.
    pub fn base_type(&self) -> &Arc<RecordType> {
        &self.base
    }

    pub fn get(&self, name: &str) -> Option<&Record> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Returns the property names, parents before their children.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Returns the properties, parents before their children.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Record)> {
        self.order
            .iter()
            .filter_map(|n| self.records.get(n).map(|r| (n.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Property hierarchies.
impl SchemaBuilder {
    /// Creates and validates a hierarchy of properties.
    ///
    /// `specs` maps property names to attribute values; a property may name
    /// another one as its `parent`.  A property's values are made of its
    /// parent's values, the defaults of any other attributes its type has,
    /// and its own values, the later taking precedence.
    ///
    /// Missing parents and cycles are reported before any type is created.
    /// Validation failures are reported together, and the descendants of a
    /// property that failed are reported as failed too.
    pub fn properties(
        &mut self,
        attr_rules: &AttributeRules,
        specs: &Value,
    ) -> Result<PropertySet, Error> {
        let base_name = self.schema_config().base_property_name.clone();
        self.properties_with_base(attr_rules, specs, &base_name)
    }

    pub(crate) fn properties_with_base(
        &mut self,
        attr_rules: &AttributeRules,
        specs: &Value,
        base_name: &str,
    ) -> Result<PropertySet, Error> {
        let specs = match specs {
            Value::Mapping(specs) => specs.clone(),
            Value::Null => Mapping::new(),
            other => {
                return Err(Error::invalid_rule(format!(
                    "Specs must be a mapping, found {}",
                    render(other)
                )))
            }
        };
        let graph = InheritanceGraph::from_specs(&specs)?;
        let base = Arc::new(self.base_type(attr_rules, base_name)?);

        let mut records: HashMap<String, Record> = HashMap::new();
        let mut order = vec![];
        let mut failed = HashSet::new();
        let mut errors = vec![];

        for name in graph.topological_order() {
            let parent = graph.parent(name)?;
            if let Some(parent) = parent.filter(|p| failed.contains(*p)) {
                tracing::error!("Validation failed: {name}: parent {parent} failed");
                errors.push(Error::record_validation(format!(
                    "{name}: parent '{parent}' failed validation"
                )));
                failed.insert(name);
                continue;
            }

            let spec = match specs.get(name) {
                Some(Value::Mapping(spec)) => spec.clone(),
                None | Some(Value::Null) => Mapping::new(),
                Some(other) => {
                    return Err(Error::invalid_rule(format!(
                        "{name}: spec must be a mapping, found {}",
                        render(other)
                    )))
                }
            };
            let (base_type, inherited) = match parent {
                Some(parent) => {
                    let record = records.get(parent).ok_or_else(|| {
                        Error::internal(format!("{name}: parent {parent} not created yet."))
                    })?;
                    (record.record_type().clone(), record.values().clone())
                }
                None => (base.clone(), Mapping::new()),
            };

            let (fields, validators, own) = self.spec_fields(name, attr_rules, &spec)?;
            let prop_type = Arc::new(synthesize(name, fields, validators, Some(&*base_type))?);

            let mut values = inherited;
            for field in prop_type.fields() {
                if values.contains_key(field.name()) {
                    continue;
                }
                if let Some(default) = attr_rules.defaults().get(field.name()) {
                    values.insert(Value::String(field.name().to_string()), default.clone());
                }
            }
            for (k, v) in own {
                values.insert(k, v);
            }

            match prop_type.instantiate(values) {
                Ok(record) => {
                    tracing::debug!("Created property {name}.");
                    records.insert(name.to_string(), record);
                    order.push(name.to_string());
                }
                Err(err) if err.is_validation() => {
                    tracing::error!("Validation failed: {name}: {err}");
                    errors.push(err);
                    failed.insert(name);
                }
                Err(err) => return Err(err),
            }
        }

        if !errors.is_empty() {
            return Err(Error::aggregate(errors));
        }
        Ok(PropertySet {
            attr_rules: attr_rules.clone(),
            base,
            order,
            records,
        })
    }

    /// The base type has a field for every mandatory attribute.
    fn base_type(&mut self, attr_rules: &AttributeRules, name: &str) -> Result<RecordType, Error> {
        let mut fields = vec![];
        let mut validators = vec![];
        for path in paths_if(attr_rules.rules(), is_mandatory) {
            let (field, field_validators) = self.attribute_field(attr_rules, &path)?;
            fields.push(field);
            validators.extend(field_validators);
        }
        synthesize(name, fields, validators, None)
    }

    /// Returns the fields for the attributes set in `spec`, their
    /// validators, and the values of the attributes keyed by field name.
    fn spec_fields(
        &mut self,
        name: &str,
        attr_rules: &AttributeRules,
        spec: &Mapping,
    ) -> Result<(Vec<Field>, Vec<BoundValidator>, Mapping), Error> {
        let spec_value = Value::Mapping(spec.clone());
        let mut fields = vec![];
        let mut validators = vec![];
        let mut values = Mapping::new();
        let mut unknown: Vec<RulePath> = vec![];

        for path in paths_if(&spec_value, is_node) {
            if path.len() == 1 && path[0].as_key() == Some(crate::graph::PARENT_KEY) {
                continue;
            }
            if attr_rules.is_leaf(&path) {
                let (field, field_validators) = self.attribute_field(attr_rules, &path)?;
                if let Some(value) = lookup(&spec_value, &path) {
                    values.insert(Value::String(field.name().to_string()), value.clone());
                }
                fields.push(field);
                validators.extend(field_validators);
            } else if !attr_rules.is_known(&path) && !unknown.iter().any(|u| path.starts_with(u)) {
                unknown.push(path);
            }
        }

        for path in unknown {
            let msg = format!("{name}: unknown attribute '{}'", path_to_string(&path));
            if self.schema_config().deny_unknown_attributes {
                return Err(Error::invalid_rule(msg));
            }
            self.warnings.push(format!("{msg} ignored"));
        }

        Ok((fields, validators, values))
    }

    fn attribute_field(
        &mut self,
        attr_rules: &AttributeRules,
        path: &[PathKey],
    ) -> Result<(Field, Vec<BoundValidator>), Error> {
        let key = path.last().and_then(PathKey::as_key).ok_or_else(|| {
            Error::invalid_rule(format!("{}: not an attribute name", path_to_string(path)))
        })?;
        match lookup(attr_rules.rules(), path) {
            Some(Value::Mapping(rule)) => self.field_from_rule(key, rule),
            _ => Err(Error::internal(format!(
                "{}: attribute rule not found",
                path_to_string(path)
            ))),
        }
    }
}
