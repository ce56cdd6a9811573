// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Classification of the paths in a rule tree.
//!
//! A rule tree is a nested mapping where the leaves are type specifications:
//!
//! ```yaml
//! constraints:
//!   energy_cap_max: {type: PositiveFloat, optional: true}
//!   lifetime: {type: PositiveInt, default: 25}
//! ```
//!
//! Every key of a type specification is one of [`TYPE_SPEC_KEYS`].  A path is
//! a *node* if none of its elements is such a reserved key, i.e. it doesn't
//! point inside a type specification.  A node is a *leaf* if its value is a
//! type specification, and a leaf is either *optional* or *mandatory*.

use std::collections::{BTreeMap, BTreeSet};

use serde_yaml::{Mapping, Value};

/// Keys that make up a type specification.  The order is significant.
pub const TYPE_SPEC_KEYS: [&str; 9] = [
    "type",
    "opts",
    "validator",
    "validator_opts",
    "validator_params",
    "root_validator",
    "default",
    "optional",
    // documentation only
    "doc",
];

/// An element of a [`RulePath`]: a mapping key or a sequence index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathKey {
    Key(String),
    Index(usize),
}

impl PathKey {
    /// Returns the key as a string, if it is a mapping key.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathKey::Key(key) => Some(key),
            PathKey::Index(_) => None,
        }
    }

    fn is_reserved(&self) -> bool {
        matches!(self, PathKey::Key(key) if TYPE_SPEC_KEYS.contains(&key.as_str()))
    }

    fn to_value(&self) -> Value {
        match self {
            PathKey::Key(key) => Value::String(key.clone()),
            PathKey::Index(index) => Value::Number((*index as u64).into()),
        }
    }
}

impl std::fmt::Display for PathKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathKey::Key(key) => write!(f, "{key}"),
            PathKey::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        PathKey::Key(key.to_string())
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

/// The path from the root of a document to one of its values.
pub type RulePath = Vec<PathKey>;

/// Renders a path as `a.b.0.c`.
pub fn path_to_string(path: &[PathKey]) -> String {
    path.iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Converts a mapping key to a string.  Rule files use string keys, but YAML
/// allows numbers and booleans too.
pub(crate) fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => format!("{other:?}"),
    }
}

/// Returns true if the path is a node, i.e. it is not the root, and it doesn't
/// point inside a type specification.
pub fn is_node(path: &[PathKey], _value: &Value) -> bool {
    !path.is_empty() && !path.iter().any(PathKey::is_reserved)
}

/// Returns true if the path is a node whose value is a type specification.
pub fn is_leaf(path: &[PathKey], value: &Value) -> bool {
    is_node(path, value)
        && value
            .as_mapping()
            .is_some_and(|m| m.contains_key(TYPE_SPEC_KEYS[0]))
}

/// Returns true if the path is a leaf that is marked as optional.
pub fn is_optional(path: &[PathKey], value: &Value) -> bool {
    is_leaf(path, value) && optional_flag(value)
}

/// Returns true if the path is a leaf that isn't marked as optional.
///
/// This is not the negation of [`is_optional`], because paths that aren't
/// leaves are neither optional nor mandatory.
pub fn is_mandatory(path: &[PathKey], value: &Value) -> bool {
    is_leaf(path, value) && !optional_flag(value)
}

fn optional_flag(value: &Value) -> bool {
    value
        .get(TYPE_SPEC_KEYS[7])
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// The classification of a single path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathClass {
    pub is_node: bool,
    pub is_leaf: bool,
    pub is_optional: bool,
    pub is_mandatory: bool,
}

impl PathClass {
    /// Classifies the given path, whose value is `value`.
    pub fn of(path: &[PathKey], value: &Value) -> Self {
        Self {
            is_node: is_node(path, value),
            is_leaf: is_leaf(path, value),
            is_optional: is_optional(path, value),
            is_mandatory: is_mandatory(path, value),
        }
    }
}

/// Classifies every path in the given tree.
pub fn classify(tree: &Value) -> BTreeMap<RulePath, PathClass> {
    let mut classes = BTreeMap::new();
    walk(tree, &mut vec![], &mut |path, value| {
        classes.insert(path.to_vec(), PathClass::of(path, value));
    });
    classes
}

/// Returns all paths in the tree that pass `test`, in document order.
pub fn paths_if(tree: &Value, test: impl Fn(&[PathKey], &Value) -> bool) -> Vec<RulePath> {
    let mut paths = vec![];
    walk(tree, &mut vec![], &mut |path, value| {
        if test(path, value) {
            paths.push(path.to_vec());
        }
    });
    paths
}

fn walk(value: &Value, path: &mut RulePath, visit: &mut impl FnMut(&[PathKey], &Value)) {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping {
                path.push(PathKey::Key(key_string(key)));
                visit(path, child);
                walk(child, path, visit);
                path.pop();
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathKey::Index(index));
                visit(path, child);
                walk(child, path, visit);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Returns the value at the given path, if it exists.
pub fn lookup<'a>(tree: &'a Value, path: &[PathKey]) -> Option<&'a Value> {
    path.iter().try_fold(tree, |value, key| match (value, key) {
        (Value::Mapping(mapping), PathKey::Key(key)) => mapping
            .iter()
            .find(|(k, _)| key_string(k) == *key)
            .map(|(_, v)| v),
        (Value::Sequence(items), PathKey::Index(index)) => items.get(*index),
        _ => None,
    })
}

fn lookup_mut<'a>(tree: &'a mut Value, path: &[PathKey]) -> Option<&'a mut Value> {
    let mut current = tree;
    for key in path {
        current = match (current, key) {
            (Value::Mapping(mapping), PathKey::Key(key)) => mapping
                .iter_mut()
                .find(|(k, _)| key_string(k) == *key)
                .map(|(_, v)| v)?,
            (Value::Sequence(items), PathKey::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Removes the value at the given path, keeping the order of its siblings.
fn remove_at(tree: &mut Value, path: &[PathKey]) -> Option<Value> {
    let (last, init) = path.split_last()?;
    match (lookup_mut(tree, init)?, last) {
        (Value::Mapping(mapping), PathKey::Key(key)) => {
            let mut removed = None;
            *mapping = std::mem::take(mapping)
                .into_iter()
                .filter_map(|(k, v)| {
                    if removed.is_none() && key_string(&k) == *key {
                        removed = Some(v);
                        None
                    } else {
                        Some((k, v))
                    }
                })
                .collect();
            removed
        }
        (Value::Sequence(items), PathKey::Index(index)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}

/// Inserts a value at the given path, creating intermediate mappings.
fn insert_at(tree: &mut Value, path: &[PathKey], value: Value) {
    let Some((last, init)) = path.split_last() else {
        return;
    };
    let mut current = tree;
    for key in init {
        current = match current {
            Value::Mapping(mapping) => mapping
                .entry(key.to_value())
                .or_insert_with(|| Value::Mapping(Mapping::new())),
            _ => return,
        };
    }
    if let Value::Mapping(mapping) = current {
        mapping.insert(last.to_value(), value);
    }
}

/// From a set of paths, returns the ones with no further branches.
///
/// A path is dropped when another, longer path extends it.
pub fn leaf_subset(paths: impl IntoIterator<Item = RulePath>) -> BTreeSet<RulePath> {
    let paths = paths.into_iter().collect::<Vec<_>>();
    paths
        .iter()
        .filter(|p| {
            !paths
                .iter()
                .any(|q| q.len() > p.len() && q.starts_with(p.as_slice()))
        })
        .cloned()
        .collect()
}

/// Retrieves the given keys from the leaves of the tree, preserving the
/// hierarchy.  Leaves that have none of the keys are left out.
pub fn get_from_leaf(tree: &Value, keys: &[&str]) -> Value {
    let mut picked_tree = Value::Mapping(Mapping::new());
    for path in paths_if(tree, is_leaf) {
        let Some(Value::Mapping(rule)) = lookup(tree, &path) else {
            continue;
        };
        let picked = rule
            .iter()
            .filter(|(k, _)| keys.contains(&key_string(k).as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<Mapping>();
        if !picked.is_empty() {
            insert_at(&mut picked_tree, &path, Value::Mapping(picked));
        }
    }
    picked_tree
}

/// Returns a copy of the tree with the given keys removed from all leaves.
pub fn del_from_leaf(tree: &Value, keys: &[&str]) -> Value {
    let mut stripped = tree.clone();
    for path in paths_if(tree, is_leaf) {
        if let Some(Value::Mapping(rule)) = lookup_mut(&mut stripped, &path) {
            *rule = std::mem::take(rule)
                .into_iter()
                .filter(|(k, _)| !keys.contains(&key_string(k).as_str()))
                .collect();
        }
    }
    stripped
}

/// Returns a copy of the rules, without the optional rules that have no
/// corresponding value in the config.
pub fn resolve_optional(rules: &Value, conf: &Value) -> Value {
    let leaves = paths_if(rules, is_leaf)
        .into_iter()
        .collect::<BTreeSet<_>>();
    let present = paths_if(conf, is_node)
        .into_iter()
        .filter(|p| leaves.contains(p))
        .collect::<BTreeSet<_>>();

    let mut resolved = rules.clone();
    for path in paths_if(rules, is_optional) {
        if !present.contains(&path) {
            tracing::debug!("Dropping unused optional rule: {}", path_to_string(&path));
            remove_at(&mut resolved, &path);
        }
    }
    resolved
}
