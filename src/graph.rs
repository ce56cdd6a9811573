// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph of the inheritance relationships between named specs, where every
//! spec may name one other spec as its `parent`.

mod creation;
mod retrieval;
mod traversal;
mod validation;

pub(crate) use creation::PARENT_KEY;

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// `NodeIndexMap` stores the `NodeIndex` of every spec name, so that nodes in
/// the `DiGraph` can be retrieved by name.
pub(crate) type NodeIndexMap = HashMap<String, NodeIndex>;

/// The inheritance hierarchy of a set of specs.
///
/// Edges point from a parent to its children.  A graph can only be created
/// when all parents exist and there are no cycles, so every spec has a finite
/// chain of ancestors.  Node indices follow declaration order.
#[derive(Clone, Debug)]
pub struct InheritanceGraph {
    graph: DiGraph<String, ()>,
    node_indices: NodeIndexMap,
}
