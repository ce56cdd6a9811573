// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A graph of the validated nodes of a model, and the edges between them.

mod creation;
pub mod iterators;
mod retrieval;

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::{Edge, Node};

/// `NodeIndexMap` stores the `NodeIndex` of every node name.
pub(crate) type NodeIndexMap = HashMap<String, NodeIndex>;

/// `Edge`s are not stored in the `DiGraph` instance, so we need to store them
/// separately.
///
/// `EdgeMap` can be used to lookup the `Edge` for any pair of source and
/// destination `NodeIndex` values.
pub(crate) type EdgeMap = HashMap<(NodeIndex, NodeIndex), Edge>;

/// The nodes of a model and the edges between them.
///
/// Edges keep the direction they were declared with, but lookups treat them
/// as undirected.
#[derive(Clone, Debug)]
pub struct Network {
    graph: DiGraph<Node, ()>,
    node_indices: NodeIndexMap,
    edges: EdgeMap,
}
