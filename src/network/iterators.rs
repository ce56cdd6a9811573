// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Iterators over nodes and edges in a `Network`.

use std::collections::HashSet;

use petgraph::graph::{DiGraph, NodeIndex};

use crate::{Edge, Network, Node};

/// An iterator over the nodes in a `Network`.
pub struct Nodes<'a> {
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Node<Node>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|n| &n.weight)
    }
}

/// An iterator over the edges in a `Network`.
pub struct Edges<'a> {
    pub(crate) network: &'a Network,
    pub(crate) iter: std::slice::Iter<'a, petgraph::graph::Edge<()>>,
}

impl<'a> Iterator for Edges<'a> {
    type Item = &'a Edge;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter
            .next()
            .and_then(|e| self.network.edges.get(&(e.source(), e.target())))
    }
}

/// An iterator over the neighbors of a node in a `Network`, in either
/// direction.  Each neighbor is returned once.
pub struct Neighbors<'a> {
    pub(crate) graph: &'a DiGraph<Node, ()>,
    pub(crate) iter: petgraph::graph::Neighbors<'a, ()>,
    visited: HashSet<NodeIndex>,
}

impl<'a> Neighbors<'a> {
    pub(crate) fn new(
        graph: &'a DiGraph<Node, ()>,
        iter: petgraph::graph::Neighbors<'a, ()>,
    ) -> Self {
        Neighbors {
            graph,
            iter,
            visited: HashSet::new(),
        }
    }
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        for i in self.iter.by_ref() {
            if !self.visited.insert(i) {
                continue;
            }
            return Some(&self.graph[i]);
        }
        None
    }
}
