// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains methods that walk the inheritance hierarchy.

use std::collections::BTreeSet;

use petgraph::Direction;

use crate::Error;

use super::InheritanceGraph;

/// Traversal methods.
impl InheritanceGraph {
    /// Returns all spec names, parents before their children.
    ///
    /// Among specs whose parents are already listed, the one declared first
    /// comes first.
    pub fn topological_order(&self) -> Vec<&str> {
        let mut in_degrees = self
            .graph
            .node_indices()
            .map(|i| self.graph.neighbors_directed(i, Direction::Incoming).count())
            .collect::<Vec<_>>();
        let mut ready = self
            .graph
            .node_indices()
            .filter(|i| in_degrees[i.index()] == 0)
            .collect::<BTreeSet<_>>();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(index) = ready.pop_first() {
            order.push(self.graph[index].as_str());
            for child in self.child_indices(index) {
                in_degrees[child.index()] -= 1;
                if in_degrees[child.index()] == 0 {
                    ready.insert(child);
                }
            }
        }
        order
    }

    /// Returns the ancestors of the spec with the given name, closest first.
    ///
    /// Returns an error if the given name does not exist.
    pub fn ancestors(&self, name: &str) -> Result<Vec<&str>, Error> {
        let mut ancestors = vec![];
        let mut current = self.parent(name)?;
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.parent(parent)?;
        }
        Ok(ancestors)
    }

    /// Returns all the descendants of the spec with the given name, parents
    /// before their children.
    ///
    /// Returns an error if the given name does not exist.
    pub fn descendants(&self, name: &str) -> Result<Vec<&str>, Error> {
        let mut stack = vec![self.index(name)?];
        let mut found = BTreeSet::new();
        while let Some(index) = stack.pop() {
            for child in self.child_indices(index) {
                if found.insert(child) {
                    stack.push(child);
                }
            }
        }
        Ok(self
            .topological_order()
            .into_iter()
            .filter(|n| self.node_indices.get(*n).is_some_and(|i| found.contains(i)))
            .collect())
    }
}
