// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving specs and their relatives from an
//! [`InheritanceGraph`].

use petgraph::graph::NodeIndex;
use petgraph::Direction;

use crate::Error;

use super::InheritanceGraph;

/// Spec retrieval.
impl InheritanceGraph {
    /// Returns true if a spec with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    /// Returns the number of specs in the graph.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns an iterator over the spec names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graph.raw_nodes().iter().map(|n| n.weight.as_str())
    }

    /// Returns the parent of the spec with the given name.
    ///
    /// Returns an error if the given name does not exist.
    pub fn parent(&self, name: &str) -> Result<Option<&str>, Error> {
        let index = self.index(name)?;
        Ok(self
            .graph
            .neighbors_directed(index, Direction::Incoming)
            .next()
            .map(|i| self.graph[i].as_str()))
    }

    /// Returns the direct children of the spec with the given name, in
    /// declaration order.
    ///
    /// Returns an error if the given name does not exist.
    pub fn children(&self, name: &str) -> Result<Vec<&str>, Error> {
        let index = self.index(name)?;
        Ok(self
            .child_indices(index)
            .into_iter()
            .map(|i| self.graph[i].as_str())
            .collect())
    }

    pub(super) fn index(&self, name: &str) -> Result<NodeIndex, Error> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::node_not_found(format!("Spec {name} not found.")))
    }

    /// Children in declaration order.  `petgraph` lists neighbors most recent
    /// edge first.
    pub(super) fn child_indices(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect::<Vec<_>>();
        children.sort();
        children
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, InheritanceGraph};

    #[test]
    fn test_retrieval() -> Result<(), Error> {
        let graph = InheritanceGraph::try_new([
            ("ccgt", Some("supply")),
            ("supply", None),
            ("demand", None),
            ("pv", Some("supply")),
            ("wind", Some("supply")),
        ])?;

        assert_eq!(graph.len(), 5);
        assert!(graph.contains("pv"));
        assert!(!graph.contains("battery"));
        assert!(graph
            .names()
            .eq(["ccgt", "supply", "demand", "pv", "wind"]));

        assert_eq!(graph.children("supply")?, ["ccgt", "pv", "wind"]);
        assert!(graph.children("demand")?.is_empty());
        assert_eq!(graph.parent("wind")?, Some("supply"));

        assert!(graph
            .parent("battery")
            .is_err_and(|e| e == Error::node_not_found("Spec battery not found.")));
        assert!(graph
            .children("battery")
            .is_err_and(|e| e == Error::node_not_found("Spec battery not found.")));

        Ok(())
    }
}
