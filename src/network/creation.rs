// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for creating [`Network`] instances from given nodes and edges.

use petgraph::graph::DiGraph;

use crate::{Edge, Error, Node};

use super::{EdgeMap, Network, NodeIndexMap};

/// `Network` instantiation.
impl Network {
    /// Creates a new [`Network`] from the given nodes and edges.
    ///
    /// Returns an error if a node name is repeated, or if an edge connects a
    /// node to itself, or to a node that doesn't exist.
    pub fn try_new<
        NodeIterator: IntoIterator<Item = Node>,
        EdgeIterator: IntoIterator<Item = Edge>,
    >(
        nodes: NodeIterator,
        edges: EdgeIterator,
    ) -> Result<Self, Error> {
        let (graph, indices) = Self::create_graph(nodes)?;

        let mut network = Self {
            graph,
            node_indices: indices,
            edges: EdgeMap::new(),
        };
        network.add_edges(edges)?;

        tracing::debug!(
            "Created network with {} nodes and {} edges.",
            network.graph.node_count(),
            network.edges.len()
        );
        Ok(network)
    }

    fn create_graph(
        nodes: impl IntoIterator<Item = Node>,
    ) -> Result<(DiGraph<Node, ()>, NodeIndexMap), Error> {
        let mut graph = DiGraph::new();
        let mut indices = NodeIndexMap::new();

        for node in nodes {
            let name = node.name().to_string();
            if indices.contains_key(&name) {
                return Err(Error::invalid_rule(format!("Duplicate node name found: {name}")));
            }
            let idx = graph.add_node(node);
            indices.insert(name, idx);
        }

        Ok((graph, indices))
    }

    fn add_edges(&mut self, edges: impl IntoIterator<Item = Edge>) -> Result<(), Error> {
        for edge in edges {
            let (from, to) = (edge.from(), edge.to());
            if from == to {
                return Err(Error::invalid_edge(format!(
                    "Edge:({from}, {to}) Can't connect a node to itself."
                )));
            }
            let index = |name: &str| {
                self.node_indices.get(name).copied().ok_or_else(|| {
                    Error::invalid_edge(format!(
                        "Edge:({from}, {to}) Can't find a node named {name}"
                    ))
                })
            };
            let (from_idx, to_idx) = (index(from)?, index(to)?);

            self.graph.update_edge(from_idx, to_idx, ());
            self.edges.insert((from_idx, to_idx), edge);
        }

        Ok(())
    }
}
