// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving nodes and edges from a [`Network`].

use super::iterators::{Edges, Neighbors, Nodes};
use crate::{Edge, Error, Network, Node};

/// `Node` and `Edge` retrieval.
impl Network {
    /// Returns the node with the given name, if it exists.
    pub fn node(&self, name: &str) -> Result<&Node, Error> {
        self.node_indices
            .get(name)
            .map(|i| &self.graph[*i])
            .ok_or_else(|| Error::node_not_found(format!("Node {name} not found.")))
    }

    /// Returns an iterator over the nodes in the network.
    pub fn nodes(&self) -> Nodes {
        Nodes {
            iter: self.graph.raw_nodes().iter(),
        }
    }

    /// Returns an iterator over the edges in the network.
    pub fn edges(&self) -> Edges {
        Edges {
            network: self,
            iter: self.graph.raw_edges().iter(),
        }
    }

    /// Returns the edge between the two nodes, declared in either direction.
    ///
    /// When edges were declared in both directions, the one from `a` to `b`
    /// is returned.
    pub fn edge(&self, a: &str, b: &str) -> Result<Option<&Edge>, Error> {
        let (a_idx, b_idx) = (self.index(a)?, self.index(b)?);
        Ok(self
            .edges
            .get(&(a_idx, b_idx))
            .or_else(|| self.edges.get(&(b_idx, a_idx))))
    }

    /// Returns an iterator over the nodes connected to the node with the given
    /// name.
    ///
    /// Returns an error if the given name does not exist.
    pub fn neighbors(&self, name: &str) -> Result<Neighbors, Error> {
        let index = self.index(name)?;
        Ok(Neighbors::new(&self.graph, self.graph.neighbors_undirected(index)))
    }

    fn index(&self, name: &str) -> Result<petgraph::graph::NodeIndex, Error> {
        self.node_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::node_not_found(format!("Node {name} not found.")))
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{location_rules, tech_rules, tech_specs, yaml};
    use crate::{AttributeRules, Error, ErrorKind, Network, SchemaBuilder};

    fn network(edges: &str) -> Result<Network, Error> {
        let mut builder = SchemaBuilder::default();
        let props = builder.properties(&AttributeRules::new(&tech_rules()), &tech_specs())?;
        let attrs = AttributeRules::new(&location_rules());
        let nodes = builder.nodes(
            &attrs,
            &props,
            &yaml("{r1: {techs: {supply: null}}, r2: {}, r3: {}, r4: {}}"),
        )?;
        let edges = builder.edges(&attrs, &props, &yaml(edges))?;
        Network::try_new(nodes, edges)
    }

    #[test]
    fn test_retrieval() -> Result<(), Error> {
        let network = network("{r1: {r2: {distance: 3}, r3: null}, r3: {r1: null, r2: null}}")?;

        assert!(network.nodes().map(|n| n.name()).eq(["r1", "r2", "r3", "r4"]));
        assert!(network.node("r1")?.techs().contains_key("supply"));
        assert!(network
            .node("r9")
            .is_err_and(|e| e == Error::node_not_found("Node r9 not found.")));

        assert_eq!(network.edges().count(), 4);
        let edge = network.edge("r2", "r1")?.ok_or(Error::internal("no edge"))?;
        assert_eq!(edge.name(), "r1_r2");
        assert_eq!(edge.attrs().get("distance"), Some(&yaml("3.0")));
        assert_eq!(network.edge("r1", "r3")?.map(|e| e.name()), Some("r1_r3"));
        assert_eq!(network.edge("r3", "r1")?.map(|e| e.name()), Some("r3_r1"));
        assert!(network.edge("r1", "r4")?.is_none());

        let mut neighbors = network.neighbors("r1")?.map(|n| n.name()).collect::<Vec<_>>();
        neighbors.sort();
        assert_eq!(neighbors, ["r2", "r3"]);
        let mut neighbors = network.neighbors("r2")?.map(|n| n.name()).collect::<Vec<_>>();
        neighbors.sort();
        assert_eq!(neighbors, ["r1", "r3"]);
        assert_eq!(network.neighbors("r4")?.count(), 0);

        Ok(())
    }

    #[test]
    fn test_invalid_edges() {
        assert!(network("{r1: {r1: null}}").is_err_and(|e| e
            == Error::invalid_edge("Edge:(r1, r1) Can't connect a node to itself.")));
        assert!(network("{r1: {r5: null}}").is_err_and(|e| e
            == Error::invalid_edge("Edge:(r1, r5) Can't find a node named r5")));
        assert!(network("{r5: {r1: null}}").is_err_and(|e| e.kind() == ErrorKind::InvalidEdge));
    }
}
