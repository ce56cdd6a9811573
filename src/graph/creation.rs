// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for creating [`InheritanceGraph`] instances from spec names and
//! their parents.

use petgraph::graph::DiGraph;
use serde_yaml::{Mapping, Value};

use crate::rules::paths::key_string;
use crate::Error;

use super::{InheritanceGraph, NodeIndexMap};

/// Key that names the parent of a spec.
pub(crate) const PARENT_KEY: &str = "parent";

/// `InheritanceGraph` instantiation.
impl InheritanceGraph {
    /// Creates a new [`InheritanceGraph`] from `(name, parent)` pairs, in
    /// declaration order.
    ///
    /// Returns an error if a name is repeated, a parent doesn't exist, or the
    /// parents form a cycle.
    pub fn try_new<I, S>(specs: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (S, Option<S>)>,
        S: Into<String>,
    {
        let specs = specs
            .into_iter()
            .map(|(name, parent)| (name.into(), parent.map(Into::into)))
            .collect::<Vec<(String, Option<String>)>>();

        let (graph, node_indices) = Self::create_graph(&specs)?;
        let mut ig = Self {
            graph,
            node_indices,
        };
        ig.add_parents(&specs)?;

        ig.validate_acyclicity()?;

        Ok(ig)
    }

    /// Creates a new [`InheritanceGraph`] from a mapping of specs, where each
    /// spec may name its parent under the `parent` key.  Empty parents are
    /// ignored.
    pub fn from_specs(specs: &Mapping) -> Result<Self, Error> {
        let pairs = specs
            .iter()
            .map(|(name, spec)| {
                let name = key_string(name);
                match spec.get(PARENT_KEY) {
                    None | Some(Value::Null) => Ok((name, None)),
                    Some(Value::String(parent)) if parent.is_empty() => Ok((name, None)),
                    Some(Value::String(parent)) => Ok((name, Some(parent.clone()))),
                    Some(other) => Err(Error::invalid_rule(format!(
                        "{name}: parent must be a name, found {}",
                        crate::schema::render(other)
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_new(pairs)
    }

    fn create_graph(
        specs: &[(String, Option<String>)],
    ) -> Result<(DiGraph<String, ()>, NodeIndexMap), Error> {
        let mut graph = DiGraph::new();
        let mut indices = NodeIndexMap::new();

        for (name, _) in specs {
            if indices.contains_key(name) {
                return Err(Error::invalid_rule(format!("Duplicate spec name found: {name}")));
            }
            let idx = graph.add_node(name.clone());
            indices.insert(name.clone(), idx);
        }

        Ok((graph, indices))
    }

    fn add_parents(&mut self, specs: &[(String, Option<String>)]) -> Result<(), Error> {
        for (name, parent) in specs {
            let Some(parent) = parent else {
                continue;
            };
            let Some(&parent_idx) = self.node_indices.get(parent) else {
                return Err(Error::unknown_parent(format!(
                    "{name}: parent '{parent}' is not defined"
                )));
            };
            let child_idx = self.node_indices[name];
            self.graph.update_edge(parent_idx, child_idx, ());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mapping;
    use crate::ErrorKind;

    #[test]
    fn test_creation() -> Result<(), Error> {
        let graph = InheritanceGraph::try_new([
            ("supply", None),
            ("supply_power_plus", Some("supply")),
            ("ccgt", Some("supply")),
        ])?;
        assert_eq!(graph.parent("ccgt")?, Some("supply"));
        assert_eq!(graph.parent("supply")?, None);

        assert!(
            InheritanceGraph::try_new([("ccgt", Some("supply")), ("supply", None)]).is_ok(),
            "parents may be declared after their children"
        );
        assert!(
            InheritanceGraph::try_new([("ccgt", Some("suply")), ("supply", None)])
                .is_err_and(|e| e == Error::unknown_parent("ccgt: parent 'suply' is not defined"))
        );
        assert!(
            InheritanceGraph::try_new([("ccgt", None), ("ccgt", None)])
                .is_err_and(|e| e == Error::invalid_rule("Duplicate spec name found: ccgt"))
        );

        Ok(())
    }

    #[test]
    fn test_from_specs() -> Result<(), Error> {
        let graph = InheritanceGraph::from_specs(&mapping(
            r#"
            supply: {name: Supply}
            ccgt: {parent: supply, name: CCGT}
            pv: {parent: null}
            wind: {parent: ""}
            "#,
        ))?;
        assert_eq!(graph.parent("ccgt")?, Some("supply"));
        assert_eq!(graph.parent("pv")?, None);
        assert_eq!(graph.parent("wind")?, None);

        assert!(InheritanceGraph::from_specs(&mapping("{ccgt: {parent: [supply]}}"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));

        Ok(())
    }
}
