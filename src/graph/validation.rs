// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating an [`InheritanceGraph`].

use petgraph::graph::NodeIndex;

use crate::Error;

use super::InheritanceGraph;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

impl InheritanceGraph {
    /// Validates that there are no cycles in the graph.
    ///
    /// If a cycle is detected, an error is returned that lists the specs in
    /// the cycle, parent first.
    pub(super) fn validate_acyclicity(&self) -> Result<(), Error> {
        let mut marks = vec![Mark::Unvisited; self.graph.node_count()];
        for index in self.graph.node_indices() {
            if marks[index.index()] == Mark::Unvisited {
                self.visit(index, &mut marks, &mut vec![])?;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        index: NodeIndex,
        marks: &mut [Mark],
        path: &mut Vec<NodeIndex>,
    ) -> Result<(), Error> {
        marks[index.index()] = Mark::InProgress;
        path.push(index);

        for child in self.child_indices(index) {
            match marks[child.index()] {
                Mark::Unvisited => self.visit(child, marks, path)?,
                Mark::InProgress => {
                    let start = path.iter().position(|i| *i == child).unwrap_or(0);
                    return Err(Error::cyclic_inheritance(format!(
                        "Cycle detected: {} -> {}",
                        path[start..]
                            .iter()
                            .map(|i| self.graph[*i].as_str())
                            .collect::<Vec<_>>()
                            .join(" -> "),
                        self.graph[child]
                    )));
                }
                Mark::Done => {}
            }
        }

        path.pop();
        marks[index.index()] = Mark::Done;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, InheritanceGraph};

    #[test]
    fn test_acyclicity_validation() {
        assert!(InheritanceGraph::try_new([("a", Some("c")), ("b", Some("a")), ("c", Some("b"))])
            .is_err_and(|e| e == Error::cyclic_inheritance("Cycle detected: a -> b -> c -> a")));

        assert!(InheritanceGraph::try_new([("a", Some("a"))])
            .is_err_and(|e| e == Error::cyclic_inheritance("Cycle detected: a -> a")));

        assert!(InheritanceGraph::try_new([
            ("root", None),
            ("x", Some("root")),
            ("y", Some("x")),
            ("z", Some("y")),
            ("w", Some("z")),
            ("y2", Some("w")),
        ])
        .is_ok());

        assert!(InheritanceGraph::try_new([
            ("root", None),
            ("x", Some("root")),
            ("y", Some("w")),
            ("z", Some("y")),
            ("w", Some("z")),
        ])
        .is_err_and(|e| e == Error::cyclic_inheritance("Cycle detected: y -> z -> w -> y")));
    }
}
