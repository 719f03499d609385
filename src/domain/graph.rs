//! Dependency-graph adapter
//!
//! A petgraph view over a `VineGraph`'s dependency relation, used for
//! reachability (island detection) and transitive traversals
//! (ancestors/descendants). Edges point from a task to each of its
//! dependencies.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use super::vine::VineGraph;

/// A directed view of the dependency relation of a `VineGraph`
#[derive(Debug)]
pub(crate) struct DependencyGraph {
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the adapter from a graph whose referential integrity has
    /// already been checked: every dependency id resolves to a node.
    pub fn from_vine(vine: &VineGraph) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();

        for id in vine.order() {
            let idx = graph.add_node(id.clone());
            nodes.insert(id.clone(), idx);
        }

        for task in vine.tasks_in_order() {
            let Some(&from) = nodes.get(&task.id) else {
                continue;
            };
            for dep in &task.depends_on {
                if let Some(&to) = nodes.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, nodes }
    }

    /// Direct dependencies of a task
    pub fn dependencies(&self, id: &str) -> Vec<String> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct dependants of a task (tasks that depend on it)
    pub fn dependants(&self, id: &str) -> Vec<String> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<String> {
        let Some(&idx) = self.nodes.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect()
    }

    /// Ids reachable from `id` by following dependency edges, excluding
    /// `id` itself: the transitive dependencies (ancestors)
    pub fn ancestors(&self, id: &str) -> HashSet<String> {
        let Some(&start) = self.nodes.get(id) else {
            return HashSet::new();
        };
        let mut reached = HashSet::new();
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(idx) = bfs.next(&self.graph) {
            if idx != start {
                if let Some(node) = self.graph.node_weight(idx) {
                    reached.insert(node.clone());
                }
            }
        }
        reached
    }

    /// Ids that transitively depend on `id`, excluding `id` itself:
    /// the descendants
    pub fn descendants(&self, id: &str) -> HashSet<String> {
        let Some(&start) = self.nodes.get(id) else {
            return HashSet::new();
        };
        let reversed = Reversed(&self.graph);
        let mut reached = HashSet::new();
        let mut bfs = Bfs::new(reversed, start);
        while let Some(idx) = bfs.next(reversed) {
            if idx != start {
                if let Some(node) = self.graph.node_weight(idx) {
                    reached.insert(node.clone());
                }
            }
        }
        reached
    }

    /// Ids reachable from `id`, including `id` itself; used for island
    /// detection from the root
    pub fn reachable_from(&self, id: &str) -> HashSet<String> {
        let mut reached = self.ancestors(id);
        if self.nodes.contains_key(id) {
            reached.insert(id.to_string());
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{Status, Task};
    use crate::domain::vine::{VineGraph, DEFAULT_DELIMITER};

    /// root -> {left, right} -> leaf
    fn diamond() -> VineGraph {
        let mut root = Task::concrete("root", "Root", Status::NotStarted);
        root.depends_on = vec!["left".into(), "right".into()];
        let mut left = Task::concrete("left", "Left", Status::NotStarted);
        left.depends_on = vec!["leaf".into()];
        let mut right = Task::concrete("right", "Right", Status::NotStarted);
        right.depends_on = vec!["leaf".into()];
        let leaf = Task::concrete("leaf", "Leaf", Status::NotStarted);

        let tasks_vec = vec![root, left, right, leaf];
        let order: Vec<String> = tasks_vec.iter().map(|t| t.id.clone()).collect();
        let tasks = tasks_vec.into_iter().map(|t| (t.id.clone(), t)).collect();

        VineGraph::from_parts(
            "1.0.0".into(),
            None,
            DEFAULT_DELIMITER.into(),
            None,
            tasks,
            order,
        )
        .unwrap()
    }

    #[test]
    fn dependencies_and_dependants() {
        let graph = DependencyGraph::from_vine(&diamond());

        let mut deps = graph.dependencies("root");
        deps.sort();
        assert_eq!(deps, ["left", "right"]);

        let mut dependants = graph.dependants("leaf");
        dependants.sort();
        assert_eq!(dependants, ["left", "right"]);

        assert!(graph.dependants("root").is_empty());
    }

    #[test]
    fn ancestors_are_transitive_dependencies() {
        let graph = DependencyGraph::from_vine(&diamond());

        let ancestors = graph.ancestors("root");
        assert_eq!(ancestors.len(), 3);
        assert!(ancestors.contains("leaf"));
        assert!(!ancestors.contains("root"));

        assert!(graph.ancestors("leaf").is_empty());
    }

    #[test]
    fn descendants_are_transitive_dependants() {
        let graph = DependencyGraph::from_vine(&diamond());

        let descendants = graph.descendants("leaf");
        assert_eq!(descendants.len(), 3);
        assert!(descendants.contains("root"));

        assert!(graph.descendants("root").is_empty());
    }

    #[test]
    fn reachability_includes_start() {
        let graph = DependencyGraph::from_vine(&diamond());

        let reached = graph.reachable_from("root");
        assert_eq!(reached.len(), 4);
        assert!(reached.contains("root"));
    }

    #[test]
    fn unknown_id_yields_empty_results() {
        let graph = DependencyGraph::from_vine(&diamond());
        assert!(graph.dependencies("nope").is_empty());
        assert!(graph.ancestors("nope").is_empty());
        assert!(graph.reachable_from("nope").is_empty());
    }
}
