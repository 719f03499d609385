//! The VINE graph value type
//!
//! A `VineGraph` is immutable once constructed: every constructor validates
//! the structural invariants, and every mutation elsewhere in the crate
//! builds and validates a new value instead of editing in place. The `order`
//! list is the file's declaration order; it is authoritative for
//! serialization and the task at `order[0]` is the root.

use serde::Serialize;
use std::collections::HashMap;

use super::task::Task;
use super::validate::validate;
use crate::error::Result;

/// Default block delimiter for the text format
pub const DEFAULT_DELIMITER: &str = "---";

/// A directed, acyclic task-dependency graph with one designated root
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VineGraph {
    pub(crate) version: String,
    pub(crate) title: Option<String>,
    pub(crate) delimiter: String,
    pub(crate) prefix: Option<String>,
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) order: Vec<String>,
}

impl VineGraph {
    /// Assembles and validates a graph from its parts.
    ///
    /// `order` must list exactly the keys of `tasks`; the pair comes from
    /// the parser or from a mutation working copy, which maintain the
    /// agreement by construction.
    pub(crate) fn from_parts(
        version: String,
        title: Option<String>,
        delimiter: String,
        prefix: Option<String>,
        tasks: HashMap<String, Task>,
        order: Vec<String>,
    ) -> Result<Self> {
        debug_assert_eq!(tasks.len(), order.len());
        debug_assert!(order.iter().all(|id| tasks.contains_key(id)));

        let graph = Self {
            version,
            title,
            delimiter,
            prefix,
            tasks,
            order,
        };
        validate(&graph)?;
        Ok(graph)
    }

    /// Format version string from the magic line, stored verbatim
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Optional graph title from the preamble
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Block delimiter (defaults to `---`)
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Declared namespace prefix for expansion. `Some("")` is an explicit
    /// empty prefix, distinct from no declaration.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Looks up a task by id
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Returns true if the graph contains the id
    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Task ids in declaration order
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// The root task id (`order[0]`)
    pub fn root_id(&self) -> &str {
        &self.order[0]
    }

    /// The root task
    pub fn root(&self) -> &Task {
        // the non-empty invariant guarantees order[0] resolves
        &self.tasks[&self.order[0]]
    }

    /// Number of tasks (all kinds)
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Always false for a validated graph; present for completeness
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates tasks in declaration order
    pub fn tasks_in_order(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(move |id| self.tasks.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::Status;
    use crate::error::{Constraint, VineError};

    fn parts(tasks: Vec<Task>) -> (HashMap<String, Task>, Vec<String>) {
        let order: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        let map = tasks.into_iter().map(|t| (t.id.clone(), t)).collect();
        (map, order)
    }

    #[test]
    fn from_parts_validates() {
        let mut root = Task::concrete("root", "Root", Status::NotStarted);
        root.depends_on.push("a".into());
        let a = Task::concrete("a", "A", Status::NotStarted);
        let (tasks, order) = parts(vec![root, a]);

        let graph = VineGraph::from_parts(
            "1.0.0".into(),
            Some("Plan".into()),
            DEFAULT_DELIMITER.into(),
            None,
            tasks,
            order,
        )
        .unwrap();

        assert_eq!(graph.root_id(), "root");
        assert_eq!(graph.root().name, "Root");
        assert_eq!(graph.len(), 2);
        assert!(graph.contains("a"));
        assert_eq!(graph.title(), Some("Plan"));
    }

    #[test]
    fn from_parts_rejects_islands() {
        let root = Task::concrete("root", "Root", Status::NotStarted);
        let orphan = Task::concrete("orphan", "Orphan", Status::NotStarted);
        let (tasks, order) = parts(vec![root, orphan]);

        let err = VineGraph::from_parts(
            "1.0.0".into(),
            None,
            DEFAULT_DELIMITER.into(),
            None,
            tasks,
            order,
        )
        .unwrap_err();

        match err {
            VineError::Validation(v) => assert_eq!(v.constraint, Constraint::NoIslands),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn tasks_in_order_follows_declaration() {
        let mut root = Task::concrete("root", "Root", Status::NotStarted);
        root.depends_on.push("b".into());
        let mut b = Task::concrete("b", "B", Status::NotStarted);
        b.depends_on.push("a".into());
        let a = Task::concrete("a", "A", Status::NotStarted);
        let (tasks, order) = parts(vec![root, b, a]);

        let graph = VineGraph::from_parts(
            "1.0.0".into(),
            None,
            DEFAULT_DELIMITER.into(),
            None,
            tasks,
            order,
        )
        .unwrap();

        let ids: Vec<_> = graph.tasks_in_order().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["root", "b", "a"]);
    }
}
