//! Query and frontier engine
//!
//! Read-only derivations over a graph: lookups, traversals, filtering,
//! searching, and the dependency-aware frontier of actionable tasks.

use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::domain::{DependencyGraph, Status, Task, TaskKind, VineGraph};
use crate::error::{Result, UsageError};

/// Aggregate counts over a graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Total task count, all kinds
    pub total: usize,
    /// Per-status counts over concrete tasks only
    pub by_status: BTreeMap<Status, usize>,
    pub root_id: String,
    pub root_name: String,
    /// Number of tasks with zero dependencies
    pub leaves: usize,
}

/// Completion bookkeeping reported alongside the frontier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    /// Total task count, all kinds (an unexpanded reference is undone work)
    pub total: usize,
    pub complete: usize,
    /// Per-status counts over concrete tasks only
    pub by_status: BTreeMap<Status, usize>,
    /// None when the root is an unexpanded reference
    pub root_status: Option<Status>,
    /// round(complete / total * 100)
    pub percent: u8,
}

/// The set of tasks currently actionable given the graph's statuses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Actionable {
    /// Pending concrete tasks whose every dependency is satisfied
    pub ready: Vec<String>,
    /// Reviewing tasks with at least one dependant that has progressed
    pub completable: Vec<String>,
    /// Reference nodes whose every dependency is satisfied
    pub expandable: Vec<String>,
    pub progress: Progress,
}

impl VineGraph {
    /// Resolves an id, failing with `TaskNotFound` for an unknown id
    pub fn get_task(&self, id: &str) -> Result<&Task> {
        self.task(id)
            .ok_or_else(|| UsageError::TaskNotFound(id.to_string()).into())
    }

    /// Direct dependencies of a task, in its declaration order
    pub fn dependencies_of(&self, id: &str) -> Result<Vec<&Task>> {
        let task = self.get_task(id)?;
        Ok(task
            .depends_on
            .iter()
            .filter_map(|dep| self.task(dep))
            .collect())
    }

    /// Direct dependants of a task, in graph declaration order
    pub fn dependants_of(&self, id: &str) -> Result<Vec<&Task>> {
        self.get_task(id)?;
        Ok(self
            .tasks_in_order()
            .filter(|t| t.depends_on.iter().any(|d| d == id))
            .collect())
    }

    /// Transitive dependencies of a task, in graph declaration order
    pub fn ancestors_of(&self, id: &str) -> Result<Vec<&Task>> {
        self.get_task(id)?;
        let reached = DependencyGraph::from_vine(self).ancestors(id);
        Ok(self.in_order(&reached))
    }

    /// Tasks that transitively depend on a task, in graph declaration order
    pub fn descendants_of(&self, id: &str) -> Result<Vec<&Task>> {
        self.get_task(id)?;
        let reached = DependencyGraph::from_vine(self).descendants(id);
        Ok(self.in_order(&reached))
    }

    fn in_order(&self, ids: &HashSet<String>) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| ids.contains(&t.id))
            .collect()
    }

    /// Concrete tasks with the given status, in declaration order
    pub fn filter_by_status(&self, status: Status) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| t.status() == Some(status))
            .collect()
    }

    /// Case-insensitive substring search over short name and description,
    /// both kinds; an empty query matches everything
    pub fn search(&self, query: &str) -> Vec<&Task> {
        let needle = query.to_lowercase();
        self.tasks_in_order()
            .filter(|t| {
                t.name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Tasks with zero dependencies, in declaration order
    pub fn leaves(&self) -> Vec<&Task> {
        self.tasks_in_order()
            .filter(|t| t.depends_on.is_empty())
            .collect()
    }

    /// Reference nodes only, in declaration order
    pub fn refs(&self) -> Vec<&Task> {
        self.tasks_in_order().filter(|t| t.is_reference()).collect()
    }

    /// Aggregate counts; reference nodes have no status and are excluded
    /// from the per-status counts
    pub fn summary(&self) -> Summary {
        let root = self.root();
        Summary {
            total: self.len(),
            by_status: self.status_counts(),
            root_id: root.id.clone(),
            root_name: root.name.clone(),
            leaves: self.leaves().len(),
        }
    }

    /// Computes the dependency-aware frontier
    pub fn actionable(&self) -> Actionable {
        let mut ready = Vec::new();
        let mut completable = Vec::new();
        let mut expandable = Vec::new();

        for task in self.tasks_in_order() {
            match &task.kind {
                TaskKind::Concrete { status, .. } => {
                    if status.is_pending() && self.all_dependencies_satisfied(task) {
                        ready.push(task.id.clone());
                    }
                    if *status == Status::Reviewing && self.has_progressed_dependant(&task.id) {
                        completable.push(task.id.clone());
                    }
                }
                TaskKind::Reference { .. } => {
                    if self.all_dependencies_satisfied(task) {
                        expandable.push(task.id.clone());
                    }
                }
            }
        }

        Actionable {
            ready,
            completable,
            expandable,
            progress: self.progress(),
        }
    }

    fn progress(&self) -> Progress {
        let by_status = self.status_counts();
        let complete = by_status.get(&Status::Complete).copied().unwrap_or(0);
        let total = self.len();
        let percent = ((complete as f64 / total as f64) * 100.0).round() as u8;

        Progress {
            total,
            complete,
            by_status,
            root_status: self.root().status(),
            percent,
        }
    }

    fn status_counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for task in self.tasks_in_order() {
            if let Some(status) = task.status() {
                *counts.entry(status).or_insert(0) += 1;
            }
        }
        counts
    }

    /// A dependency is satisfied when it resolves to a concrete task in a
    /// satisfied status; an unexpanded reference never satisfies
    fn all_dependencies_satisfied(&self, task: &Task) -> bool {
        task.depends_on
            .iter()
            .all(|dep| self.task(dep).is_some_and(Task::is_satisfied_dependency))
    }

    fn has_progressed_dependant(&self, id: &str) -> bool {
        self.tasks_in_order()
            .filter(|t| t.depends_on.iter().any(|d| d == id))
            .any(|t| t.status().is_some_and(|s| s.has_progressed()))
    }
}
