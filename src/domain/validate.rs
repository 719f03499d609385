//! Structural validator
//!
//! Checks the graph invariants in a fixed order and reports the first
//! violation: non-empty, referential integrity, acyclicity, connectivity,
//! then reference-specific constraints. Every parse and every mutation
//! result passes through here before a caller can observe it.

use std::collections::HashMap;

use super::graph::DependencyGraph;
use super::vine::VineGraph;
use crate::error::ValidationError;

/// Validates a graph, returning the first violated invariant
pub fn validate(graph: &VineGraph) -> Result<(), ValidationError> {
    if graph.is_empty() {
        return Err(ValidationError::empty_graph());
    }

    check_dependency_refs(graph)?;
    check_acyclic(graph)?;
    check_connected(graph)?;
    check_reference_uris(graph)?;

    Ok(())
}

/// Every dependency id must exist as a task
fn check_dependency_refs(graph: &VineGraph) -> Result<(), ValidationError> {
    for task in graph.tasks_in_order() {
        for dep in &task.depends_on {
            if !graph.contains(dep) {
                return Err(ValidationError::missing_dependency(&task.id, dep));
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// Depth-first search with three-colour marking (absent = unvisited).
/// Re-entering an in-progress node closes a cycle, reported as the ordered
/// path from the re-entered node back to itself.
fn check_acyclic(graph: &VineGraph) -> Result<(), ValidationError> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    for id in graph.order() {
        if !marks.contains_key(id.as_str()) {
            visit(graph, id, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    graph: &'a VineGraph,
    id: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<(), ValidationError> {
    marks.insert(id, Mark::InProgress);
    path.push(id);

    if let Some(task) = graph.task(id) {
        for dep in &task.depends_on {
            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|p| *p == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|p| p.to_string()).collect();
                    cycle.push(dep.clone());
                    return Err(ValidationError::cycle(cycle));
                }
                None => visit(graph, dep, marks, path)?,
            }
        }
    }

    path.pop();
    marks.insert(id, Mark::Done);
    Ok(())
}

/// Every non-root task must be reachable from the root by following
/// dependency edges; all islands are reported together
fn check_connected(graph: &VineGraph) -> Result<(), ValidationError> {
    let deps = DependencyGraph::from_vine(graph);
    let reached = deps.reachable_from(graph.root_id());

    let islands: Vec<String> = graph
        .order()
        .iter()
        .filter(|id| !reached.contains(*id))
        .cloned()
        .collect();

    if islands.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::islands(islands))
    }
}

/// A reference node's URI must be non-empty
fn check_reference_uris(graph: &VineGraph) -> Result<(), ValidationError> {
    for task in graph.tasks_in_order() {
        if let Some(uri) = task.uri() {
            if uri.trim().is_empty() {
                return Err(ValidationError::ref_uri_required(&task.id));
            }
        }
    }
    Ok(())
}
