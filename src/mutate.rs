//! Mutation engine
//!
//! Every mutator is pure: it builds a working copy of the task table and
//! order list, applies one operation, re-validates, and returns a new
//! graph. The input graph is never touched. `apply_batch` runs an ordered
//! operation list against one working copy with no intermediate
//! validation, so sequences that are invalid at every intermediate step
//! but valid at the end still succeed; the assembled result is validated
//! exactly once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{valid_id, Annotations, Attachment, Status, Task, TaskKind, VineGraph};
use crate::error::{Result, UsageError};

/// Full field set for a new concrete task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TaskDraft {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            status: Status::NotStarted,
            depends_on: Vec::new(),
            decisions: Vec::new(),
            annotations: Annotations::new(),
            attachments: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Full field set for a new reference node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefDraft {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RefDraft {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uri: uri.into(),
            description: String::new(),
            depends_on: Vec::new(),
            decisions: Vec::new(),
            annotations: Annotations::new(),
        }
    }
}

/// Replacement fields for `update`; `None` leaves a field untouched.
/// Id, status and dependencies are never updated through this path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

/// One operation in an atomic batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOp {
    AddTask(TaskDraft),
    AddRef(RefDraft),
    RemoveTask {
        id: String,
    },
    SetStatus {
        id: String,
        status: Status,
    },
    Update {
        id: String,
        #[serde(flatten)]
        fields: TaskUpdate,
    },
    UpdateRefUri {
        id: String,
        uri: String,
    },
    AddDep {
        id: String,
        depends_on: String,
    },
    RemoveDep {
        id: String,
        depends_on: String,
    },
}

impl VineGraph {
    /// Adds a concrete task at the end of `order`. The result must still
    /// satisfy every invariant, so a task nothing depends on is rejected
    /// as an island; use a batch to add and wire in one step.
    pub fn add_task(&self, draft: TaskDraft) -> Result<VineGraph> {
        self.apply_one(&BatchOp::AddTask(draft))
    }

    /// Adds a reference node at the end of `order`; same island caveat as
    /// `add_task`
    pub fn add_ref(&self, draft: RefDraft) -> Result<VineGraph> {
        self.apply_one(&BatchOp::AddRef(draft))
    }

    /// Removes a non-root task and strips it from every dependency list
    pub fn remove_task(&self, id: &str) -> Result<VineGraph> {
        self.apply_one(&BatchOp::RemoveTask { id: id.to_string() })
    }

    /// Sets the status of a concrete task
    pub fn set_status(&self, id: &str, status: Status) -> Result<VineGraph> {
        self.apply_one(&BatchOp::SetStatus {
            id: id.to_string(),
            status,
        })
    }

    /// Replaces name, description, decisions and/or attachments
    pub fn update_task(&self, id: &str, fields: TaskUpdate) -> Result<VineGraph> {
        self.apply_one(&BatchOp::Update {
            id: id.to_string(),
            fields,
        })
    }

    /// Repoints a reference node at a new non-empty URI
    pub fn update_ref_uri(&self, id: &str, uri: &str) -> Result<VineGraph> {
        self.apply_one(&BatchOp::UpdateRefUri {
            id: id.to_string(),
            uri: uri.to_string(),
        })
    }

    /// Adds a dependency edge; rejects an edge that is already present
    pub fn add_dependency(&self, id: &str, depends_on: &str) -> Result<VineGraph> {
        self.apply_one(&BatchOp::AddDep {
            id: id.to_string(),
            depends_on: depends_on.to_string(),
        })
    }

    /// Removes a dependency edge; rejects an edge that is not present
    pub fn remove_dependency(&self, id: &str, depends_on: &str) -> Result<VineGraph> {
        self.apply_one(&BatchOp::RemoveDep {
            id: id.to_string(),
            depends_on: depends_on.to_string(),
        })
    }

    /// Applies an ordered operation list atomically. The first operation
    /// whose precondition fails aborts the whole batch; the input graph is
    /// never affected either way. Validation runs once, after all
    /// operations have applied.
    pub fn apply_batch(&self, ops: &[BatchOp]) -> Result<VineGraph> {
        let mut tasks = self.tasks.clone();
        let mut order = self.order.clone();

        for op in ops {
            apply_op(&mut tasks, &mut order, op)?;
        }

        self.rebuild(tasks, order)
    }

    fn apply_one(&self, op: &BatchOp) -> Result<VineGraph> {
        let mut tasks = self.tasks.clone();
        let mut order = self.order.clone();
        apply_op(&mut tasks, &mut order, op)?;
        self.rebuild(tasks, order)
    }

    fn rebuild(&self, tasks: HashMap<String, Task>, order: Vec<String>) -> Result<VineGraph> {
        VineGraph::from_parts(
            self.version.clone(),
            self.title.clone(),
            self.delimiter.clone(),
            self.prefix.clone(),
            tasks,
            order,
        )
    }
}

/// Applies one operation to the working copies, checking only the
/// operation's own preconditions; structural invariants are the caller's
/// single final validation.
fn apply_op(
    tasks: &mut HashMap<String, Task>,
    order: &mut Vec<String>,
    op: &BatchOp,
) -> Result<(), UsageError> {
    match op {
        BatchOp::AddTask(draft) => {
            check_new_id(tasks, &draft.id)?;
            let task = Task {
                id: draft.id.clone(),
                name: draft.name.clone(),
                description: draft.description.clone(),
                depends_on: draft.depends_on.clone(),
                decisions: draft.decisions.clone(),
                annotations: draft.annotations.clone(),
                kind: TaskKind::Concrete {
                    status: draft.status,
                    attachments: draft.attachments.clone(),
                },
            };
            order.push(task.id.clone());
            tasks.insert(task.id.clone(), task);
        }

        BatchOp::AddRef(draft) => {
            check_new_id(tasks, &draft.id)?;
            if draft.uri.trim().is_empty() {
                return Err(UsageError::EmptyRefUri(draft.id.clone()));
            }
            let node = Task {
                id: draft.id.clone(),
                name: draft.name.clone(),
                description: draft.description.clone(),
                depends_on: draft.depends_on.clone(),
                decisions: draft.decisions.clone(),
                annotations: draft.annotations.clone(),
                kind: TaskKind::Reference {
                    uri: draft.uri.clone(),
                },
            };
            order.push(node.id.clone());
            tasks.insert(node.id.clone(), node);
        }

        BatchOp::RemoveTask { id } => {
            if !tasks.contains_key(id) {
                return Err(UsageError::TaskNotFound(id.clone()));
            }
            if order.first().is_some_and(|root| root == id) {
                return Err(UsageError::RootRemoval(id.clone()));
            }
            tasks.remove(id);
            order.retain(|o| o != id);
            for task in tasks.values_mut() {
                task.depends_on.retain(|d| d != id);
            }
        }

        BatchOp::SetStatus { id, status } => {
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| UsageError::TaskNotFound(id.clone()))?;
            match &mut task.kind {
                TaskKind::Concrete { status: s, .. } => *s = *status,
                TaskKind::Reference { .. } => {
                    return Err(UsageError::StatusOnReference(id.clone()));
                }
            }
        }

        BatchOp::Update { id, fields } => {
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| UsageError::TaskNotFound(id.clone()))?;
            if fields.attachments.is_some() && task.is_reference() {
                return Err(UsageError::AttachmentsOnReference(id.clone()));
            }
            if let Some(name) = &fields.name {
                task.name = name.clone();
            }
            if let Some(description) = &fields.description {
                task.description = description.clone();
            }
            if let Some(decisions) = &fields.decisions {
                task.decisions = decisions.clone();
            }
            if let Some(attachments) = &fields.attachments {
                if let TaskKind::Concrete { attachments: a, .. } = &mut task.kind {
                    *a = attachments.clone();
                }
            }
        }

        BatchOp::UpdateRefUri { id, uri } => {
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| UsageError::TaskNotFound(id.clone()))?;
            match &mut task.kind {
                TaskKind::Reference { uri: u } => {
                    if uri.trim().is_empty() {
                        return Err(UsageError::EmptyRefUri(id.clone()));
                    }
                    *u = uri.clone();
                }
                TaskKind::Concrete { .. } => {
                    return Err(UsageError::NotAReference(id.clone()));
                }
            }
        }

        BatchOp::AddDep { id, depends_on } => {
            if !tasks.contains_key(depends_on) {
                return Err(UsageError::TaskNotFound(depends_on.clone()));
            }
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| UsageError::TaskNotFound(id.clone()))?;
            if task.depends_on.iter().any(|d| d == depends_on) {
                return Err(UsageError::DependencyExists {
                    task: id.clone(),
                    dependency: depends_on.clone(),
                });
            }
            task.depends_on.push(depends_on.clone());
        }

        BatchOp::RemoveDep { id, depends_on } => {
            if !tasks.contains_key(depends_on) {
                return Err(UsageError::TaskNotFound(depends_on.clone()));
            }
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| UsageError::TaskNotFound(id.clone()))?;
            if !task.depends_on.iter().any(|d| d == depends_on) {
                return Err(UsageError::DependencyMissing {
                    task: id.clone(),
                    dependency: depends_on.clone(),
                });
            }
            task.depends_on.retain(|d| d != depends_on);
        }
    }

    Ok(())
}

fn check_new_id(tasks: &HashMap<String, Task>, id: &str) -> Result<(), UsageError> {
    if !valid_id(id) {
        return Err(UsageError::InvalidId(id.to_string()));
    }
    if tasks.contains_key(id) {
        return Err(UsageError::DuplicateId(id.to_string()));
    }
    Ok(())
}
