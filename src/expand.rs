//! Expansion engine
//!
//! Inlines an externally referenced graph into a parent: the child root
//! takes over the reference slot as a concrete task, every other child
//! task is remapped into the parent's namespace, and the result is
//! re-validated before being returned.

use std::collections::HashMap;

use crate::domain::{Task, TaskKind, VineGraph};
use crate::error::{Result, UsageError};

impl VineGraph {
    /// Merges `child` into the reference slot `ref_id`.
    ///
    /// The namespace prefix is the child's own declared prefix when
    /// present (an explicit empty prefix means no prefix), else `ref_id`.
    /// The child root maps to `ref_id`; every other child id maps to
    /// `prefix/childId` and must not collide with an existing parent id.
    pub fn expand_ref(&self, ref_id: &str, child: &VineGraph) -> Result<VineGraph> {
        let slot = self
            .task(ref_id)
            .ok_or_else(|| UsageError::TaskNotFound(ref_id.to_string()))?;
        if !slot.is_reference() {
            return Err(UsageError::NotAReference(ref_id.to_string()).into());
        }
        if child.is_empty() {
            return Err(UsageError::EmptyChildGraph.into());
        }

        let child_root = child.root();
        let TaskKind::Concrete {
            status,
            attachments,
        } = &child_root.kind
        else {
            return Err(UsageError::ReferenceChildRoot(child_root.id.clone()).into());
        };

        // 1-2. id remapping, built once per call
        let prefix = child.prefix().unwrap_or(ref_id);
        let mut mapping: HashMap<&str, String> = HashMap::new();
        mapping.insert(child_root.id.as_str(), ref_id.to_string());
        for id in &child.order()[1..] {
            let mapped = if prefix.is_empty() {
                id.clone()
            } else {
                format!("{}/{}", prefix, id)
            };
            mapping.insert(id.as_str(), mapped);
        }

        // 3. collision check against the parent
        for id in &child.order()[1..] {
            let mapped = &mapping[id.as_str()];
            if self.contains(mapped) {
                return Err(UsageError::IdCollision(mapped.clone()).into());
            }
        }

        let mut tasks = self.tasks.clone();
        let mut order = self.order.clone();

        // 4. the child root takes over the reference slot
        let mut depends_on: Vec<String> = child_root
            .depends_on
            .iter()
            .map(|d| remap(&mapping, d))
            .collect();
        for dep in &slot.depends_on {
            if !depends_on.contains(dep) {
                depends_on.push(dep.clone());
            }
        }
        let mut decisions = child_root.decisions.clone();
        decisions.extend(slot.decisions.iter().cloned());

        let merged = Task {
            id: ref_id.to_string(),
            name: child_root.name.clone(),
            description: child_root.description.clone(),
            depends_on,
            decisions,
            annotations: child_root.annotations.clone(),
            kind: TaskKind::Concrete {
                status: *status,
                attachments: attachments.clone(),
            },
        };
        tasks.insert(ref_id.to_string(), merged);

        // 5. remap the remaining child tasks, preserving their kind
        let mut spliced: Vec<String> = Vec::with_capacity(child.len() - 1);
        for id in &child.order()[1..] {
            let Some(original) = child.task(id) else {
                continue;
            };
            let mut task = original.clone();
            task.id = remap(&mapping, id);
            task.depends_on = task.depends_on.iter().map(|d| remap(&mapping, d)).collect();
            spliced.push(task.id.clone());
            tasks.insert(task.id.clone(), task);
        }

        // 6. splice into order immediately after the reference slot,
        // preserving the child's relative order
        let slot_pos = order.iter().position(|id| id == ref_id).unwrap_or(0);
        order.splice(slot_pos + 1..slot_pos + 1, spliced);

        // 7. re-validate
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

fn remap(mapping: &HashMap<&str, String>, id: &str) -> String {
    mapping
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_string())
}
