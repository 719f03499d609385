//! Error taxonomy
//!
//! Three layers: [`ParseError`] for text that does not conform to the
//! grammar, [`ValidationError`] for graphs that break a structural
//! constraint, and [`UsageError`] for operations whose preconditions
//! fail. [`VineError`] unifies them at the crate boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of structural constraints every graph must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Constraint {
    AtLeastOneTask,
    ValidDependencyRefs,
    NoCycles,
    NoIslands,
    RefUriRequired,
    NoRefAttachments,
}

impl Constraint {
    /// Stable machine-readable identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Constraint::AtLeastOneTask => "at-least-one-task",
            Constraint::ValidDependencyRefs => "valid-dependency-refs",
            Constraint::NoCycles => "no-cycles",
            Constraint::NoIslands => "no-islands",
            Constraint::RefUriRequired => "ref-uri-required",
            Constraint::NoRefAttachments => "no-ref-attachments",
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Structured payload accompanying a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationDetails {
    Empty,
    Task { id: String },
    MissingDependency { id: String, dependency: String },
    Cycle { path: Vec<String> },
    Islands { ids: Vec<String> },
}

/// A graph that violates one of the structural constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message} [{constraint}]")]
pub struct ValidationError {
    pub message: String,
    pub constraint: Constraint,
    pub details: ValidationDetails,
}

impl ValidationError {
    pub(crate) fn empty_graph() -> Self {
        ValidationError {
            message: "graph contains no tasks".to_string(),
            constraint: Constraint::AtLeastOneTask,
            details: ValidationDetails::Empty,
        }
    }

    pub(crate) fn missing_dependency(id: &str, dependency: &str) -> Self {
        ValidationError {
            message: format!("task '{}' depends on unknown task '{}'", id, dependency),
            constraint: Constraint::ValidDependencyRefs,
            details: ValidationDetails::MissingDependency {
                id: id.to_string(),
                dependency: dependency.to_string(),
            },
        }
    }

    pub(crate) fn cycle(path: Vec<String>) -> Self {
        ValidationError {
            message: format!("dependency cycle: {}", path.join(" -> ")),
            constraint: Constraint::NoCycles,
            details: ValidationDetails::Cycle { path },
        }
    }

    pub(crate) fn islands(ids: Vec<String>) -> Self {
        ValidationError {
            message: format!("tasks unreachable from the root: {}", ids.join(", ")),
            constraint: Constraint::NoIslands,
            details: ValidationDetails::Islands { ids },
        }
    }

    pub(crate) fn ref_uri_required(id: &str) -> Self {
        ValidationError {
            message: format!("reference task '{}' has an empty uri", id),
            constraint: Constraint::RefUriRequired,
            details: ValidationDetails::Task { id: id.to_string() },
        }
    }
}

/// Text that does not conform to the grammar. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

impl ParseError {
    pub(crate) fn new(line: usize, message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
            line,
        }
    }
}

/// An operation whose preconditions were not met.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task id already exists: {0}")]
    DuplicateId(String),

    #[error("invalid task id: '{0}'")]
    InvalidId(String),

    #[error("cannot remove the root task: {0}")]
    RootRemoval(String),

    #[error("task is not a reference: {0}")]
    NotAReference(String),

    #[error("cannot set a status on reference task: {0}")]
    StatusOnReference(String),

    #[error("cannot attach files to reference task: {0}")]
    AttachmentsOnReference(String),

    #[error("reference task '{0}' requires a non-empty uri")]
    EmptyRefUri(String),

    #[error("task '{task}' already depends on '{dependency}'")]
    DependencyExists { task: String, dependency: String },

    #[error("task '{task}' does not depend on '{dependency}'")]
    DependencyMissing { task: String, dependency: String },

    #[error("cannot expand from an empty graph")]
    EmptyChildGraph,

    #[error("expansion would collide with existing task id: {0}")]
    IdCollision(String),

    #[error("child root '{0}' is itself a reference")]
    ReferenceChildRoot(String),
}

/// Any error the crate can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Usage(#[from] UsageError),
}

pub type Result<T, E = VineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_ids_are_kebab_case() {
        assert_eq!(Constraint::NoCycles.id(), "no-cycles");
        let json = serde_json::to_string(&Constraint::RefUriRequired).unwrap();
        assert_eq!(json, "\"ref-uri-required\"");
    }

    #[test]
    fn validation_error_display_names_the_constraint() {
        let err = ValidationError::cycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "dependency cycle: a -> b -> a [no-cycles]");
    }

    #[test]
    fn parse_error_display_is_line_prefixed() {
        let err = ParseError::new(3, "missing short name");
        assert_eq!(err.to_string(), "line 3: missing short name");
    }

    #[test]
    fn details_serialize_with_kind_tag() {
        let err = ValidationError::islands(vec!["lost".into()]);
        let json = serde_json::to_value(&err.details).unwrap();
        assert_eq!(json["kind"], "islands");
        assert_eq!(json["ids"][0], "lost");
    }
}
