//! Task domain model
//!
//! Tasks are the nodes of a VINE graph. A node is either a concrete task
//! carrying a status and attachments, or a reference node pointing at an
//! external graph by URI. Both share a common base: id, short name,
//! description, dependency list, decision notes and an annotation table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status of a concrete task
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    NotStarted,
    Planning,
    Started,
    Reviewing,
    Blocked,
    Complete,
}

impl Status {
    /// All statuses, in lifecycle order
    pub const ALL: [Status; 6] = [
        Status::NotStarted,
        Status::Planning,
        Status::Started,
        Status::Reviewing,
        Status::Blocked,
        Status::Complete,
    ];

    /// Returns the text-format token for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotStarted => "notstarted",
            Status::Planning => "planning",
            Status::Started => "started",
            Status::Reviewing => "reviewing",
            Status::Blocked => "blocked",
            Status::Complete => "complete",
        }
    }

    /// Parses a text-format token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "notstarted" => Some(Status::NotStarted),
            "planning" => Some(Status::Planning),
            "started" => Some(Status::Started),
            "reviewing" => Some(Status::Reviewing),
            "blocked" => Some(Status::Blocked),
            "complete" => Some(Status::Complete),
            _ => None,
        }
    }

    /// Returns true if this task has not yet begun (notstarted or planning)
    pub fn is_pending(&self) -> bool {
        matches!(self, Status::NotStarted | Status::Planning)
    }

    /// Returns true if a dependency in this status is satisfied for the
    /// purposes of the frontier computation (reviewing or complete)
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Status::Reviewing | Status::Complete)
    }

    /// Returns true if work has progressed past the pending statuses
    /// (started, reviewing or complete)
    pub fn has_progressed(&self) -> bool {
        matches!(self, Status::Started | Status::Reviewing | Status::Complete)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class of an attachment on a concrete task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentClass {
    Artifact,
    Guidance,
    File,
}

impl AttachmentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentClass::Artifact => "artifact",
            AttachmentClass::Guidance => "guidance",
            AttachmentClass::File => "file",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "artifact" => Some(AttachmentClass::Artifact),
            "guidance" => Some(AttachmentClass::Guidance),
            "file" => Some(AttachmentClass::File),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An external resource linked to a concrete task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub class: AttachmentClass,
    pub mime: String,
    pub uri: String,
}

impl Attachment {
    pub fn new(class: AttachmentClass, mime: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            class,
            mime: mime.into(),
            uri: uri.into(),
        }
    }
}

/// Annotation table: `@key(v1,v2)` header suffixes, keyed by annotation name
///
/// Keys iterate in ascending lexicographic order. An entry with an empty
/// value list is a boolean flag, distinct from an absent entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations(BTreeMap<String, Vec<String>>);

impl Annotations {
    /// Creates an empty annotation table
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets the value list for a key, replacing any previous entry
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    /// Gets the value list for a key; `Some(&[])` means a flag annotation
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(|v| v.as_slice())
    }

    /// Returns true if the key is present (including as a flag)
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns true if no annotations are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of annotation entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Vec<String>)> for Annotations {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The variant data distinguishing concrete tasks from reference nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskKind {
    /// A concrete unit of work with a status and optional attachments
    Concrete {
        status: Status,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attachments: Vec<Attachment>,
    },
    /// A placeholder pointing at an external VINE graph
    Reference { uri: String },
}

/// A node of a VINE graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within the graph
    pub id: String,

    /// Human-readable short name
    pub name: String,

    /// Free-form description; may span multiple paragraphs
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Ids of the tasks this task depends on, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Decision notes, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<String>,

    /// Auxiliary metadata from `@key(...)` header suffixes
    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,

    /// Concrete-or-reference variant data
    #[serde(flatten)]
    pub kind: TaskKind,
}

impl Task {
    /// Creates a concrete task with the given status and no other content
    pub fn concrete(id: impl Into<String>, name: impl Into<String>, status: Status) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            depends_on: Vec::new(),
            decisions: Vec::new(),
            annotations: Annotations::new(),
            kind: TaskKind::Concrete {
                status,
                attachments: Vec::new(),
            },
        }
    }

    /// Creates a reference node pointing at an external graph
    pub fn reference(
        id: impl Into<String>,
        name: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            depends_on: Vec::new(),
            decisions: Vec::new(),
            annotations: Annotations::new(),
            kind: TaskKind::Reference { uri: uri.into() },
        }
    }

    /// Returns true if this node is a reference
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TaskKind::Reference { .. })
    }

    /// Returns the status of a concrete task, or None for a reference
    pub fn status(&self) -> Option<Status> {
        match self.kind {
            TaskKind::Concrete { status, .. } => Some(status),
            TaskKind::Reference { .. } => None,
        }
    }

    /// Returns the attachments of a concrete task; references have none
    pub fn attachments(&self) -> &[Attachment] {
        match &self.kind {
            TaskKind::Concrete { attachments, .. } => attachments,
            TaskKind::Reference { .. } => &[],
        }
    }

    /// Returns the URI of a reference node, or None for a concrete task
    pub fn uri(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Reference { uri } => Some(uri),
            TaskKind::Concrete { .. } => None,
        }
    }

    /// Returns true if this node, used as a dependency, counts as
    /// satisfied: a concrete task in a satisfied status. An unexpanded
    /// reference is never satisfied.
    pub fn is_satisfied_dependency(&self) -> bool {
        self.status().is_some_and(|s| s.is_satisfied())
    }
}

/// Checks an id against the grammar: `/`-separated segments of
/// `[A-Za-z0-9-]+`
pub fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
