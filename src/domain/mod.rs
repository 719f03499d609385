//! Domain model for VINE graphs
//!
//! The value types and their invariants, without any I/O concerns.

mod graph;
mod task;
mod validate;
mod vine;

pub use task::{valid_id, Annotations, Attachment, AttachmentClass, Status, Task, TaskKind};
pub use validate::validate;
pub use vine::{VineGraph, DEFAULT_DELIMITER};

pub(crate) use graph::DependencyGraph;
