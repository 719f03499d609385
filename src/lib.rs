//! VINE - a text format and engine for task-dependency graphs
//!
//! A vine is a rooted, acyclic, fully connected graph of tasks written
//! in a plain-text block format. This crate parses and serializes that
//! format, enforces its structural constraints, answers frontier
//! queries ("what can be worked on next"), applies copy-on-write
//! mutations and atomic batches, and expands externally referenced
//! sub-graphs in place.

pub mod domain;
pub mod error;
mod expand;
pub mod mutate;
pub mod parse;
pub mod query;
pub mod serialize;

pub use domain::{
    valid_id, validate, Annotations, Attachment, AttachmentClass, Status, Task, TaskKind,
    VineGraph, DEFAULT_DELIMITER,
};
pub use error::{
    Constraint, ParseError, Result, UsageError, ValidationDetails, ValidationError, VineError,
};
pub use mutate::{BatchOp, RefDraft, TaskDraft, TaskUpdate};
pub use parse::parse;
pub use query::{Actionable, Progress, Summary};
pub use serialize::serialize;
