//! Canonical serializer for the VINE text format
//!
//! Total inverse of the parser: for any graph the parser could have
//! produced, `parse(serialize(g))` is structurally equal to `g`.

use std::fmt::Write;

use crate::domain::{Task, TaskKind, VineGraph, DEFAULT_DELIMITER};

/// Renders a graph to canonical VINE text
pub fn serialize(graph: &VineGraph) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "vine {}", graph.version());
    if let Some(title) = graph.title() {
        let _ = writeln!(out, "title: {}", title);
    }
    if graph.delimiter() != DEFAULT_DELIMITER {
        let _ = writeln!(out, "delimiter: {}", graph.delimiter());
    }
    if let Some(prefix) = graph.prefix() {
        let _ = writeln!(out, "prefix: {}", prefix);
    }
    out.push_str("---\n");

    for (i, task) in graph.tasks_in_order().enumerate() {
        if i > 0 {
            out.push_str(graph.delimiter());
            out.push('\n');
        }
        write_block(&mut out, task);
    }

    out
}

fn write_block(out: &mut String, task: &Task) {
    out.push_str(&header_line(task));
    out.push('\n');

    if !task.description.is_empty() {
        for line in task.description.split('\n') {
            out.push_str(line);
            out.push('\n');
        }
    }
    for dep in &task.depends_on {
        let _ = writeln!(out, "-> {}", dep);
    }
    for decision in &task.decisions {
        let _ = writeln!(out, "> {}", decision);
    }
    if let TaskKind::Concrete { attachments, .. } = &task.kind {
        for attachment in attachments {
            let _ = writeln!(
                out,
                "@{} {} {}",
                attachment.class, attachment.mime, attachment.uri
            );
        }
    }
}

fn header_line(task: &Task) -> String {
    let mut header = match &task.kind {
        TaskKind::Concrete { status, .. } => {
            format!("[{}] {} ({})", task.id, task.name, status)
        }
        TaskKind::Reference { uri } => {
            format!("ref [{}] {} ({})", task.id, task.name, uri)
        }
    };

    // annotations render in ascending key order; BTreeMap iteration
    // provides it
    for (key, values) in task.annotations.iter() {
        let _ = write!(header, " @{}({})", key, values.join(","));
    }

    header
}
