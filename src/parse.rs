//! Grammar parser for the VINE text format
//!
//! Pipeline: magic line, preamble, block splitting on the declared
//! delimiter, per-block header/body parsing, duplicate-id check, then
//! structural validation. Lexical defects surface as `ParseError` with a
//! 1-based line number; a text that parses but violates a graph invariant
//! surfaces as `ValidationError`.

use std::collections::HashMap;

use crate::domain::{
    valid_id, Annotations, Attachment, AttachmentClass, Status, Task, TaskKind, VineGraph,
    DEFAULT_DELIMITER,
};
use crate::error::{ParseError, Result};

/// Parses VINE text into a validated graph
pub fn parse(text: &str) -> Result<VineGraph> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();

    // 1. magic line
    let magic = lines.first().copied().unwrap_or("").trim_end();
    let version = magic
        .strip_prefix("vine ")
        .map(str::trim)
        .ok_or_else(|| ParseError::new(1, "expected magic line 'vine <major.minor.patch>'"))?;
    let version_nums = parse_version(version)
        .ok_or_else(|| ParseError::new(1, format!("invalid format version '{}'", version)))?;
    let refs_allowed = version_nums >= (1, 1, 0);

    // 2. preamble, terminated by a literal `---` regardless of any custom
    // delimiter declared inside it
    let mut title = None;
    let mut delimiter = DEFAULT_DELIMITER.to_string();
    let mut prefix = None;
    let mut idx = 1;
    let mut terminated = false;

    while idx < lines.len() {
        let line = lines[idx];
        idx += 1;
        if line == "---" {
            terminated = true;
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(ParseError::new(idx, "malformed preamble line: expected 'key: value'").into());
        };
        match key.trim() {
            "title" => title = Some(value.trim().to_string()),
            "delimiter" => {
                let token = value.trim();
                if token.is_empty() {
                    return Err(ParseError::new(idx, "delimiter must not be empty").into());
                }
                delimiter = token.to_string();
            }
            "prefix" => prefix = Some(value.trim().to_string()),
            // unknown preamble keys are ignored
            _ => {}
        }
    }
    if !terminated {
        return Err(ParseError::new(lines.len().max(1), "missing preamble terminator '---'").into());
    }

    // 3. block splitting on the declared delimiter
    let blocks = split_blocks(&lines, idx, &delimiter);
    if blocks.is_empty() {
        return Err(ParseError::new(idx, "no task blocks found").into());
    }

    // 4-5. per-block parsing with duplicate-id detection
    let mut tasks: HashMap<String, Task> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for segment in &blocks {
        let task = parse_block(segment, refs_allowed)?;
        let header_line = segment
            .iter()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(n, _)| *n)
            .unwrap_or(0);
        if tasks.contains_key(&task.id) {
            return Err(
                ParseError::new(header_line, format!("duplicate task id '{}'", task.id)).into(),
            );
        }
        order.push(task.id.clone());
        tasks.insert(task.id.clone(), task);
    }

    // 6. assembly and validation
    VineGraph::from_parts(version.to_string(), title, delimiter, prefix, tasks, order)
}

fn parse_version(token: &str) -> Option<(u64, u64, u64)> {
    let mut parts = token.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Splits the content lines into segments on the delimiter, keeping 1-based
/// line numbers and discarding trailing all-blank segments
fn split_blocks<'a>(
    lines: &[&'a str],
    start: usize,
    delimiter: &str,
) -> Vec<Vec<(usize, &'a str)>> {
    let mut blocks: Vec<Vec<(usize, &'a str)>> = Vec::new();
    let mut current: Vec<(usize, &'a str)> = Vec::new();

    for (i, line) in lines.iter().enumerate().skip(start) {
        if *line == delimiter {
            blocks.push(std::mem::take(&mut current));
        } else {
            current.push((i + 1, line));
        }
    }
    blocks.push(current);

    while blocks
        .last()
        .is_some_and(|seg| seg.iter().all(|(_, l)| l.trim().is_empty()))
    {
        blocks.pop();
    }

    blocks
}

struct Header {
    id: String,
    name: String,
    kind: HeaderKind,
    annotations: Annotations,
}

enum HeaderKind {
    Task(Status),
    Ref(String),
}

fn parse_block(segment: &[(usize, &str)], refs_allowed: bool) -> Result<Task, ParseError> {
    let header_pos = segment.iter().position(|(_, l)| !l.trim().is_empty());
    let Some(header_pos) = header_pos else {
        let line = segment.first().map(|(n, _)| *n).unwrap_or(1);
        return Err(ParseError::new(line, "block has no header line"));
    };
    let (header_line, header_text) = segment[header_pos];
    let header = parse_header(header_text, header_line)?;

    let is_ref = matches!(header.kind, HeaderKind::Ref(_));
    if is_ref && !refs_allowed {
        return Err(ParseError::new(
            header_line,
            "reference nodes require vine 1.1.0 or later",
        ));
    }

    let mut description_lines: Vec<&str> = Vec::new();
    let mut depends_on: Vec<String> = Vec::new();
    let mut decisions: Vec<String> = Vec::new();
    let mut attachments: Vec<Attachment> = Vec::new();

    for &(line_no, line) in &segment[header_pos + 1..] {
        if line.trim().is_empty() {
            // blank lines are preserved inside multi-paragraph descriptions
            description_lines.push("");
        } else if let Some(dep) = line.strip_prefix("-> ") {
            let dep = dep.trim();
            if dep.is_empty() {
                return Err(ParseError::new(line_no, "missing id after '->'"));
            }
            depends_on.push(dep.to_string());
        } else if let Some(note) = line.strip_prefix("> ") {
            decisions.push(note.to_string());
        } else if let Some((class, rest)) = attachment_line(line) {
            if is_ref {
                return Err(ParseError::new(
                    line_no,
                    "reference nodes cannot carry attachments",
                ));
            }
            attachments.push(parse_attachment(class, rest, line_no)?);
        } else {
            // unrecognized @-lines fall through to description text
            description_lines.push(line);
        }
    }

    let kind = match header.kind {
        HeaderKind::Ref(uri) => TaskKind::Reference { uri },
        HeaderKind::Task(status) => TaskKind::Concrete {
            status,
            attachments,
        },
    };

    Ok(Task {
        id: header.id,
        name: header.name,
        description: description_lines.join("\n"),
        depends_on,
        decisions,
        annotations: header.annotations,
        kind,
    })
}

fn parse_header(text: &str, line_no: usize) -> Result<Header, ParseError> {
    let trimmed = text.trim();
    let (is_ref, rest) = match trimmed.strip_prefix("ref ") {
        Some(r) => (true, r.trim_start()),
        None => (false, trimmed),
    };

    let rest = rest
        .strip_prefix('[')
        .ok_or_else(|| ParseError::new(line_no, "expected '[id]' at start of block header"))?;
    let close = rest
        .find(']')
        .ok_or_else(|| ParseError::new(line_no, "unterminated '[id]'"))?;
    let id = &rest[..close];
    if !valid_id(id) {
        return Err(ParseError::new(line_no, format!("invalid task id '{}'", id)));
    }

    let (head, entries) = split_annotations(&rest[close + 1..]);
    let head = head.trim();
    if !head.ends_with(')') {
        let expected = if is_ref { "(<uri>)" } else { "(<status>)" };
        return Err(ParseError::new(
            line_no,
            format!("expected '{}' after the short name", expected),
        ));
    }
    let open = head
        .rfind('(')
        .ok_or_else(|| ParseError::new(line_no, "unmatched ')' in block header"))?;
    let name = head[..open].trim();
    if name.is_empty() {
        return Err(ParseError::new(line_no, "missing short name"));
    }
    let inner = head[open + 1..head.len() - 1].trim();

    let kind = if is_ref {
        if inner.is_empty() || inner.chars().any(char::is_whitespace) {
            return Err(ParseError::new(
                line_no,
                "reference URI must be a single non-whitespace token",
            ));
        }
        HeaderKind::Ref(inner.to_string())
    } else {
        let status = Status::from_token(inner)
            .ok_or_else(|| ParseError::new(line_no, format!("unknown status '{}'", inner)))?;
        HeaderKind::Task(status)
    };

    let mut annotations = Annotations::new();
    for (key, values) in entries {
        annotations.set(key, values);
    }

    Ok(Header {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        annotations,
    })
}

/// Strips trailing ` @key(v1,v2,...)` annotation suffixes from a header
/// tail, returning the remaining head and the entries in left-to-right
/// order. Empty parentheses produce an empty value list (flag semantics).
fn split_annotations(tail: &str) -> (&str, Vec<(String, Vec<String>)>) {
    let mut rest = tail.trim_end();
    let mut collected: Vec<(String, Vec<String>)> = Vec::new();

    loop {
        if !rest.ends_with(')') {
            break;
        }
        let Some(open) = rest.rfind('(') else { break };
        let before = &rest[..open];

        // the key sits between a '@' and the '(', preceded by whitespace
        let bytes = before.as_bytes();
        let mut key_start = open;
        while key_start > 0 {
            let c = bytes[key_start - 1];
            if c.is_ascii_alphanumeric() || c == b'-' || c == b'_' {
                key_start -= 1;
            } else {
                break;
            }
        }
        if key_start == open || key_start == 0 || bytes[key_start - 1] != b'@' {
            break;
        }
        let at = key_start - 1;
        if !before[..at].ends_with(|c: char| c.is_whitespace()) {
            break;
        }

        let key = before[key_start..open].to_string();
        let inner = rest[open + 1..rest.len() - 1].trim();
        let values = if inner.is_empty() {
            Vec::new()
        } else {
            inner.split(',').map(|v| v.trim().to_string()).collect()
        };
        collected.push((key, values));
        rest = before[..at].trim_end();
    }

    collected.reverse();
    (rest, collected)
}

fn attachment_line(line: &str) -> Option<(AttachmentClass, &str)> {
    for class in [
        AttachmentClass::Artifact,
        AttachmentClass::Guidance,
        AttachmentClass::File,
    ] {
        if let Some(rest) = line
            .strip_prefix('@')
            .and_then(|r| r.strip_prefix(class.as_str()))
            .and_then(|r| r.strip_prefix(' '))
        {
            return Some((class, rest));
        }
    }
    None
}

fn parse_attachment(
    class: AttachmentClass,
    rest: &str,
    line_no: usize,
) -> Result<Attachment, ParseError> {
    let mut tokens = rest.split_whitespace();
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(mime), Some(uri), None) => Ok(Attachment::new(class, mime, uri)),
        _ => Err(ParseError::new(
            line_no,
            format!("attachment line must be '@{} <mime> <uri>'", class),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Status;
    use crate::error::{Constraint, VineError};

    fn parse_err(text: &str) -> ParseError {
        match parse(text).unwrap_err() {
            VineError::Parse(e) => e,
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn minimal_graph() {
        let graph = parse("vine 1.0.0\n---\n[root] Root (notstarted)\n").unwrap();
        assert_eq!(graph.version(), "1.0.0");
        assert_eq!(graph.root_id(), "root");
        assert_eq!(graph.root().name, "Root");
        assert_eq!(graph.root().status(), Some(Status::NotStarted));
    }

    #[test]
    fn missing_magic_line() {
        let err = parse_err("hello\n---\n[a] A (notstarted)\n");
        assert_eq!(err.line, 1);

        let err = parse_err("");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn malformed_version() {
        let err = parse_err("vine 1.0\n---\n[a] A (notstarted)\n");
        assert_eq!(err.line, 1);

        let err = parse_err("vine 1.0.x\n---\n[a] A (notstarted)\n");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn preamble_keys() {
        let text = "vine 1.2.0\ntitle: My Plan\ndelimiter: ***\nprefix: lib\nunknown: ignored\n---\n[root] Root (planning)\n***\n[a] A (complete)\n";
        // root needs a dependency to avoid an island; rebuild with one
        let text = text.replace("[root] Root (planning)", "[root] Root (planning)\n-> a");
        let graph = parse(&text).unwrap();

        assert_eq!(graph.title(), Some("My Plan"));
        assert_eq!(graph.delimiter(), "***");
        assert_eq!(graph.prefix(), Some("lib"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn explicit_empty_prefix_is_preserved() {
        let graph = parse("vine 1.1.0\nprefix:\n---\n[root] Root (notstarted)\n").unwrap();
        assert_eq!(graph.prefix(), Some(""));

        let graph = parse("vine 1.1.0\n---\n[root] Root (notstarted)\n").unwrap();
        assert_eq!(graph.prefix(), None);
    }

    #[test]
    fn missing_preamble_terminator() {
        let err = parse_err("vine 1.0.0\ntitle: x\n");
        assert!(err.message.contains("terminator"));
    }

    #[test]
    fn malformed_preamble_line() {
        let err = parse_err("vine 1.0.0\nnot a pair\n---\n[a] A (notstarted)\n");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn zero_blocks_is_an_error() {
        let err = parse_err("vine 1.0.0\n---\n");
        assert!(err.message.contains("no task blocks"));

        // blank trailing segments are discarded, not parsed
        let err = parse_err("vine 1.0.0\n---\n\n\n");
        assert!(err.message.contains("no task blocks"));
    }

    #[test]
    fn trailing_delimiter_tolerated() {
        let graph = parse("vine 1.0.0\n---\n[root] Root (started)\n---\n").unwrap();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn dependencies_decisions_and_descriptions() {
        let text = "vine 1.0.0\n---\n\
                    [root] Root (started)\n\
                    First paragraph.\n\
                    \n\
                    Second paragraph.\n\
                    -> a\n\
                    > Chose the simple path.\n\
                    ---\n\
                    [a] Step A (complete)\n";
        let graph = parse(text).unwrap();
        let root = graph.root();

        assert_eq!(root.description, "First paragraph.\n\nSecond paragraph.");
        assert_eq!(root.depends_on, ["a"]);
        assert_eq!(root.decisions, ["Chose the simple path."]);
    }

    #[test]
    fn unknown_at_line_falls_through_to_description() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n@mention someone\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.root().description, "@mention someone");
    }

    #[test]
    fn attachments_on_concrete_tasks() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n\
                    @artifact text/markdown notes/design.md\n\
                    @guidance text/plain docs/howto.txt\n\
                    @file application/json data.json\n";
        let graph = parse(text).unwrap();
        let attachments = graph.root().attachments();

        assert_eq!(attachments.len(), 3);
        assert_eq!(attachments[0].class, AttachmentClass::Artifact);
        assert_eq!(attachments[0].mime, "text/markdown");
        assert_eq!(attachments[0].uri, "notes/design.md");
        assert_eq!(attachments[2].class, AttachmentClass::File);
    }

    #[test]
    fn attachment_missing_uri_is_an_error() {
        let err = parse_err("vine 1.0.0\n---\n[root] Root (started)\n@artifact text/plain\n");
        assert_eq!(err.line, 4);
        assert!(err.message.contains("attachment"));
    }

    #[test]
    fn attachment_on_reference_is_an_error() {
        let text = "vine 1.1.0\n---\n[root] Root (started)\n-> lib\n---\n\
                    ref [lib] Lib (lib.vine)\n@file text/plain x\n";
        let err = parse_err(text);
        assert_eq!(err.line, 7);
        assert!(err.message.contains("reference"));
    }

    #[test]
    fn reference_nodes_gated_by_version() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n-> lib\n---\nref [lib] Lib (lib.vine)\n";
        let err = parse_err(text);
        assert_eq!(err.line, 6);
        assert!(err.message.contains("1.1.0"));

        let ok = text.replace("vine 1.0.0", "vine 1.1.0");
        let graph = parse(&ok).unwrap();
        assert_eq!(graph.task("lib").unwrap().uri(), Some("lib.vine"));
    }

    #[test]
    fn annotations_parse_values_and_flags() {
        let text =
            "vine 1.2.0\n---\n[root] Root (started) @owner(alice, bob) @urgent() @size(3)\n";
        let graph = parse(text).unwrap();
        let annotations = &graph.root().annotations;

        assert_eq!(
            annotations.get("owner"),
            Some(&["alice".to_string(), "bob".to_string()] as &[String])
        );
        assert_eq!(annotations.get("urgent"), Some(&[] as &[String]));
        assert_eq!(annotations.get("size"), Some(&["3".to_string()] as &[String]));
        assert_eq!(annotations.get("absent"), None);
    }

    #[test]
    fn annotations_tolerated_before_1_2_0() {
        let text = "vine 1.0.0\n---\n[root] Root (started) @flag()\n";
        let graph = parse(text).unwrap();
        assert!(graph.root().annotations.contains("flag"));
    }

    #[test]
    fn annotations_on_reference_headers() {
        let text =
            "vine 1.2.0\n---\n[root] Root (started)\n-> lib\n---\nref [lib] Lib (lib.vine) @pinned()\n";
        let graph = parse(text).unwrap();
        assert!(graph.task("lib").unwrap().annotations.contains("pinned"));
    }

    #[test]
    fn name_with_parentheses() {
        let text = "vine 1.0.0\n---\n[root] Fix (old) bug (started)\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.root().name, "Fix (old) bug");
        assert_eq!(graph.root().status(), Some(Status::Started));
    }

    #[test]
    fn header_errors() {
        let err = parse_err("vine 1.0.0\n---\nRoot (started)\n");
        assert!(err.message.contains("[id]"));

        let err = parse_err("vine 1.0.0\n---\n[bad id] Root (started)\n");
        assert!(err.message.contains("invalid task id"));

        let err = parse_err("vine 1.0.0\n---\n[root] Root\n");
        assert!(err.message.contains("(<status>)"));

        let err = parse_err("vine 1.0.0\n---\n[root] Root (done)\n");
        assert!(err.message.contains("unknown status"));

        let err = parse_err("vine 1.0.0\n---\n[root] (started)\n");
        assert!(err.message.contains("short name"));

        let err = parse_err("vine 1.1.0\n---\nref [lib] Lib (two tokens)\n");
        assert!(err.message.contains("non-whitespace"));
    }

    #[test]
    fn segmented_ids() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n-> lib/util\n---\n[lib/util] Util (complete)\n";
        let graph = parse(text).unwrap();
        assert!(graph.contains("lib/util"));
    }

    #[test]
    fn duplicate_id_points_at_duplicate_block() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n-> root\n---\n[root] Again (started)\n";
        // the self-dependency keeps the second block wired; the duplicate
        // check fires before validation either way
        let err = parse_err(text);
        assert_eq!(err.line, 6);
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn structural_violations_surface_as_validation_errors() {
        let text = "vine 1.0.0\n---\n[root] Root (started)\n---\n[island] Lost (started)\n";
        match parse(text).unwrap_err() {
            VineError::Validation(v) => assert_eq!(v.constraint, Constraint::NoIslands),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn custom_delimiter_leaves_plain_dashes_in_content() {
        let text = "vine 1.0.0\ndelimiter: ===\n---\n[root] Root (started)\n---\nstill the same block\n===\n[a] A (complete)\n";
        // "---" is content once a custom delimiter is declared, so root's
        // description keeps it; but root has no dependency on a -> island
        let text = text.replace("[root] Root (started)", "[root] Root (started)\n-> a");
        let graph = parse(&text).unwrap();
        assert!(graph.root().description.contains("---"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn crlf_input_accepted() {
        let text = "vine 1.0.0\r\n---\r\n[root] Root (started)\r\n";
        let graph = parse(text).unwrap();
        assert_eq!(graph.root().name, "Root");
    }
}
