//! Line-level layout of a block-style YAML document.
//!
//! Finds the byte range of a block sequence reachable through a path of
//! mapping keys, and splits it into one range per item. Only block style
//! is understood; flow collections on the path are rejected.

use std::ops::Range;

/// One physical line of the document.
#[derive(Debug, Clone)]
struct Line<'a> {
    /// Byte offset of the first character
    start: usize,
    /// Byte offset just past the line terminator
    end: usize,
    /// Text without the terminator
    content: &'a str,
    indent: usize,
    /// Empty, whitespace only, comment only, or a document marker
    blank: bool,
    /// Content of a block scalar (`key: |`), comment-like or not
    in_scalar: bool,
}

impl<'a> Line<'a> {
    fn body(&self) -> &'a str {
        &self.content[self.indent..]
    }

    fn is_seq_item(&self) -> bool {
        !self.blank && !self.in_scalar && (self.body() == "-" || self.body().starts_with("- "))
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    // Column that block scalar content must be indented past.
    let mut scalar_parent: Option<usize> = None;

    for raw in text.split_inclusive('\n') {
        let content = raw.trim_end_matches('\n').trim_end_matches('\r');
        let indent = content.len() - content.trim_start_matches(' ').len();
        let trimmed = content.trim();

        let in_scalar =
            scalar_parent.is_some_and(|parent| !trimmed.is_empty() && indent > parent);
        if !in_scalar && !trimmed.is_empty() {
            scalar_parent = None;
        }

        let blank = !in_scalar
            && (trimmed.is_empty()
                || trimmed.starts_with('#')
                || (indent == 0 && (trimmed == "---" || trimmed.starts_with('%'))));
        if !blank && !in_scalar {
            scalar_parent = block_scalar_column(content, indent);
        }

        lines.push(Line {
            start: offset,
            end: offset + raw.len(),
            content,
            indent,
            blank,
            in_scalar,
        });
        offset += raw.len();
    }
    lines
}

/// Column of the key when the line opens a block scalar (`key: |`, `- key: >-`).
fn block_scalar_column(content: &str, indent: usize) -> Option<usize> {
    let mut column = indent;
    let mut body = &content[indent..];
    while let Some(rest) = body
        .strip_prefix('-')
        .filter(|r| r.is_empty() || r.starts_with(' '))
    {
        let next = rest.trim_start_matches(' ');
        column += body.len() - next.len();
        body = next;
    }

    let (_, value) = mapping_key(body)?;
    let value = value.split_once(" #").map_or(value, |(v, _)| v).trim_end();
    let mut chars = value.chars();
    let opens = matches!(chars.next(), Some('|') | Some('>'))
        && chars.all(|c| c.is_ascii_digit() || c == '+' || c == '-');
    opens.then_some(column)
}

/// Split `key: rest` into key and the text after the colon.
///
/// Handles plain and quoted keys; returns `None` for sequence items and
/// for lines that are not mapping entries.
pub(crate) fn mapping_key(body: &str) -> Option<(String, &str)> {
    if body.starts_with('-') && (body.len() == 1 || body[1..].starts_with(' ')) {
        return None;
    }

    let quote = body.chars().next().filter(|c| *c == '"' || *c == '\'');
    let (key, after) = if let Some(quote) = quote {
        let close = body[1..].find(quote)? + 1;
        (body[1..close].to_string(), &body[close + 1..])
    } else {
        let colon = body
            .char_indices()
            .find(|(i, c)| {
                *c == ':' && matches!(body[i + 1..].chars().next(), None | Some(' ') | Some('\t'))
            })
            .map(|(i, _)| i)?;
        (body[..colon].trim_end().to_string(), &body[colon..])
    };

    let rest = after.trim_start().strip_prefix(':')?;
    Some((key, rest.trim()))
}

/// Value text after `key:` is empty or only a comment.
fn opens_block(rest: &str) -> bool {
    rest.is_empty() || rest.starts_with('#')
}

/// Value text after `key:` is `[]`, optionally followed by a comment.
fn is_empty_flow(rest: &str) -> bool {
    rest.strip_prefix("[]").is_some_and(|r| {
        let r = r.trim_start();
        r.is_empty() || r.starts_with('#')
    })
}

/// Location of the matrix sequence and its items.
///
/// An empty sequence is written `key: []`; its region is the `[]` and it
/// has no items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SequenceLayout {
    /// Bytes covered by the items: first dash to end of the last content line
    pub region: Range<usize>,
    /// One range per item, contiguous, covering `region`
    pub items: Vec<Range<usize>>,
    /// Column of the item dashes
    pub dash_indent: usize,
    /// Offset of the value or comment following the sequence's `key:`
    pub value_at: usize,
    /// End of the sequence's key line, terminator included
    pub key_line_end: usize,
}

/// Reasons a path could not be followed through the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LayoutError {
    MissingKey(String),
    NotBlock(String),
    EmptySequence(String),
}

impl std::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutError::MissingKey(k) => write!(f, "key `{k}` not found in document text"),
            LayoutError::NotBlock(k) => write!(f, "`{k}` must be written in block style"),
            LayoutError::EmptySequence(k) => write!(f, "`{k}` has no block sequence items"),
        }
    }
}

/// Locate the block sequence at `path` and split it into items.
pub(crate) fn locate_sequence(text: &str, path: &[&str]) -> Result<SequenceLayout, LayoutError> {
    let lines = split_lines(text);

    // Lines (by index) belonging to the current mapping block.
    let mut scope = 0..lines.len();
    let mut value_at = 0;
    let mut key_line_end = 0;

    for (depth, key) in path.iter().enumerate() {
        let child_indent = lines[scope.clone()]
            .iter()
            .find(|l| !l.blank)
            .map(|l| l.indent)
            .ok_or_else(|| LayoutError::MissingKey(key.to_string()))?;

        let (idx, rest) = scope
            .clone()
            .filter(|&i| !lines[i].blank && !lines[i].in_scalar)
            .filter(|&i| lines[i].indent == child_indent)
            .find_map(|i| match mapping_key(lines[i].body()) {
                Some((k, rest)) if k == *key => Some((i, rest)),
                _ => None,
            })
            .ok_or_else(|| LayoutError::MissingKey(key.to_string()))?;

        let last = depth + 1 == path.len();
        let key_line = &lines[idx];
        if last {
            // `rest` is trimmed, so it ends where the line's content does.
            value_at = key_line.start + key_line.content.trim_end().len() - rest.len();
            key_line_end = key_line.end;
        }

        if last && is_empty_flow(rest) {
            return Ok(SequenceLayout {
                region: value_at..value_at + 2,
                items: Vec::new(),
                dash_indent: key_line.indent + 2,
                value_at,
                key_line_end,
            });
        }
        if !opens_block(rest) {
            return Err(LayoutError::NotBlock(key.to_string()));
        }

        let indent = key_line.indent;
        let mut end = idx + 1;
        let mut last_content = idx;
        // A sequence may sit at the same column as its key.
        let compact_seq = last
            && lines[idx + 1..]
                .iter()
                .find(|l| !l.blank)
                .is_some_and(|l| l.indent == indent && l.is_seq_item());

        while end < lines.len() {
            let line = &lines[end];
            if !line.blank {
                let inside = line.indent > indent
                    || (compact_seq && line.indent == indent && line.is_seq_item());
                if !inside {
                    break;
                }
                last_content = end;
            }
            end += 1;
        }

        scope = idx + 1..last_content + 1;
    }

    let key = path.last().copied().unwrap_or_default();
    let first = scope
        .clone()
        .find(|&i| !lines[i].blank)
        .ok_or_else(|| LayoutError::EmptySequence(key.to_string()))?;
    if !lines[first].is_seq_item() {
        return Err(LayoutError::NotBlock(key.to_string()));
    }
    let dash_indent = lines[first].indent;

    let starts: Vec<usize> = scope
        .clone()
        .filter(|&i| lines[i].indent == dash_indent && lines[i].is_seq_item())
        .map(|i| lines[i].start)
        .collect();

    let region_end = lines[scope.end - 1].end;
    let items = starts
        .iter()
        .enumerate()
        .map(|(n, &s)| s..starts.get(n + 1).copied().unwrap_or(region_end))
        .collect();

    Ok(SequenceLayout {
        region: lines[first].start..region_end,
        items,
        dash_indent,
        value_at,
        key_line_end,
    })
}

/// Remove `cols` leading spaces from every line that has them.
pub(crate) fn dedent(text: &str, cols: usize) -> String {
    let pad = " ".repeat(cols);
    text.split_inclusive('\n')
        .map(|line| line.strip_prefix(pad.as_str()).unwrap_or(line))
        .collect()
}
