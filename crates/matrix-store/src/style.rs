//! Rendering new matrix rows in the file's own style.
//!
//! `EntryStyle` is learned from an existing row: dash column, key column,
//! key order, and the scalar style used for each key. `ChompFixup`
//! enforces the project's block-scalar convention on rendered text.

use regex::Regex;
use serde_yaml::Value;

use crate::distro::MatrixEntry;
use crate::layout::mapping_key;

/// How a scalar value is written after `key:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    /// `|` / `|-` / `|+` block, content indented `indent` columns past the key
    Literal { indent: usize },
}

impl ScalarStyle {
    /// Classify the text following `key:` on a row line.
    fn detect(rest: &str, next_line_indent: Option<usize>, key_indent: usize) -> Self {
        match rest.chars().next() {
            Some('"') => ScalarStyle::DoubleQuoted,
            Some('\'') => ScalarStyle::SingleQuoted,
            Some('|') | Some('>') => ScalarStyle::Literal {
                indent: next_line_indent
                    .filter(|i| *i > key_indent)
                    .map_or(2, |i| i - key_indent),
            },
            _ => ScalarStyle::Plain,
        }
    }
}

/// Layout and per-key styles of one matrix row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStyle {
    /// Column of the `-`
    pub dash_indent: usize,
    /// Column of the row's keys
    pub key_indent: usize,
    /// Keys in source order with their styles
    pub fields: Vec<(String, ScalarStyle)>,
    /// `"\n"` or `"\r\n"`, as the row was written
    pub line_ending: &'static str,
}

impl Default for EntryStyle {
    fn default() -> Self {
        EntryStyle {
            dash_indent: 2,
            key_indent: 4,
            fields: vec![
                ("distro".to_string(), ScalarStyle::Plain),
                ("image".to_string(), ScalarStyle::DoubleQuoted),
                ("setup".to_string(), ScalarStyle::Literal { indent: 2 }),
                ("installer".to_string(), ScalarStyle::DoubleQuoted),
                ("verify_package".to_string(), ScalarStyle::DoubleQuoted),
            ],
            line_ending: "\n",
        }
    }
}

/// Line terminator used by the first line of `text`.
pub(crate) fn line_ending_of(text: &str) -> &'static str {
    match text.find('\n') {
        Some(i) if text[..i].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

impl EntryStyle {
    /// Default style with the dashes at `dash_indent`.
    pub fn with_dash_indent(mut self, dash_indent: usize) -> Self {
        self.dash_indent = dash_indent;
        self.key_indent = dash_indent + 2;
        self
    }

    pub fn with_line_ending(mut self, line_ending: &'static str) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Learn the style of a row from its source text.
    ///
    /// `item` is the exact text of one sequence item, starting at the line
    /// holding its dash.
    pub fn learn(item: &str) -> Self {
        let lines: Vec<&str> = item.lines().collect();
        let Some(first) = lines.first() else {
            return Self::default();
        };

        let dash_indent = first.len() - first.trim_start_matches(' ').len();
        let after_dash = first.get(dash_indent + 1..).unwrap_or_default();
        let key_indent = dash_indent + 1 + (after_dash.len() - after_dash.trim_start().len());
        if after_dash.trim().is_empty() {
            // `-` alone on its line; keys are not rendered in that layout.
            return Self::default();
        }

        let mut fields = Vec::new();
        for (n, line) in lines.iter().enumerate() {
            let indent = line.len() - line.trim_start_matches(' ').len();
            let body = if n == 0 {
                &line[key_indent.min(line.len())..]
            } else if indent == key_indent {
                &line[indent..]
            } else {
                continue;
            };
            if body.starts_with('#') {
                continue;
            }
            let Some((key, rest)) = mapping_key(body) else {
                continue;
            };
            let next_indent = lines[n + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.len() - l.trim_start_matches(' ').len());
            fields.push((key, ScalarStyle::detect(rest, next_indent, key_indent)));
        }

        EntryStyle {
            dash_indent,
            key_indent,
            fields,
            line_ending: line_ending_of(item),
        }
    }

    fn style_of(&self, key: &str) -> Option<&ScalarStyle> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, s)| s)
    }

    /// Render `entry` as a sequence item, terminated by the row's line ending.
    ///
    /// Keys follow the learned order; known keys the style lacks are
    /// appended when non-empty, plain style.
    pub fn render(&self, entry: &MatrixEntry) -> String {
        let mut keys: Vec<&str> = self
            .fields
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| MatrixEntry::KEYS.contains(k))
            .collect();
        for key in MatrixEntry::KEYS {
            if !keys.contains(&key) && entry.field(key).is_some_and(|v| !v.is_empty()) {
                keys.push(key);
            }
        }
        // `distro` always opens the row.
        keys.retain(|k| *k != "distro");
        keys.insert(0, "distro");

        let mut out = String::new();
        for (n, key) in keys.iter().enumerate() {
            let value = entry.field(key).unwrap_or_default();
            let style = self.style_of(key).cloned().unwrap_or(ScalarStyle::Plain);
            if n == 0 {
                out.push_str(&" ".repeat(self.dash_indent));
                out.push('-');
                let gap = self.key_indent.saturating_sub(self.dash_indent + 1).max(1);
                out.push_str(&" ".repeat(gap));
            } else {
                out.push_str(&" ".repeat(self.key_indent));
            }
            out.push_str(key);
            out.push(':');
            out.push_str(&render_scalar(value, &style, self.key_indent, self.line_ending));
            out.push_str(self.line_ending);
        }
        out
    }
}

/// Text following `key:` for `value`, including the leading space.
fn render_scalar(value: &str, style: &ScalarStyle, key_indent: usize, eol: &str) -> String {
    let style = match style {
        _ if value.contains('\n') => match style {
            ScalarStyle::Literal { .. } => style.clone(),
            _ => ScalarStyle::Literal { indent: 2 },
        },
        ScalarStyle::Plain if !is_plain_safe(value) => ScalarStyle::DoubleQuoted,
        other => other.clone(),
    };

    match style {
        ScalarStyle::Plain => format!(" {value}"),
        ScalarStyle::SingleQuoted => format!(" '{}'", value.replace('\'', "''")),
        ScalarStyle::DoubleQuoted => format!(" {}", double_quote(value)),
        ScalarStyle::Literal { indent } => {
            render_literal(value, key_indent + indent, indent, eol)
        }
    }
}

/// JSON string syntax is valid YAML double-quoted syntax.
fn double_quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.escape_default()))
}

/// A plain scalar that reads back as the same string.
fn is_plain_safe(value: &str) -> bool {
    if value.is_empty() || value.trim() != value {
        return false;
    }
    matches!(serde_yaml::from_str::<Value>(value), Ok(Value::String(ref s)) if s == value)
}

fn render_literal(value: &str, content_indent: usize, rel_indent: usize, eol: &str) -> String {
    let body = value.trim_end_matches('\n');
    let trailing = value.len() - body.len();
    let chomp = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };
    // Leading spaces on the first line need an explicit indentation indicator.
    let indicator = if body.starts_with(' ') {
        rel_indent.to_string()
    } else {
        String::new()
    };

    let pad = " ".repeat(content_indent);
    let mut out = format!(" |{indicator}{chomp}");
    for line in body.split('\n') {
        out.push_str(eol);
        if !line.is_empty() {
            out.push_str(&pad);
            out.push_str(line);
        }
    }
    for _ in 1..trailing {
        out.push_str(eol);
    }
    out
}

/// Rewrites the strip indicator `|-` to clip `|` on selected keys.
///
/// The workflow convention is that multi-line scripts keep their final
/// newline; generic emitters pick `|-` for values without one.
#[derive(Debug, Clone)]
pub struct ChompFixup {
    pattern: Option<Regex>,
}

impl ChompFixup {
    /// Keys whose block scalars default to clip chomping.
    pub const DEFAULT_KEYS: [&'static str; 2] = ["setup", "run"];

    pub fn new<S: AsRef<str>>(keys: &[S]) -> Self {
        if keys.is_empty() {
            return ChompFixup { pattern: None };
        }
        let alternation = keys
            .iter()
            .map(|k| regex::escape(k.as_ref()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern =
            format!(r"(?m)^([ \t]*(?:-[ \t]+)?(?:{alternation}):[ \t]*)\|-([ \t]*\r?)$");
        ChompFixup {
            pattern: Regex::new(&pattern).ok(),
        }
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re.replace_all(text, "${1}|${2}").into_owned(),
            None => text.to_string(),
        }
    }
}

impl Default for ChompFixup {
    fn default() -> Self {
        Self::new(&Self::DEFAULT_KEYS)
    }
}
