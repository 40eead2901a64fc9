//! YAML front matter: locating the block, reading `tags` and `type`, and
//! rewriting the `tags` field in place.
//!
//! Only the lines belonging to the top-level `tags` key are ever replaced.
//! Every other byte of the note, including key order, comments and the body,
//! is preserved.

use std::ops::Range;

use serde_yaml::Value;
use thiserror::Error;

/// Errors raised while reading or rewriting front matter.
#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("invalid YAML front matter: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("front matter is not a key/value mapping")]
    NotAMapping,

    #[error("tags field has an unsupported shape: {0}")]
    InvalidTags(String),

    #[error("note has no front matter block")]
    NoFrontmatter,

    #[error("could not locate a top-level tags line to rewrite")]
    TagsFieldNotFound,

    #[error("rewritten tags read back as {found:?}, expected {expected:?}")]
    RewriteMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// A front matter block borrowed from the note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    pub yaml: &'a str,
    pub body: &'a str,
    yaml_range: Range<usize>,
}

/// State of the `tags` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagsField {
    Missing,
    Empty,
    Present(Vec<String>),
}

/// The front matter fields this crate reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    pub note_type: Option<String>,
    pub tags: TagsField,
}

/// Splits `text` into front matter and body.
///
/// The first line must be `---` (a UTF-8 BOM is tolerated); the block ends at
/// the next line that is `---` or `...`. Returns `None` when either delimiter
/// is missing.
pub fn split_frontmatter(text: &str) -> Option<Frontmatter<'_>> {
    let start = if text.starts_with('\u{feff}') {
        '\u{feff}'.len_utf8()
    } else {
        0
    };

    let mut lines = text[start..].split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let yaml_start = start + first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return Some(Frontmatter {
                yaml: &text[yaml_start..offset],
                body: &text[offset + line.len()..],
                yaml_range: yaml_start..offset,
            });
        }
        offset += line.len();
    }

    None
}

/// Parses the `type` and `tags` fields out of a front matter block.
///
/// `tags` may be a sequence (inline or block) or a comma-separated scalar.
/// Numeric and boolean items are kept as their text; null items become
/// empty strings so they are counted and dropped downstream.
///
/// # Errors
///
/// Returns an error for invalid YAML, a non-mapping document, or a `tags`
/// value containing nested structures.
pub fn parse_fields(yaml: &str) -> Result<NoteFields, FrontmatterError> {
    let empty = NoteFields {
        note_type: None,
        tags: TagsField::Missing,
    };
    if yaml.trim().is_empty() {
        return Ok(empty);
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(FrontmatterError::Yaml)?;
    let mapping = match value {
        Value::Null => return Ok(empty),
        Value::Mapping(mapping) => mapping,
        _ => return Err(FrontmatterError::NotAMapping),
    };

    let note_type = mapping.get("type").and_then(scalar_text);
    let tags = match mapping.get("tags") {
        None => TagsField::Missing,
        Some(value) => parse_tags_value(value)?,
    };

    Ok(NoteFields { note_type, tags })
}

fn parse_tags_value(value: &Value) -> Result<TagsField, FrontmatterError> {
    let tags: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => Ok(String::new()),
                other => scalar_text(other).ok_or_else(|| {
                    FrontmatterError::InvalidTags(format!("nested value {other:?}"))
                }),
            })
            .collect::<Result<_, _>>()?,
        Value::Bool(_) | Value::Number(_) => scalar_text(value).into_iter().collect(),
        other => return Err(FrontmatterError::InvalidTags(format!("{other:?}"))),
    };

    if tags.is_empty() {
        Ok(TagsField::Empty)
    } else {
        Ok(TagsField::Present(tags))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListStyle {
    Inline,
    Block,
}

/// Returns the text after the colon when `line` is the top-level `tags` key.
fn tags_key_rest(line: &str) -> Option<&str> {
    ["tags", "\"tags\"", "'tags'"].iter().find_map(|key| {
        line.strip_prefix(key)?
            .trim_start_matches([' ', '\t'])
            .strip_prefix(':')
    })
}

/// Lines that may belong to the value of the key above them. Comments do
/// not end a block list; only the next top-level key does.
fn is_continuation(line: &str) -> bool {
    line.starts_with([' ', '\t', '-']) || is_blank_or_comment(line)
}

fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Rewrites the top-level `tags` field of `text` to `tags`.
///
/// The existing list style (inline `[a, b]` or block `- a`) and block
/// indentation are kept. The result is re-parsed and must read back as
/// exactly `tags`.
///
/// # Errors
///
/// Returns an error when the note has no front matter, no `tags` line can be
/// located, or the rewritten block does not read back as `tags`.
pub fn replace_tags(text: &str, tags: &[String]) -> Result<String, FrontmatterError> {
    let frontmatter = split_frontmatter(text).ok_or(FrontmatterError::NoFrontmatter)?;
    let base = frontmatter.yaml_range.start;
    let lines: Vec<&str> = frontmatter.yaml.split_inclusive('\n').collect();

    let mut offset = base;
    let mut found = None;
    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = tags_key_rest(line) {
            found = Some((i, offset, rest));
            break;
        }
        offset += line.len();
    }
    let (key_index, span_start, rest) = found.ok_or(FrontmatterError::TagsFieldNotFound)?;

    let mut span_lines = 1;
    while let Some(next) = lines.get(key_index + span_lines) {
        if !is_continuation(next) {
            break;
        }
        span_lines += 1;
    }
    while span_lines > 1 && is_blank_or_comment(lines[key_index + span_lines - 1]) {
        span_lines -= 1;
    }
    let span_end = span_start
        + lines[key_index..key_index + span_lines]
            .iter()
            .map(|l| l.len())
            .sum::<usize>();

    let key_line = lines[key_index];
    let eol = if key_line.ends_with("\r\n") { "\r\n" } else { "\n" };
    let style = if rest.trim_start().starts_with('[') {
        ListStyle::Inline
    } else {
        ListStyle::Block
    };
    let indent = lines[key_index + 1..key_index + span_lines]
        .iter()
        .find(|l| l.trim_start().starts_with('-'))
        .map(|l| &l[..l.len() - l.trim_start().len()])
        .unwrap_or("  ");

    let rendered = render_tags(tags, style, indent, eol);

    let mut output = String::with_capacity(text.len() + rendered.len());
    output.push_str(&text[..span_start]);
    output.push_str(&rendered);
    output.push_str(&text[span_end..]);

    verify_tags(&output, tags)?;
    Ok(output)
}

fn render_tags(tags: &[String], style: ListStyle, indent: &str, eol: &str) -> String {
    if tags.is_empty() {
        return format!("tags: []{eol}");
    }
    match style {
        ListStyle::Inline => {
            let items: Vec<String> = tags.iter().map(|t| yaml_scalar(t)).collect();
            format!("tags: [{}]{eol}", items.join(", "))
        }
        ListStyle::Block => {
            let mut out = format!("tags:{eol}");
            for tag in tags {
                out.push_str(indent);
                out.push_str("- ");
                out.push_str(&yaml_scalar(tag));
                out.push_str(eol);
            }
            out
        }
    }
}

/// Renders a tag as a YAML scalar, quoting anything that is not a plain
/// lowercase word.
fn yaml_scalar(tag: &str) -> String {
    let plain = tag.chars().next().is_some_and(|c| c.is_ascii_lowercase())
        && tag
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-_./".contains(c))
        && !matches!(tag, "null" | "true" | "false");
    if plain {
        tag.to_string()
    } else {
        serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{tag}\""))
    }
}

fn verify_tags(text: &str, expected: &[String]) -> Result<(), FrontmatterError> {
    let frontmatter = split_frontmatter(text).ok_or(FrontmatterError::NoFrontmatter)?;
    let found = match parse_fields(frontmatter.yaml)?.tags {
        TagsField::Present(tags) => tags,
        TagsField::Empty | TagsField::Missing => Vec::new(),
    };
    if found == expected {
        Ok(())
    } else {
        Err(FrontmatterError::RewriteMismatch {
            expected: expected.to_vec(),
            found,
        })
    }
}
