//! Vote journal filtering and repair
//!
//! A journal line in a commit patch looks like
//!
//! ```text
//! +{"version":"1","action":"add"}{"castvote":{...},"receipt":"..."}
//! ```
//!
//! Only added lines tagged `add` or `addlike` are kept. The payload objects
//! are then re-emitted as one JSON array so they can be decoded in a single
//! pass.
//!
//! Both the tag and the payload are read with a brace scanner that tracks
//! string literals, so braces or tag-like text inside ticket, signature or
//! receipt values never split an entry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// Shape of the text a section came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceShape {
    /// `git log -p` output (git binary or libgit2 rendering)
    CliText,
    /// `files[].patch` of the REST commits endpoint
    ApiPatch,
}

/// Action recorded by a journal tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalAction {
    Add,
    Del,
    AddLike,
    Other(String),
}

impl JournalAction {
    fn from_tag(action: &str) -> Self {
        match action {
            "add" => Self::Add,
            "del" => Self::Del,
            "addlike" => Self::AddLike,
            other => Self::Other(other.to_string()),
        }
    }

    /// The journal is append-only: `del` never retracts an earlier add.
    pub fn is_selected(&self) -> bool {
        matches!(self, Self::Add | Self::AddLike)
    }
}

/// Outcome of repairing one file section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalText {
    /// Array text ready for decoding
    Array(String),
    /// No add/addlike entries in the section
    NoVotes,
}

#[derive(Deserialize)]
struct JournalTag {
    #[serde(default)]
    version: String,
    action: String,
}

/// `@@ -a,b +c,d @@` hunk range headers of REST patches
static HUNK_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^@@[^\n]*?@@").expect("hunk header regex"));

/// Select, strip and repair the vote entries of one section
pub fn repair_section(section: &str, shape: SourceShape) -> JournalText {
    let normalized = normalize(section, shape);
    let entries = select_entries(&normalized);
    if entries.is_empty() {
        return JournalText::NoVotes;
    }

    match repair(&entries.concat()) {
        Some(array) => JournalText::Array(array),
        None => JournalText::NoVotes,
    }
}

/// Undo the source specific escaping so the line scanner sees plain
/// unified diff text.
pub fn normalize(section: &str, shape: SourceShape) -> String {
    match shape {
        SourceShape::CliText => section.to_string(),
        SourceShape::ApiPatch => {
            let unquoted = unquote(section);
            HUNK_HEADER.replace_all(&unquoted, "\n").into_owned()
        }
    }
}

/// Decode a patch that is still wrapped as a JSON string literal
fn unquote(section: &str) -> String {
    let trimmed = section.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(decoded) = serde_json::from_str::<String>(trimmed) {
            return decoded;
        }
    }
    section.to_string()
}

/// Walk the section line by line and collect the payload object of every
/// added `add`/`addlike` journal line, in order of appearance.
///
/// A payload left open at the end of its line continues on following
/// lines that do not start a new diff line.
pub fn select_entries(section: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut pending: Option<ObjectScanner> = None;

    for line in section.lines() {
        if let Some(mut scanner) = pending.take() {
            if is_diff_line(line) {
                tracing::debug!("vote entry cut short by next diff line");
                entries.push(scanner.into_text());
            } else {
                match scanner.feed(line) {
                    Some(_) => entries.push(scanner.into_text()),
                    None => pending = Some(scanner),
                }
                continue;
            }
        }

        let Some(added) = line.strip_prefix('+') else {
            continue;
        };
        if added.starts_with("++") {
            // +++ b/<path> file header
            continue;
        }

        let Some((action, payload)) = split_tag(added) else {
            continue;
        };
        if !action.is_selected() {
            tracing::trace!(?action, "skipping journal entry");
            continue;
        }

        let payload = payload.trim_start();
        if !payload.starts_with('{') {
            tracing::debug!("journal tag without vote payload");
            continue;
        }

        let mut scanner = ObjectScanner::default();
        match scanner.feed(payload) {
            Some(_) => entries.push(scanner.into_text()),
            None => pending = Some(scanner),
        }
    }

    if let Some(scanner) = pending {
        entries.push(scanner.into_text());
    }

    entries
}

/// Split `{"version":..,"action":..}<payload>` into the action and the
/// remaining text. Returns `None` when the line does not open with a tag.
fn split_tag(text: &str) -> Option<(JournalAction, &str)> {
    let text = text.trim_start();
    if !text.starts_with('{') {
        return None;
    }

    let mut scanner = ObjectScanner::default();
    let end = scanner.feed(text)?;
    let tag: JournalTag = serde_json::from_str(&text[..end]).ok()?;
    if !tag.version.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((JournalAction::from_tag(&tag.action), &text[end..]))
}

fn is_diff_line(line: &str) -> bool {
    matches!(line.chars().next(), Some('+' | '-' | ' ' | '@' | '\\'))
        || line.starts_with("diff ")
        || line.starts_with("index ")
}

/// Rebuild valid array text out of concatenated or already bracketed
/// objects.
///
/// Top level whitespace, brackets and commas are dropped and each object
/// is re-emitted once, comma separated, inside a single pair of brackets.
/// Running the output through again yields the same text. Anything else at
/// the top level is carried over verbatim so decoding reports it.
/// Returns `None` when the text holds no object at all.
pub fn repair(text: &str) -> Option<String> {
    let mut items: Vec<String> = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start_matches(|c: char| {
            c.is_whitespace() || c.is_control() || matches!(c, '[' | ']' | ',')
        });
        if rest.is_empty() {
            break;
        }

        if rest.starts_with('{') {
            let mut scanner = ObjectScanner::default();
            match scanner.feed(rest) {
                Some(end) => {
                    items.push(scanner.into_text());
                    rest = &rest[end..];
                }
                None => {
                    items.push(scanner.into_text());
                    break;
                }
            }
        } else {
            let end = rest.find(['{', '[', ']', ',']).unwrap_or(rest.len());
            items.push(rest[..end].trim().to_string());
            rest = &rest[end..];
        }
    }

    if items.is_empty() {
        return None;
    }
    Some(format!("[{}]", items.join(",")))
}

/// Incremental scanner for one JSON object.
///
/// Whitespace and control characters outside string literals are dropped
/// and control characters inside them are removed, so wrapped or CRLF
/// terminated lines come out as compact JSON.
#[derive(Debug, Default)]
struct ObjectScanner {
    text: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
    closed: bool,
}

impl ObjectScanner {
    /// Consume `input` until the object closes. Returns the byte offset
    /// just past the closing brace, or `None` if more input is needed.
    fn feed(&mut self, input: &str) -> Option<usize> {
        for (idx, c) in input.char_indices() {
            if self.in_string {
                if c.is_control() {
                    continue;
                }
                self.text.push(c);
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            if c.is_whitespace() || c.is_control() {
                continue;
            }
            self.text.push(c);
            match c {
                '"' => self.in_string = true,
                '{' => self.depth += 1,
                '}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.closed = true;
                        return Some(idx + c.len_utf8());
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn into_text(self) -> String {
        if !self.closed {
            tracing::debug!(len = self.text.len(), "unterminated vote entry");
        }
        self.text
    }
}
