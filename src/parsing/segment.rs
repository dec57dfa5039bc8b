//! Splitting a `git log -p` blob into per-commit fragments

use once_cell::sync::Lazy;
use regex::Regex;

/// Record boundary written by `git log`: a line starting with `commit`.
/// Message bodies are indented and diff lines carry a marker column, so
/// only headers can match.
static COMMIT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^commit\b").expect("commit marker regex"));

/// Split a raw multi-commit blob into commit fragments.
///
/// The marker itself is consumed, so every fragment starts with the SHA.
/// Fragments that hold nothing but whitespace or control characters are
/// dropped. Order is preserved exactly as received.
pub fn segment(blob: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;

    for marker in COMMIT_MARKER.find_iter(blob) {
        push_fragment(&mut fragments, &blob[start..marker.start()]);
        start = marker.end();
    }
    push_fragment(&mut fragments, &blob[start..]);

    fragments
}

fn push_fragment<'a>(fragments: &mut Vec<&'a str>, fragment: &'a str) {
    if is_blank(fragment) {
        return;
    }
    fragments.push(fragment);
}

fn is_blank(fragment: &str) -> bool {
    fragment
        .chars()
        .all(|c| c.is_whitespace() || c.is_control())
}
