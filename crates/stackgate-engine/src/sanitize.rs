//! Comment stripping for template source text.
//!
//! The renderer works on text, not on the parsed tree, so comments are
//! removed before rendering: a placeholder inside a comment must not be
//! substituted, and must not fail a strict render.
//!
//! The marker is found without regard to quoting. A `#` inside a quoted
//! value truncates the line just like a comment would.

/// YAML comment marker.
pub const COMMENT_MARKER: char = '#';

/// Strip comments from `text`.
///
/// Line endings are normalized to `\n`. A line whose first character is the
/// marker is dropped; a line containing the marker later is cut at it; every
/// kept line loses its trailing whitespace. A trailing newline on the input
/// is kept on the output.
pub fn sanitize(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut kept: Vec<&str> = Vec::new();
    for line in normalized.lines() {
        match line.find(COMMENT_MARKER) {
            Some(0) => {}
            Some(index) => kept.push(line[..index].trim_end()),
            None => kept.push(line.trim_end()),
        }
    }

    let mut out = kept.join("\n");
    if normalized.ends_with('\n') && !kept.is_empty() {
        out.push('\n');
    }
    out
}
