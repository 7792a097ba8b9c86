//! Input sanitization for user-supplied text.
//!
//! Untrusted input is interleaved with trusted instructions in the prompt,
//! so anything that could masquerade as protocol markup is stripped before
//! it reaches the history store or the model.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Maximum accepted input length, in characters. Longer input is truncated.
pub const MAX_INPUT_LEN: usize = 500;

/// Reserved tag names that user input must never carry, open or close,
/// in any case, with or without attributes.
static RESERVED_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?\s*(?:system|memory|reply|prompt|instruction|context|assistant|user|role|input|output|cmd|command|task|tool)\b[^>]*>",
    )
    .unwrap()
});

/// Clean a raw user message for inclusion in the conversation.
///
/// Pipeline: truncate to [`MAX_INPUT_LEN`] characters, drop control
/// characters (keeping newline and tab), strip reserved tags until none
/// remain, then trim surrounding whitespace. Control characters go first:
/// a control byte hidden inside a tag name must not survive its own
/// removal and reassemble a reserved tag. May return an empty string;
/// callers skip empty turns.
pub fn sanitize(text: &str) -> String {
    let mut current: String = text
        .chars()
        .take(MAX_INPUT_LEN)
        .filter(|&c| !is_disallowed_control(c))
        .collect();

    // Repeat until stable: removing one tag can splice another together
    // ("<sys<system>tem>" collapses to "<system>" after one pass).
    loop {
        let stripped = RESERVED_TAG_RE.replace_all(&current, "");
        if stripped == current {
            break;
        }
        current = stripped.into_owned();
    }

    current.trim().to_string()
}

fn is_disallowed_control(c: char) -> bool {
    (c < '\u{20}' && c != '\n' && c != '\t') || c == '\u{7f}'
}
