//! Response protocol parser.
//!
//! The model is instructed to answer in two tagged sections:
//!
//! ```text
//! <reply>visible answer</reply>
//! <memory>{"intent": "buy", "budget": "20000"}</memory>
//! ```
//!
//! Parsing is deliberately forgiving: a missing `<reply>` block falls back
//! to the whole completion, and a malformed `<memory>` payload is dropped
//! rather than failing the turn. The visible reply must never be held
//! hostage by a broken memory section.

use carbot_core::FactDelta;
use regex_lite::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static REPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<reply>\s*(.*?)\s*</reply>").unwrap());

static MEMORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<memory>\s*(.*?)\s*</memory>").unwrap());

/// The two sections of a model completion.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    /// Text shown to the user.
    pub reply: String,
    /// Extracted facts, if the completion carried a usable memory section.
    pub delta: Option<FactDelta>,
}

#[derive(Debug, Error)]
enum DeltaParseError {
    #[error("memory payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("memory payload is not a JSON object")]
    NotAnObject,
}

/// Split a raw completion into its visible reply and fact delta.
///
/// Tag matching is case-insensitive and spans newlines. Only the first
/// occurrence of each tag pair is considered.
pub fn parse(raw: &str) -> ParsedResponse {
    let reply = match REPLY_RE.captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => raw.trim().to_string(),
    };

    let delta = MEMORY_RE.captures(raw).and_then(|caps| {
        match parse_delta(caps[1].trim()) {
            Ok(delta) => Some(delta),
            Err(e) => {
                debug!(error = %e, "Discarding unusable memory section");
                None
            }
        }
    });

    ParsedResponse { reply, delta }
}

fn parse_delta(payload: &str) -> Result<FactDelta, DeltaParseError> {
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| DeltaParseError::InvalidJson(e.to_string()))?;
    FactDelta::from_value(value).ok_or(DeltaParseError::NotAnObject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbot_core::TrackedField;

    #[test]
    fn parses_reply_and_memory() {
        let raw = r#"<reply>Great, a Civic!</reply>
<memory>{"intent": "buy", "model": "Civic"}</memory>"#;
        let parsed = parse(raw);
        assert_eq!(parsed.reply, "Great, a Civic!");
        let delta = parsed.delta.unwrap();
        assert_eq!(delta.get(TrackedField::Intent).and_then(|v| v.as_str()), Some("buy"));
        assert_eq!(delta.get(TrackedField::Model).and_then(|v| v.as_str()), Some("Civic"));
    }

    #[test]
    fn missing_reply_falls_back_to_whole_text() {
        let parsed = parse("Just plain text from the model.");
        assert_eq!(parsed.reply, "Just plain text from the model.");
        assert!(parsed.delta.is_none());
    }

    #[test]
    fn tags_match_case_insensitively() {
        let parsed = parse("<REPLY>Hi there</REPLY><Memory>{\"intent\":\"sell\"}</Memory>");
        assert_eq!(parsed.reply, "Hi there");
        assert!(parsed.delta.is_some());
    }

    #[test]
    fn reply_spans_newlines() {
        let parsed = parse("<reply>line one\nline two</reply>");
        assert_eq!(parsed.reply, "line one\nline two");
    }

    #[test]
    fn malformed_memory_json_is_dropped() {
        let parsed = parse("<reply>ok</reply><memory>{not json}</memory>");
        assert_eq!(parsed.reply, "ok");
        assert!(parsed.delta.is_none());
    }

    #[test]
    fn non_object_memory_is_dropped() {
        let parsed = parse(r#"<reply>ok</reply><memory>["a", "b"]</memory>"#);
        assert!(parsed.delta.is_none());
    }

    #[test]
    fn empty_memory_is_dropped() {
        let parsed = parse("<reply>ok</reply><memory></memory>");
        assert!(parsed.delta.is_none());
    }

    #[test]
    fn first_tag_pair_wins() {
        let parsed = parse("<reply>first</reply><reply>second</reply>");
        assert_eq!(parsed.reply, "first");
    }

    #[test]
    fn surrounding_chatter_is_ignored() {
        let parsed = parse("Sure! Here you go:\n<reply>The answer</reply>\nHope that helps.");
        assert_eq!(parsed.reply, "The answer");
    }
}
