//! Embedded update directives in chat replies
//!
//! The chat model is told to embed a content change in its free-text reply as
//!
//! ```text
//! directive := "[UPDATE_CONTENT:" ws* object ws* "]"
//! object    := "{" ... "}"   balanced braces, braces inside JSON strings ignored
//! ```
//!
//! [`parse`] locates the first well-formed directive and classifies its
//! payload; [`extract`] turns a reply into display text plus an optional
//! patch.

use std::ops::Range;

use tracing::debug;

use crate::domain::SlicePatch;

/// Opening token of a directive
pub const DIRECTIVE_PREFIX: &str = "[UPDATE_CONTENT:";

/// Result of scanning a reply for a directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Well-formed directive with a valid payload
    Found { patch: SlicePatch, span: Range<usize> },
    /// No extractable directive; the raw text is left as is
    NotFound,
    /// Directive delimiters were found but the payload is not a valid patch
    MalformedPayload { span: Range<usize>, error: String },
}

/// Scan `text` for the first extractable directive
pub fn parse(text: &str) -> Directive {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find(DIRECTIVE_PREFIX) {
        let start = search_from + offset;
        let body_start = start + DIRECTIVE_PREFIX.len();

        if let Some((object, end)) = delimit(text, body_start) {
            let span = start..end;
            return match serde_json::from_str::<SlicePatch>(&text[object]) {
                Ok(patch) => {
                    debug!(?span, ?patch, "parse: directive found");
                    Directive::Found { patch, span }
                }
                Err(e) => {
                    debug!(?span, error = %e, "parse: malformed directive payload");
                    Directive::MalformedPayload {
                        span,
                        error: e.to_string(),
                    }
                }
            };
        }

        debug!(start, "parse: prefix without a delimited payload, continuing");
        search_from = body_start;
    }
    Directive::NotFound
}

/// Split a reply into display text and an optional patch
///
/// A found or malformed directive is cut out of the text; the text on either
/// side is joined with a single space. Without a directive the text is only
/// trimmed.
pub fn extract(text: &str) -> (String, Option<SlicePatch>) {
    match parse(text) {
        Directive::Found { patch, span } => (strip(text, span), Some(patch)),
        Directive::MalformedPayload { span, .. } => (strip(text, span), None),
        Directive::NotFound => (text.trim().to_string(), None),
    }
}

/// Remove `span` from `text`
pub fn strip(text: &str, span: Range<usize>) -> String {
    let before = text[..span.start].trim_end();
    let after = text[span.end..].trim_start();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.trim_end().to_string(),
        (_, true) => before.trim_start().to_string(),
        _ => format!("{} {}", before.trim_start(), after.trim_end()),
    }
}

/// Find the balanced object starting after optional whitespace at `from`,
/// followed by optional whitespace and `]`.
///
/// Returns the object's byte range and the end of the directive.
fn delimit(text: &str, from: usize) -> Option<(Range<usize>, usize)> {
    let rest = &text[from..];
    let object_start = from + (rest.len() - rest.trim_start().len());
    if !text[object_start..].starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut object_end = None;

    for (i, c) in text[object_start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    object_end = Some(object_start + i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    let object_end = object_end?;
    let tail = &text[object_end..];
    let close = object_end + (tail.len() - tail.trim_start().len());
    if text[close..].starts_with(']') {
        Some((object_start..object_end, close + 1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_found_keeps_surrounding_text() {
        let reply = "결과: [UPDATE_CONTENT: {\"copy\":\"NEW\"}] 감사합니다";
        let (text, action) = extract(reply);
        assert_eq!(text, "결과: 감사합니다");
        assert_eq!(
            action,
            Some(SlicePatch {
                copy: Some("NEW".to_string()),
                description: None,
            })
        );
    }

    #[test]
    fn test_found_with_both_fields() {
        let reply = r#"Sure. [UPDATE_CONTENT: {"copy": "Pure Sound", "description": "All-day comfort"}]"#;
        match parse(reply) {
            Directive::Found { patch, span } => {
                assert_eq!(patch.copy.as_deref(), Some("Pure Sound"));
                assert_eq!(patch.description.as_deref(), Some("All-day comfort"));
                assert_eq!(span.start, 6);
                assert_eq!(span.end, reply.len());
            }
            other => panic!("expected Found, got {:?}", other),
        }
        assert_eq!(extract(reply).0, "Sure.");
    }

    #[test]
    fn test_braces_and_brackets_inside_strings() {
        let reply = r#"[UPDATE_CONTENT: {"copy": "Say \"}]\" loud", "description": "{x}"}] done"#;
        let (text, action) = extract(reply);
        assert_eq!(text, "done");
        let patch = action.unwrap();
        assert_eq!(patch.copy.as_deref(), Some("Say \"}]\" loud"));
        assert_eq!(patch.description.as_deref(), Some("{x}"));
    }

    #[test]
    fn test_not_found_leaves_text() {
        assert_eq!(parse("No changes needed."), Directive::NotFound);
        let (text, action) = extract("  No changes needed.  ");
        assert_eq!(text, "No changes needed.");
        assert!(action.is_none());
    }

    #[test]
    fn test_unterminated_directive_is_not_extracted() {
        let reply = "Here [UPDATE_CONTENT: {\"copy\": \"NEW\" and more";
        assert_eq!(parse(reply), Directive::NotFound);
        assert_eq!(extract(reply).0, reply);
    }

    #[test]
    fn test_missing_closing_bracket_is_not_extracted() {
        let reply = "Here [UPDATE_CONTENT: {\"copy\": \"NEW\"} thanks";
        assert_eq!(parse(reply), Directive::NotFound);
    }

    #[test]
    fn test_prefix_without_object_is_not_extracted() {
        assert_eq!(parse("[UPDATE_CONTENT: copy=NEW]"), Directive::NotFound);
    }

    #[test]
    fn test_malformed_payload_is_stripped_without_action() {
        let reply = "OK [UPDATE_CONTENT: {copy: NEW}] bye";
        assert!(matches!(parse(reply), Directive::MalformedPayload { .. }));
        let (text, action) = extract(reply);
        assert_eq!(text, "OK bye");
        assert!(action.is_none());
    }

    #[test]
    fn test_wrong_field_type_is_malformed() {
        let reply = r#"[UPDATE_CONTENT: {"copy": 42}]"#;
        assert!(matches!(parse(reply), Directive::MalformedPayload { .. }));
    }

    #[test]
    fn test_first_extractable_directive_wins() {
        let reply = r#"[UPDATE_CONTENT: broken [UPDATE_CONTENT: {"copy": "B"}] [UPDATE_CONTENT: {"copy": "C"}]"#;
        let (_, action) = extract(reply);
        assert_eq!(action.unwrap().copy.as_deref(), Some("B"));
    }

    #[test]
    fn test_empty_object_is_found_with_empty_patch() {
        match parse("[UPDATE_CONTENT: {}]") {
            Directive::Found { patch, .. } => assert!(patch.is_empty()),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_edges() {
        assert_eq!(strip("abc", 0..3), "");
        assert_eq!(strip("  x [d]", 4..7), "x");
        assert_eq!(strip("[d]  y  ", 0..3), "y");
    }
}
