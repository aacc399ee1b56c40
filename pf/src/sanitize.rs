//! Cleanup of model-written copy
//!
//! Models like to answer "Headline: \"Pure Sound\"" when asked for a headline.
//! [`sanitize`] removes the label and one layer of wrapping quotes so only the
//! copy itself is stored.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Label tokens, followed by at least one `:`, `：`, `-` or whitespace
static LABEL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(대문구|소설명|문구|카피|copy|text|title|subtitle|headline)[:：\s\-]+")
        .expect("label prefix pattern is valid")
});

/// Matching open/close quote pairs
const QUOTE_PAIRS: [(char, char); 5] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’'), ('「', '」')];

/// Strip label prefixes and wrapping quotes, then trim
///
/// Runs to a fixed point, so `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        debug!(before = %current, after = %next, "sanitize: stripped");
        current = next;
    }
}

fn sanitize_once(text: &str) -> String {
    let unlabeled = LABEL_PREFIX.replace(text, "");
    unquote(unlabeled.trim()).trim().to_string()
}

fn unquote(text: &str) -> &str {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text;
    };
    if QUOTE_PAIRS.iter().any(|&(open, close)| first == open && last == close) {
        &text[first.len_utf8()..text.len() - last.len_utf8()]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
    }

    #[test]
    fn test_strips_label_tokens_case_insensitively() {
        assert_eq!(sanitize("Copy: Pure Sound"), "Pure Sound");
        assert_eq!(sanitize("HEADLINE - Pure Sound"), "Pure Sound");
        assert_eq!(sanitize("title Pure Sound"), "Pure Sound");
        assert_eq!(sanitize("subtitle：Pure Sound"), "Pure Sound");
        assert_eq!(sanitize("카피: 순수한 소리"), "순수한 소리");
        assert_eq!(sanitize("대문구 - 순수한 소리"), "순수한 소리");
        assert_eq!(sanitize("소설명：가볍고 단단한"), "가볍고 단단한");
    }

    #[test]
    fn test_label_without_separator_is_kept() {
        assert_eq!(sanitize("Textile tote"), "Textile tote");
        assert_eq!(sanitize("문구점 세트"), "문구점 세트");
        assert_eq!(sanitize("Copy"), "Copy");
    }

    #[test]
    fn test_strips_one_layer_of_matching_quotes() {
        assert_eq!(sanitize("\"Pure Sound\""), "Pure Sound");
        assert_eq!(sanitize("'Pure Sound'"), "Pure Sound");
        assert_eq!(sanitize("「순수한 소리」"), "순수한 소리");
        assert_eq!(sanitize("“Pure Sound”"), "Pure Sound");
    }

    #[test]
    fn test_mismatched_quotes_are_kept() {
        assert_eq!(sanitize("\"Pure Sound'"), "\"Pure Sound'");
        assert_eq!(sanitize("\""), "\"");
    }

    #[test]
    fn test_label_and_quotes_together() {
        assert_eq!(sanitize("Copy: \"Pure Sound\""), "Pure Sound");
        assert_eq!(sanitize("  문구: 「초경량」  "), "초경량");
    }

    #[test]
    fn test_sanitized_text_is_unchanged() {
        let clean = "Pure Sound";
        assert_eq!(sanitize(clean), clean);
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(s in ".{0,40}") {
            let once = sanitize(&s);
            prop_assert_eq!(sanitize(&once), once);
        }

        #[test]
        fn prop_sanitize_is_idempotent_on_labelled_input(
            label in "(Copy|TITLE|headline|카피|문구)",
            sep in "[:：\\- ]{1,3}",
            body in "[a-zA-Z가-힣\"'「」 ]{0,20}",
        ) {
            let input = format!("{}{}{}", label, sep, body);
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
