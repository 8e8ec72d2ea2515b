//! Highlight snippets with surrounding context.

use super::trigram::similarity;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum snippet length in characters
const MAX_SNIPPET_LENGTH: usize = 150;

/// Context characters to show before and after match
const CONTEXT_CHARS: usize = 50;

static HTML_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("Failed to compile HTML tag regex"));

/// Strip HTML tags from text, preserving content.
pub fn strip_html(html: &str) -> String {
    let text = HTML_TAG_RE.replace_all(html, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a snippet of `text` centred on where `query` matches.
///
/// An exact (case-insensitive) occurrence wins; otherwise the word most
/// similar to the query anchors the snippet. Works on characters, never on
/// byte offsets, so multi-byte text cannot be split mid-character.
pub fn generate_snippet(text: &str, query: &str) -> String {
    let plain = strip_html(text);
    let chars: Vec<char> = plain.chars().collect();
    let lower: Vec<char> = plain.to_lowercase().chars().collect();
    let needle: Vec<char> = query.to_lowercase().chars().collect();

    // Lower-casing can change length for a handful of code points; fall back
    // to the start of the text rather than index out of step.
    let (pos, len) = if lower.len() == chars.len() {
        find_chars(&lower, &needle)
            .map(|p| (p, needle.len()))
            .unwrap_or_else(|| best_word(&plain, query))
    } else {
        (0, 0)
    };

    let start = pos.saturating_sub(CONTEXT_CHARS);
    let end = (pos + len + CONTEXT_CHARS).min(chars.len());

    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet = format!("...{}", snippet);
    }
    if end < chars.len() {
        snippet = format!("{}...", snippet);
    }

    if snippet.chars().count() > MAX_SNIPPET_LENGTH {
        let mut truncated: String = snippet.chars().take(MAX_SNIPPET_LENGTH - 3).collect();
        truncated.push_str("...");
        snippet = truncated;
    }

    snippet
}

fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Char position and length of the word most similar to `query`.
fn best_word(text: &str, query: &str) -> (usize, usize) {
    let mut best = (0, 0, 0.0);
    let mut pos = 0;
    for (i, word) in text.split(' ').enumerate() {
        if i > 0 {
            pos += 1;
        }
        let len = word.chars().count();
        let score = similarity(word, query);
        if score > best.2 {
            best = (pos, len, score);
        }
        pos += len;
    }
    (best.0, best.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello world</p>"), "Hello world");
        assert_eq!(
            strip_html("<div>Hello <strong>world</strong></div>"),
            "Hello world"
        );
        assert_eq!(strip_html("No HTML here"), "No HTML here");
        assert_eq!(strip_html("<p>  Multiple   spaces  </p>"), "Multiple spaces");
    }

    #[test]
    fn test_short_text_is_returned_whole() {
        assert_eq!(generate_snippet("Acme Corporation", "acme"), "Acme Corporation");
    }

    #[test]
    fn test_snippet_with_ellipsis() {
        let original = "Start of text. This is the middle section with the important keyword that we are searching for. End of text with more content and a long tail that keeps going.";
        let snippet = generate_snippet(original, "keyword");
        assert!(snippet.contains("keyword"));
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.chars().count() <= MAX_SNIPPET_LENGTH);
    }

    #[test]
    fn test_fuzzy_snippet_anchors_on_similar_word() {
        let original = format!("{} Corporation headquarters", "x ".repeat(60));
        let snippet = generate_snippet(&original, "corporatoin");
        assert!(snippet.contains("Corporation"));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let original = "Ünïcödé ".repeat(40) + "Zürich office";
        let snippet = generate_snippet(&original, "zürich");
        assert!(snippet.contains("Zürich"));
    }
}
