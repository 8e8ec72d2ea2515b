//! Trigram similarity.
//!
//! Text is lower-cased and split into alphanumeric words. Each word is padded
//! with two leading spaces and one trailing space, and every three-character
//! window becomes a trigram. Similarity is the Jaccard index of the two
//! trigram sets.

use std::collections::HashSet;

/// Trigram set of `text`.
pub fn trigrams(text: &str) -> HashSet<String> {
    let mut set = HashSet::new();
    for word in words(text) {
        let padded: Vec<char> = format!("  {} ", word).chars().collect();
        for window in padded.windows(3) {
            set.insert(window.iter().collect());
        }
    }
    set
}

/// Jaccard similarity of the trigram sets of `a` and `b`.
pub fn similarity(a: &str, b: &str) -> f64 {
    jaccard(&trigrams(a), &trigrams(b))
}

/// Similarity of a query against one field value.
///
/// The best of the whole-value similarity and the similarity against each
/// individual word of the value, so that a one-word query is not diluted by
/// a long multi-word value ("Akme" vs "Acme Corporation").
pub fn field_similarity(query: &str, value: &str) -> f64 {
    let query_set = trigrams(query);
    if query_set.is_empty() {
        return 0.0;
    }

    let mut best = jaccard(&query_set, &trigrams(value));
    for word in words(value) {
        let score = jaccard(&query_set, &trigrams(&word));
        if score > best {
            best = score;
        }
    }
    best
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.len() + b.len() - shared;
    shared as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigrams_of_word() {
        let set = trigrams("cat");
        let expected: HashSet<String> = ["  c", " ca", "cat", "at "]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_trigrams_ignore_case_and_punctuation() {
        assert_eq!(trigrams("Cat!"), trigrams("cat"));
        assert!(trigrams("").is_empty());
        assert!(trigrams("--").is_empty());
    }

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("acme", "acme"), 1.0);
        assert_eq!(similarity("acme", "zzzz"), 0.0);
        assert_eq!(similarity("", "acme"), 0.0);
        let s = similarity("akme", "acme");
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn test_field_similarity_uses_best_word() {
        let whole = similarity("Akme", "Acme Corporation");
        let field = field_similarity("Akme", "Acme Corporation");
        assert!(field > whole);
        assert!(field >= 0.25 - 1e-9);
    }

    #[test]
    fn test_field_similarity_unrelated_is_below_floor() {
        assert!(field_similarity("zebra", "Acme Corporation") < 0.1);
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Acme Corporation", "corp"));
        assert!(!contains_ignore_case("Acme", "beta"));
    }
}
