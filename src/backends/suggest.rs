//! Ranking of autocomplete values, shared by every backend.

use crate::models::ScoringConfig;
use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use std::collections::HashSet;

/// Rank candidate values against `prefix` and keep the best `limit`.
///
/// A value equal to the prefix gets `exact_match_boost`, one starting with it
/// gets `prefix_match_boost`, anything else must be a fuzzy match. Every
/// character beyond the prefix decays the score by `distance_decay_factor`.
/// Values are deduplicated case-insensitively, keeping the first spelling.
pub(crate) fn rank_suggestions<I>(
    prefix: &str,
    values: I,
    scoring: &ScoringConfig,
    limit: usize,
) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() || limit == 0 {
        return Vec::new();
    }

    let needle = prefix.to_lowercase();
    let needle_len = needle.chars().count();
    let mut matcher = Matcher::new(Config::DEFAULT);
    let pattern = Pattern::parse(prefix, CaseMatching::Ignore, Normalization::Smart);
    let mut buf = Vec::new();

    let mut seen = HashSet::new();
    let mut ranked: Vec<(f64, String)> = Vec::new();

    for value in values {
        let value = value.trim().to_string();
        let lower = value.to_lowercase();
        if value.is_empty() || !seen.insert(lower.clone()) {
            continue;
        }

        let base = if lower == needle {
            100.0 * scoring.exact_match_boost
        } else if lower.starts_with(&needle) {
            100.0 * scoring.prefix_match_boost
        } else {
            match pattern.score(Utf32Str::new(&value, &mut buf), &mut matcher) {
                Some(score) => {
                    let score = f64::from(score);
                    100.0 * score / (score + 100.0)
                }
                None => continue,
            }
        };

        let extra = lower.chars().count().saturating_sub(needle_len) as f64;
        let score = base / (1.0 + scoring.distance_decay_factor * extra);
        ranked.push((score, value));
    }

    ranked.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(&b.1))
    });
    ranked.into_iter().take(limit).map(|(_, v)| v).collect()
}
