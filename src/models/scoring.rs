//! Tunable ranking parameters.

use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ranking parameters shared read-only by every request.
///
/// Changing scoring behavior means building a new config and a new service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringConfig {
    /// Relative importance per field; unlisted fields weigh 1.0
    pub field_weights: BTreeMap<String, f64>,

    /// Multiplier for a suggestion equal to the prefix
    pub exact_match_boost: f64,

    /// Multiplier for a suggestion starting with the prefix
    pub prefix_match_boost: f64,

    /// Ceiling of the recency multiplier (1.2 means up to +20%)
    pub recent_record_boost: f64,

    /// Multiplier for active records when inactive ones are also searched
    pub active_record_boost: f64,

    /// Per-extra-character decay applied to suggestion ranking
    pub distance_decay_factor: f64,

    /// Age window, in days, in which the recency boost applies
    pub recency_decay_days: f64,

    /// Minimum trigram similarity a row needs to be kept
    pub similarity_threshold: f64,

    /// Per-unit-of-weight boost for each matching field
    pub field_weight_factor: f64,

    /// Candidate rows kept per model before scoring
    pub max_candidates_per_model: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let field_weights = [
            ("name", 2.0),
            ("first_name", 1.8),
            ("last_name", 1.8),
            ("company_name", 1.5),
            ("company", 1.5),
            ("email", 1.5),
            ("title", 1.2),
            ("phone", 1.0),
            ("description", 0.8),
            ("notes", 0.5),
        ]
        .into_iter()
        .map(|(field, weight)| (field.to_string(), weight))
        .collect();

        Self {
            field_weights,
            exact_match_boost: 2.0,
            prefix_match_boost: 1.5,
            recent_record_boost: 1.2,
            active_record_boost: 1.1,
            distance_decay_factor: 0.1,
            recency_decay_days: 30.0,
            similarity_threshold: 0.1,
            field_weight_factor: 0.1,
            max_candidates_per_model: 100,
        }
    }
}

impl ScoringConfig {
    /// Weight of `field`, preferring a per-query boost over the configured weight.
    pub fn weight_for(&self, field: &str, overrides: &BTreeMap<String, f64>) -> f64 {
        overrides
            .get(field)
            .or_else(|| self.field_weights.get(field))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn with_field_weight(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.field_weights.insert(field.into(), weight);
        self
    }

    /// Check ranges once, at service construction.
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, weight) in &self.field_weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(invalid(
                    &format!("field_weights.{}", field),
                    "must be a non-negative number",
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid("similarity_threshold", "must be within 0.0..=1.0"));
        }
        if self.recency_decay_days <= 0.0 {
            return Err(invalid("recency_decay_days", "must be positive"));
        }
        if self.max_candidates_per_model == 0 {
            return Err(invalid("max_candidates_per_model", "must be at least 1"));
        }
        let multipliers = [
            ("exact_match_boost", self.exact_match_boost),
            ("prefix_match_boost", self.prefix_match_boost),
            ("recent_record_boost", self.recent_record_boost),
            ("active_record_boost", self.active_record_boost),
        ];
        for (name, value) in multipliers {
            if !value.is_finite() || value < 1.0 {
                return Err(invalid(name, "must be >= 1.0"));
            }
        }
        if self.distance_decay_factor < 0.0 || self.field_weight_factor < 0.0 {
            return Err(invalid("decay factors", "must be non-negative"));
        }
        Ok(())
    }
}

fn invalid(var: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var: format!("scoring.{}", var),
        reason: reason.to_string(),
    }
}
