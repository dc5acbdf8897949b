//! Weighted-majority combination of detector verdicts.
//!
//! ```text
//! ws = Σ confidence·weight over squash votes
//! wn = Σ confidence·weight over the rest
//! confidence = max(ws, wn) / Σ weight
//! is_squash  = ws > wn  &&  confidence ≥ threshold
//! ```
//!
//! Confidences are not normalized per algorithm before weighting.

use super::verdict::{AggregateVerdict, DetectionVerdict};

/// Squash votes required when cross-validation is mandatory.
pub const MIN_AGREEING_METHODS: usize = 2;

/// Combines verdicts into one decision.
pub fn combine(
    verdicts: Vec<DetectionVerdict>,
    confidence_threshold: f64,
    require_cross_validation: bool,
) -> AggregateVerdict {
    let total_weight: f64 = verdicts.iter().map(|v| v.weight).sum();
    if verdicts.is_empty() || total_weight <= 0.0 || total_weight.is_nan() {
        return AggregateVerdict {
            verdicts,
            ..AggregateVerdict::empty()
        };
    }

    let mut weighted_squash = 0.0;
    let mut weighted_non_squash = 0.0;
    let mut squash_votes = 0;
    for verdict in &verdicts {
        let score = verdict.confidence * verdict.weight;
        if verdict.is_squash {
            weighted_squash += score;
            squash_votes += 1;
        } else {
            weighted_non_squash += score;
        }
    }
    let non_squash_votes = verdicts.len() - squash_votes;

    let confidence = (f64::max(weighted_squash, weighted_non_squash) / total_weight).clamp(0.0, 1.0);
    let majority = weighted_squash > weighted_non_squash;
    let meets_threshold = confidence >= confidence_threshold;
    let agreement = !require_cross_validation || squash_votes >= MIN_AGREEING_METHODS;
    let is_squash = majority && meets_threshold && agreement;

    let mut reasoning = format!(
        "Cross-validated {} methods: {} voted squash, {} voted non-squash; confidence {:.1}%",
        verdicts.len(),
        squash_votes,
        non_squash_votes,
        confidence * 100.0
    );
    if majority && !meets_threshold {
        reasoning.push_str(&format!(
            "; below threshold {:.1}%",
            confidence_threshold * 100.0
        ));
    }
    if majority && meets_threshold && !agreement {
        reasoning.push_str(&format!(
            "; fewer than {MIN_AGREEING_METHODS} methods agree"
        ));
    }

    AggregateVerdict {
        is_squash,
        confidence,
        verdicts,
        reasoning,
        squash_votes,
        non_squash_votes,
    }
}
