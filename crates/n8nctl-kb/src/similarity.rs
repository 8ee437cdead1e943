//! Similarity scoring for unknown node types.
//!
//! Scores combine normalized Levenshtein distance with a shared-prefix bonus
//! and alias shortcuts. A score at or above [`AUTO_FIX_THRESHOLD`] marks the
//! suggestion safe for automatic correction; candidates below
//! [`SUGGESTION_FLOOR`] are dropped entirely.

use strsim::levenshtein;

use crate::catalog::short_alias;
use crate::types::{NodeTypeRecord, TypeSuggestion};

/// Minimum similarity for a node-type correction to be auto-fixable.
pub const AUTO_FIX_THRESHOLD: f64 = 0.9;

/// Candidates scoring below this are never suggested.
pub const SUGGESTION_FLOOR: f64 = 0.5;

/// Per-character shared-prefix bonus, capped at [`PREFIX_BONUS_CAP`].
const PREFIX_BONUS_PER_CHAR: f64 = 0.01;
const PREFIX_BONUS_CAP: f64 = 0.1;

/// Score a single candidate record against an unknown type string.
///
/// The unknown string is compared against the record's alias, display name,
/// and qualified type (all case-insensitive); the best score wins. An exact
/// alias match is a shortcut to 1.0.
pub fn score_candidate(bad_type: &str, record: &NodeTypeRecord) -> (f64, String) {
    let needle = short_alias(bad_type).to_ascii_lowercase();

    let alias = record.alias.to_ascii_lowercase();
    if needle == alias {
        return (1.0, "exact alias match".to_string());
    }

    let mut best = similarity(&needle, &alias);
    let mut reason = format!("edit distance to alias '{}'", record.alias);

    let display = record.display_name.to_ascii_lowercase().replace(' ', "");
    let display_score = similarity(&needle, &display);
    if display_score > best {
        best = display_score;
        reason = format!("edit distance to display name '{}'", record.display_name);
    }

    let qualified = record.node_type.to_ascii_lowercase();
    let qualified_score = similarity(&bad_type.to_ascii_lowercase(), &qualified);
    if qualified_score > best {
        best = qualified_score;
        reason = "edit distance to qualified type".to_string();
    }

    (best, reason)
}

/// Rank all catalog records against `bad_type`, best first, floor applied.
pub fn rank_candidates(
    bad_type: &str,
    records: &[NodeTypeRecord],
    limit: usize,
) -> Vec<TypeSuggestion> {
    let mut scored: Vec<TypeSuggestion> = records
        .iter()
        .map(|record| {
            let (score, reason) = score_candidate(bad_type, record);
            TypeSuggestion {
                value: record.node_type.clone(),
                confidence: round2(score),
                reason,
                auto_fixable: score >= AUTO_FIX_THRESHOLD,
            }
        })
        .filter(|s| s.confidence >= SUGGESTION_FLOOR)
        .collect();

    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.value.cmp(&b.value))
    });
    scored.truncate(limit);
    scored
}

/// Normalized Levenshtein similarity plus shared-prefix bonus, clamped to 1.0.
fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let distance = levenshtein(a, b) as f64;
    let longest = a.chars().count().max(b.chars().count()) as f64;
    let base = 1.0 - distance / longest;

    let prefix_len = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count() as f64;
    let bonus = (prefix_len * PREFIX_BONUS_PER_CHAR).min(PREFIX_BONUS_CAP);

    (base + bonus).min(1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_catalog::fixture_records;

    fn find(records: &[NodeTypeRecord], alias: &str) -> NodeTypeRecord {
        records
            .iter()
            .find(|r| r.alias == alias)
            .cloned()
            .expect("fixture record")
    }

    #[test]
    fn exact_alias_is_certain() {
        let records = fixture_records();
        let webhook = find(&records, "webhook");
        let (score, reason) = score_candidate("webhook", &webhook);
        assert_eq!(score, 1.0);
        assert!(reason.contains("alias"));
    }

    #[test]
    fn single_typo_clears_autofix_threshold() {
        let records = fixture_records();
        let webhook = find(&records, "webhook");
        let (score, _) = score_candidate("webhok", &webhook);
        assert!(score >= AUTO_FIX_THRESHOLD, "score was {score}");
    }

    #[test]
    fn unrelated_strings_fall_below_floor() {
        let records = fixture_records();
        let suggestions = rank_candidates("zzqqxv", &records, 5);
        assert!(suggestions.is_empty());
    }

    #[test]
    fn ranked_output_is_best_first_and_bounded() {
        let records = fixture_records();
        let suggestions = rank_candidates("webhok", &records, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions.len() <= 3);
        assert_eq!(suggestions[0].value, "n8n-nodes-base.webhook");
        assert!(suggestions[0].auto_fixable);
        for pair in suggestions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
