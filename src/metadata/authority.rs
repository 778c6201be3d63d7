//! Authority scoring with freshness decay.

use crate::chunking::types::DocStatus;
use crate::config::RetrievalConfig;
use chrono::NaiveDate;

/// Computes a document's authority score in `[min, max]` (defaults 0.1–1.2).
///
/// The base weight comes from the declared status. When a verified date is
/// known, the base is scaled by a linear freshness factor that decays over
/// `decay_window_days` and bottoms out at 0.5; an unknown date skips decay
/// entirely rather than guessing. Canonical sources get a flat additive
/// bonus after freshness.
///
/// Monotone in both inputs: a larger gap between `reference_date` and
/// `verified` never increases the score, and `canonical` never decreases it.
pub fn authority_score(
    status: DocStatus,
    verified: Option<NaiveDate>,
    reference_date: NaiveDate,
    canonical: bool,
    config: &RetrievalConfig,
) -> f32 {
    let base = match status {
        DocStatus::Authoritative => config.authority_weight_authoritative,
        DocStatus::Stable => config.authority_weight_stable,
        DocStatus::Unmarked => config.authority_weight_unmarked,
        DocStatus::Archived => config.authority_weight_archived,
    };

    let mut score = match verified {
        Some(date) => {
            let days = (reference_date - date).num_days() as f32;
            let freshness = (1.0 - days / config.decay_window_days as f32).max(0.5);
            base * freshness.min(1.0)
        }
        None => base,
    };

    if canonical {
        score += config.canonical_bonus;
    }

    score.clamp(config.min_authority_score, config.max_authority_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_fresh_authoritative_scores_full_base() {
        let today = date("2026-08-30");
        let score = authority_score(DocStatus::Authoritative, Some(today), today, false, &config());
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decay_bottoms_out_at_half() {
        let score = authority_score(
            DocStatus::Authoritative,
            Some(date("2020-01-01")),
            date("2026-08-30"),
            false,
            &config(),
        );
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_date_skips_decay() {
        let score = authority_score(
            DocStatus::Stable,
            None,
            date("2026-08-30"),
            false,
            &config(),
        );
        assert!((score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_canonical_bonus_is_additive() {
        let today = date("2026-08-30");
        let plain = authority_score(DocStatus::Stable, Some(today), today, false, &config());
        let canonical = authority_score(DocStatus::Stable, Some(today), today, true, &config());
        assert!((canonical - plain - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_score_capped_at_max() {
        let today = date("2026-08-30");
        let score =
            authority_score(DocStatus::Authoritative, Some(today), today, true, &config());
        assert!((score - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_score_floored_at_min() {
        // Stale ARCHIVED would otherwise fall to 0.05.
        let score = authority_score(
            DocStatus::Archived,
            Some(date("2020-01-01")),
            date("2026-08-30"),
            false,
            &config(),
        );
        assert!((score - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_monotone_in_staleness() {
        let reference = date("2026-08-30");
        let config = config();
        let mut prev = f32::INFINITY;
        for days_ago in [0i64, 10, 30, 60, 90, 365] {
            let verified = reference - chrono::Duration::days(days_ago);
            let score =
                authority_score(DocStatus::Authoritative, Some(verified), reference, false, &config);
            assert!(score <= prev, "score increased with staleness at {days_ago} days");
            prev = score;
        }
    }

    #[test]
    fn test_future_verified_date_does_not_exceed_base() {
        let score = authority_score(
            DocStatus::Stable,
            Some(date("2027-01-01")),
            date("2026-08-30"),
            false,
            &config(),
        );
        assert!((score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_status_ordering_preserved() {
        let today = date("2026-08-30");
        let config = config();
        let scores: Vec<f32> = [
            DocStatus::Authoritative,
            DocStatus::Stable,
            DocStatus::Unmarked,
            DocStatus::Archived,
        ]
        .into_iter()
        .map(|s| authority_score(s, Some(today), today, false, &config))
        .collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }
}
