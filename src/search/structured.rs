//! Deterministic structured lookup.
//!
//! Two lookup layers run before any ranked retrieval, in fixed priority:
//!
//! 1. **Quick reference** — the query is matched against the literal
//!    questions of the quick-reference table by keyword Jaccard similarity,
//!    boosted when a multi-word phrase of the question appears verbatim in
//!    the query.
//! 2. **Canonical sources** — the query is matched against concept names,
//!    by substring first and token overlap second.
//!
//! A hit pins retrieval to one file; ranking then happens only within it.

use crate::chunking::types::QuickReferenceEntry;
use crate::config::RetrievalConfig;
use crate::search::precision::PrecisionFilter;
use crate::search::types::{LookupMethod, StructuredMatch};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::debug;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:\.[0-9]+)?").expect("valid token regex"));

/// Raw lowercase tokens with no stopword or length filtering. Concept names
/// are short, so every token carries weight, including `to` and `how`.
fn raw_tokens(text: &str) -> BTreeSet<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

const QUICK_REFERENCE_CONFIDENCE: f32 = 0.9;
const CANONICAL_CONFIDENCE: f32 = 0.85;

/// Structured-lookup thresholds, captured from configuration.
pub struct StructuredLookup {
    quick_reference_threshold: f32,
    phrase_boost_bigram: f32,
    phrase_boost_trigram: f32,
    min_phrase_length: usize,
    canonical_threshold: f32,
}

/// Jaccard similarity of two keyword sets; 0.0 when both are empty.
pub fn jaccard<T: Ord>(a: &std::collections::BTreeSet<T>, b: &std::collections::BTreeSet<T>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

impl StructuredLookup {
    /// Captures the lookup thresholds from configuration.
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            quick_reference_threshold: config.quick_reference_threshold,
            phrase_boost_bigram: config.phrase_boost_bigram,
            phrase_boost_trigram: config.phrase_boost_trigram,
            min_phrase_length: config.min_phrase_length,
            canonical_threshold: config.canonical_threshold,
        }
    }

    /// Matches the query against quick-reference questions.
    ///
    /// Scores keyword Jaccard plus a phrase boost: a trigram of the
    /// abbreviation-expanded question found verbatim in the expanded query
    /// adds the trigram boost, otherwise a bigram adds the bigram boost.
    /// Phrases shorter than the minimum length don't count. Strictly higher
    /// scores win, so ties keep the earlier row.
    pub fn match_quick_reference(
        &self,
        query: &str,
        entries: &[QuickReferenceEntry],
        filter: &PrecisionFilter,
    ) -> Option<StructuredMatch> {
        let expanded_query = filter.expand_query(query);
        let query_keywords = filter.extract_keywords(query);
        if query_keywords.is_empty() {
            return None;
        }

        let mut best_score = 0.0f32;
        let mut best_entry: Option<&QuickReferenceEntry> = None;
        for entry in entries {
            let question_keywords = filter.extract_keywords(&entry.question);
            let mut score = jaccard(&query_keywords, &question_keywords);
            score += self.phrase_boost(&filter.expand_query(&entry.question), &expanded_query);
            // Strictly greater, so ties keep the earlier row.
            if score > best_score {
                best_score = score;
                best_entry = Some(entry);
            }
        }

        let entry = best_entry?;
        if best_score < self.quick_reference_threshold {
            return None;
        }
        debug!(question = %entry.question, score = best_score, "quick-reference match");
        Some(StructuredMatch {
            file: entry.file.clone(),
            question: Some(entry.question.clone()),
            confidence: QUICK_REFERENCE_CONFIDENCE,
            method: LookupMethod::QuickReference,
        })
    }

    // Both sides are expanded the same way, so a question written with an
    // abbreviation still phrase-matches a query spelling it out.
    fn phrase_boost(&self, expanded_question: &str, expanded_query: &str) -> f32 {
        let words: Vec<String> = expanded_question
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .filter(|w| !w.is_empty())
            .collect();

        // Trigrams outrank bigrams, so check them first.
        for (size, boost) in [(3, self.phrase_boost_trigram), (2, self.phrase_boost_bigram)] {
            for window in words.windows(size) {
                let phrase = window.join(" ");
                if phrase.len() >= self.min_phrase_length && expanded_query.contains(&phrase) {
                    return boost;
                }
            }
        }
        0.0
    }

    /// Matches the query against canonical-source concept names.
    ///
    /// A concept appearing verbatim in the query short-circuits at score
    /// 1.0; otherwise raw-token overlap `|∩| / min(|q|, |c|)` is compared
    /// against the (stricter) canonical threshold. Overlap uses unfiltered
    /// tokens, not extracted keywords, so stopwords inside concept names
    /// still have to be earned and stem variants don't inflate the count.
    pub fn match_canonical_sources(
        &self,
        query: &str,
        concepts: &BTreeMap<String, String>,
        filter: &PrecisionFilter,
    ) -> Option<StructuredMatch> {
        let query_lower = filter.expand_query(query);
        let query_tokens = raw_tokens(&query_lower);

        let mut best_score = 0.0f32;
        let mut best: Option<(&String, &String)> = None;
        for (concept, file) in concepts {
            let score = if query_lower.contains(concept.as_str()) {
                1.0
            } else {
                let concept_tokens = raw_tokens(concept);
                let smaller = query_tokens.len().min(concept_tokens.len());
                if smaller == 0 {
                    0.0
                } else {
                    query_tokens.intersection(&concept_tokens).count() as f32 / smaller as f32
                }
            };
            if score > best_score {
                best_score = score;
                best = Some((concept, file));
            }
        }

        let (concept, file) = best?;
        if best_score < self.canonical_threshold {
            return None;
        }
        debug!(concept = %concept, score = best_score, "canonical-source match");
        Some(StructuredMatch {
            file: file.clone(),
            question: None,
            confidence: CANONICAL_CONFIDENCE,
            method: LookupMethod::CanonicalSource,
        })
    }

    /// Runs the lookup layers in fixed priority: quick reference, then
    /// canonical sources.
    pub fn lookup(
        &self,
        query: &str,
        entries: &[QuickReferenceEntry],
        concepts: &BTreeMap<String, String>,
        filter: &PrecisionFilter,
    ) -> Option<StructuredMatch> {
        self.match_quick_reference(query, entries, filter)
            .or_else(|| self.match_canonical_sources(query, concepts, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn lookup() -> StructuredLookup {
        StructuredLookup::new(&RetrievalConfig::default())
    }

    fn filter() -> PrecisionFilter {
        PrecisionFilter::new(&RetrievalConfig::default())
    }

    fn entries() -> Vec<QuickReferenceEntry> {
        vec![
            QuickReferenceEntry {
                question: "How do I set up the project?".to_string(),
                file: "docs/DEV_GUIDE.md".to_string(),
            },
            QuickReferenceEntry {
                question: "Where are pipeline stages defined?".to_string(),
                file: "docs/ARCHITECTURE.md".to_string(),
            },
        ]
    }

    fn concepts() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("pipeline stages".to_string(), "docs/ARCHITECTURE.md".to_string()),
            ("test strategy".to_string(), "docs/DEV_GUIDE.md".to_string()),
        ])
    }

    #[test]
    fn test_jaccard_symmetry_and_bounds() {
        let a: BTreeSet<_> = ["error", "handling"].into_iter().collect();
        let b: BTreeSet<_> = ["error", "recovery"].into_iter().collect();
        let ab = jaccard(&a, &b);
        assert_eq!(ab, jaccard(&b, &a));
        assert!((0.0..=1.0).contains(&ab));
        assert_eq!(jaccard(&a, &a), 1.0);
        let empty: BTreeSet<&str> = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn test_quick_reference_match() {
        let matched = lookup()
            .match_quick_reference("how do I set up the project", &entries(), &filter())
            .unwrap();
        assert_eq!(matched.file, "docs/DEV_GUIDE.md");
        assert_eq!(matched.method, LookupMethod::QuickReference);
        assert_eq!(matched.confidence, 0.9);
        assert_eq!(matched.question.as_deref(), Some("How do I set up the project?"));
    }

    #[test]
    fn test_quick_reference_below_threshold_is_none() {
        let matched = lookup().match_quick_reference(
            "completely unrelated gardening question",
            &entries(),
            &filter(),
        );
        assert!(matched.is_none());
    }

    #[test]
    fn test_quick_reference_phrase_boost_sees_expanded_abbreviations() {
        // The question uses the abbreviation, the query spells it out; the
        // "continuous integration" bigram only lines up after expansion.
        let entries = vec![QuickReferenceEntry {
            question: "Where is the CI pipeline configured?".to_string(),
            file: "docs/WORKFLOW_REGISTRY.md".to_string(),
        }];
        let matched = lookup()
            .match_quick_reference("continuous integration setup guide", &entries, &filter())
            .unwrap();
        assert_eq!(matched.file, "docs/WORKFLOW_REGISTRY.md");
        assert_eq!(matched.method, LookupMethod::QuickReference);
    }

    #[test]
    fn test_canonical_substring_short_circuits() {
        let matched = lookup()
            .match_canonical_sources("tell me about pipeline stages", &concepts(), &filter())
            .unwrap();
        assert_eq!(matched.file, "docs/ARCHITECTURE.md");
        assert_eq!(matched.method, LookupMethod::CanonicalSource);
        assert_eq!(matched.confidence, 0.85);
    }

    #[test]
    fn test_canonical_overlap_counts_stopword_tokens() {
        let concepts = BTreeMap::from([(
            "call to action".to_string(),
            "docs/UX_GUIDE.md".to_string(),
        )]);
        // Reordered, so the substring short-circuit doesn't apply; all three
        // tokens overlap, "to" included.
        let matched = lookup()
            .match_canonical_sources("action to call", &concepts, &filter())
            .unwrap();
        assert_eq!(matched.file, "docs/UX_GUIDE.md");
    }

    #[test]
    fn test_canonical_overlap_ignores_stem_variants() {
        let concepts = BTreeMap::from([(
            "guide to testing".to_string(),
            "docs/DEV_GUIDE.md".to_string(),
        )]);
        // Raw overlap is 2 of 3 tokens ("to" is missing from the query);
        // keyword stems must not pad the intersection past the threshold.
        let matched =
            lookup().match_canonical_sources("testing guide overview", &concepts, &filter());
        assert!(matched.is_none());
    }

    #[test]
    fn test_canonical_below_threshold_is_none() {
        let matched =
            lookup().match_canonical_sources("what about deployment", &concepts(), &filter());
        assert!(matched.is_none());
    }

    #[test]
    fn test_lookup_prefers_quick_reference() {
        // Query matches both a quick-reference question and a concept; the
        // quick-reference layer wins by fixed priority.
        let matched = lookup()
            .lookup(
                "where are pipeline stages defined",
                &entries(),
                &concepts(),
                &filter(),
            )
            .unwrap();
        assert_eq!(matched.method, LookupMethod::QuickReference);
    }

    #[test]
    fn test_lookup_none_when_nothing_matches() {
        let matched = lookup().lookup("gardening tips", &entries(), &concepts(), &filter());
        assert!(matched.is_none());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(lookup().lookup("", &entries(), &concepts(), &filter()).is_none());
    }
}
