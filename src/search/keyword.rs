//! BM25 keyword scoring.
//!
//! Wraps the [`bm25`](https://crates.io/crates/bm25) crate. The corpus is
//! indexed once at construction; queries then score an arbitrary candidate
//! subset, normalized by the maximum score **within that subset** so the
//! keyword component lands in `[0, 1]` before fusion.
//!
//! The subset-max normalization means keyword scores are not comparable
//! across differently narrowed candidate sets. The fusion weights were tuned
//! against this behavior, so it is kept rather than normalized globally.

use bm25::{Document, Language, SearchEngineBuilder};
use std::collections::HashMap;
use tracing::instrument;

/// BM25 scorer over a fixed chunk corpus.
///
/// Chunks are addressed by their ordinal position in the corpus passed to
/// [`KeywordScorer::new`], which matches their position in the snapshot.
pub struct KeywordScorer {
    engine: bm25::SearchEngine<u32>,
    corpus_len: usize,
}

impl KeywordScorer {
    /// Indexes the given chunk texts. Ordinal `i` scores `texts[i]`.
    pub fn new(texts: &[String]) -> Self {
        let documents: Vec<Document<u32>> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Document {
                id: i as u32,
                contents: text.clone(),
            })
            .collect();
        let corpus_len = documents.len();
        let engine = SearchEngineBuilder::<u32>::with_documents(Language::English, documents).build();
        Self { engine, corpus_len }
    }

    /// Scores `candidates` (ordinals into the corpus) against `query`.
    ///
    /// Returns one score per candidate, in order, normalized by the maximum
    /// raw BM25 score among the candidates. Candidates the engine did not
    /// match score 0.0; if nothing matches, all scores are 0.0.
    #[instrument(skip(self, candidates), fields(candidate_count = candidates.len()))]
    pub fn scores(&self, query: &str, candidates: &[usize]) -> Vec<f32> {
        if query.trim().is_empty() || candidates.is_empty() {
            return vec![0.0; candidates.len()];
        }

        let raw: HashMap<u32, f32> = self
            .engine
            .search(query, self.corpus_len)
            .into_iter()
            .map(|result| (result.document.id, result.score))
            .collect();

        let scores: Vec<f32> = candidates
            .iter()
            .map(|&i| raw.get(&(i as u32)).copied().unwrap_or(0.0))
            .collect();

        let max = scores.iter().cloned().fold(0.0f32, f32::max);
        if max > 0.0 {
            scores.into_iter().map(|s| s / max).collect()
        } else {
            scores
        }
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.corpus_len
    }

    /// Returns `true` if no chunks were indexed.
    pub fn is_empty(&self) -> bool {
        self.corpus_len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "error handling with typed results".to_string(),
            "error propagation and error recovery in the pipeline".to_string(),
            "unrelated gardening notes".to_string(),
        ]
    }

    #[test]
    fn test_best_candidate_normalizes_to_one() {
        let scorer = KeywordScorer::new(&corpus());
        let scores = scorer.scores("error handling", &[0, 1, 2]);
        assert_eq!(scores.len(), 3);
        let max = scores.iter().cloned().fold(0.0f32, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_no_match_yields_all_zeros() {
        let scorer = KeywordScorer::new(&corpus());
        let scores = scorer.scores("quasar telescope", &[0, 1, 2]);
        assert!(scores.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_empty_query_yields_zeros() {
        let scorer = KeywordScorer::new(&corpus());
        assert!(scorer.scores("", &[0, 1]).iter().all(|s| *s == 0.0));
        assert!(scorer.scores("   ", &[0, 1]).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_subset_scoring_respects_candidate_order() {
        let scorer = KeywordScorer::new(&corpus());
        let forward = scorer.scores("error", &[0, 1]);
        let reversed = scorer.scores("error", &[1, 0]);
        assert_eq!(forward[0], reversed[1]);
        assert_eq!(forward[1], reversed[0]);
    }

    #[test]
    fn test_empty_corpus() {
        let scorer = KeywordScorer::new(&[]);
        assert!(scorer.is_empty());
        assert!(scorer.scores("anything", &[]).is_empty());
    }
}
