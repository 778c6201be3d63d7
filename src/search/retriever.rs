//! Hybrid retrieval orchestration.
//!
//! [`HybridRetriever`] owns the loaded snapshot and runs the query state
//! machine:
//!
//! 1. empty query → authority-ordered fallback;
//! 2. structured lookup (quick reference, canonical sources) → ranking
//!    within the matched file only;
//! 3. precision filter → hybrid fusion over the surviving candidates,
//!    with weights depending on whether the filter actually narrowed;
//! 4. post-ranking: status filtering (zeroed scores, slots kept), canonical
//!    authority boost, and routing suppression over the final top-k.
//!
//! Optional signals degrade instead of failing: a query-time embedding error
//! zeroes the semantic component, an empty corpus disables the keyword
//! scorer. Queries take `&self`; the snapshot is immutable after load, so
//! concurrent queries need no synchronization.

use crate::chunking::types::DocStatus;
use crate::config::RetrievalConfig;
use crate::embedding::{dot, EmbeddingProvider};
use crate::error::IndexError;
use crate::index::Snapshot;
use crate::metadata::authority_score;
use crate::search::keyword::KeywordScorer;
use crate::search::precision::PrecisionFilter;
use crate::search::structured::StructuredLookup;
use crate::search::types::{LookupMethod, QueryResult, StructuredMatch};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Cap on the heading keyword boost.
const MAX_HEADING_BOOST: f32 = 2.0;
/// Boost added per query keyword found in a heading.
const HEADING_BOOST_PER_HIT: f32 = 0.5;

/// Hybrid documentation retriever over an immutable snapshot.
pub struct HybridRetriever {
    snapshot: Snapshot,
    provider: Arc<dyn EmbeddingProvider>,
    keyword: Option<KeywordScorer>,
    precision: PrecisionFilter,
    structured: StructuredLookup,
    routing_patterns: Vec<Regex>,
    config: RetrievalConfig,
}

struct FusionWeights {
    semantic: f32,
    keyword: f32,
    authority: f32,
}

// Manual impl: the provider is a trait object and the scorer holds the BM25
// engine, neither of which derives Debug. Summarize the loaded state instead.
impl fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("chunks", &self.snapshot.chunks.len())
            .field("model", &self.snapshot.model)
            .field("dimension", &self.snapshot.dimension)
            .field("has_keyword", &self.keyword.is_some())
            .finish_non_exhaustive()
    }
}

impl HybridRetriever {
    /// Loads a snapshot from `dir` and validates it against the provider.
    ///
    /// Fails with [`IndexError::DimensionMismatch`] when the stored
    /// embedding dimension differs from the live provider's, so a stale
    /// snapshot is rejected at load time rather than mid-ranking.
    pub fn load(
        dir: &Path,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Result<Self, IndexError> {
        let snapshot = Snapshot::load(dir)?;
        if snapshot.dimension != provider.dimension() {
            return Err(IndexError::DimensionMismatch {
                stored: snapshot.dimension,
                live: provider.dimension(),
            });
        }
        if snapshot.model != provider.model_id() {
            warn!(
                stored = %snapshot.model,
                live = %provider.model_id(),
                "snapshot was built with a different embedding model"
            );
        }
        Ok(Self::from_snapshot(snapshot, provider, config))
    }

    /// Builds a retriever over an already-loaded snapshot.
    pub fn from_snapshot(
        snapshot: Snapshot,
        provider: Arc<dyn EmbeddingProvider>,
        config: RetrievalConfig,
    ) -> Self {
        let keyword = if snapshot.chunks.is_empty() {
            None
        } else {
            let texts: Vec<String> = snapshot
                .chunks
                .iter()
                .map(|c| format!("{} {}", c.heading_text, c.content))
                .collect();
            Some(KeywordScorer::new(&texts))
        };

        let routing_patterns = config
            .routing_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "skipping unusable routing pattern");
                    None
                }
            })
            .collect();

        Self {
            keyword,
            precision: PrecisionFilter::new(&config),
            structured: StructuredLookup::new(&config),
            routing_patterns,
            snapshot,
            provider,
            config,
        }
    }

    /// The loaded snapshot.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Answers a query with up to `top_k` ranked results.
    ///
    /// `top_k` defaults to the configured value. When `status_filter` is
    /// given, chunks of other statuses have their scores zeroed but are not
    /// removed before ranking, so they can only appear below every match.
    #[instrument(skip(self))]
    pub fn query(
        &self,
        text: &str,
        top_k: Option<usize>,
        status_filter: Option<&[DocStatus]>,
    ) -> Vec<QueryResult> {
        let top_k = top_k.unwrap_or(self.config.default_top_k);
        if self.snapshot.chunks.is_empty() || top_k == 0 {
            return Vec::new();
        }

        if text.trim().is_empty() {
            return self.authority_fallback(top_k, status_filter);
        }

        if self.config.enable_structured_lookup {
            if let Some(matched) = self.structured.lookup(
                text,
                &self.snapshot.quick_reference,
                &self.snapshot.canonical_sources,
                &self.precision,
            ) {
                let candidates: Vec<usize> = self
                    .snapshot
                    .chunks
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.source_file.contains(&matched.file))
                    .map(|(i, _)| i)
                    .collect();
                if candidates.is_empty() {
                    debug!(file = %matched.file, "structured match not in index, using hybrid path");
                } else {
                    return self.rank_within_file(text, &candidates, &matched, top_k, status_filter);
                }
            }
        }

        self.rank_hybrid(text, top_k, status_filter)
    }

    /// Empty-query fallback: pure authority ordering, ties broken by
    /// snapshot position.
    fn authority_fallback(
        &self,
        top_k: usize,
        status_filter: Option<&[DocStatus]>,
    ) -> Vec<QueryResult> {
        let today = chrono::Utc::now().date_naive();
        let scores: Vec<f32> = self
            .snapshot
            .chunks
            .iter()
            .map(|chunk| {
                let score = authority_score(
                    chunk.metadata.status,
                    chunk.metadata.verified,
                    today,
                    chunk.metadata.canonical,
                    &self.config,
                );
                apply_status_filter(score, chunk.metadata.status, status_filter)
            })
            .collect();

        let order = rank_descending(&scores, top_k);
        order
            .into_iter()
            .map(|i| self.result(i, scores[i], 0.0, 0.0, scores[i], LookupMethod::AuthorityFallback, None, false))
            .collect()
    }

    /// Ranks only the chunks of a structurally matched file.
    fn rank_within_file(
        &self,
        text: &str,
        candidates: &[usize],
        matched: &StructuredMatch,
        top_k: usize,
        status_filter: Option<&[DocStatus]>,
    ) -> Vec<QueryResult> {
        debug!(file = %matched.file, method = ?matched.method, "structured lookup hit");
        let weights = FusionWeights {
            semantic: self.config.within_file_semantic_weight,
            keyword: self.config.within_file_keyword_weight,
            authority: self.config.within_file_authority_weight,
        };

        let semantic = self.semantic_scores(text, candidates);
        let keyword = self.keyword_scores(&self.precision.expand_query(text), candidates);
        let today = chrono::Utc::now().date_naive();

        let mut fused = Vec::with_capacity(candidates.len());
        for (pos, &i) in candidates.iter().enumerate() {
            let chunk = &self.snapshot.chunks[i];
            let authority = authority_score(
                chunk.metadata.status,
                chunk.metadata.verified,
                today,
                chunk.metadata.canonical,
                &self.config,
            );
            let score = weights.semantic * semantic[pos]
                + weights.keyword * keyword[pos]
                + weights.authority * authority;
            let score = apply_status_filter(score, chunk.metadata.status, status_filter);
            fused.push((i, score, semantic[pos], keyword[pos], authority));
        }

        let scores: Vec<f32> = fused.iter().map(|f| f.1).collect();
        rank_descending(&scores, top_k)
            .into_iter()
            .map(|pos| {
                let (i, score, sem, kw, auth) = fused[pos];
                self.result(
                    i,
                    score,
                    sem,
                    kw,
                    auth,
                    matched.method,
                    Some(matched.confidence),
                    false,
                )
            })
            .collect()
    }

    /// Full hybrid fusion path.
    fn rank_hybrid(
        &self,
        text: &str,
        top_k: usize,
        status_filter: Option<&[DocStatus]>,
    ) -> Vec<QueryResult> {
        let total = self.snapshot.chunks.len();

        let (candidates, narrowed, canonical_file) = if self.config.enable_precision_filter {
            let outcome = self.precision.filter(text, &self.snapshot.chunks);
            if outcome.candidates.is_empty() {
                debug!("precision filter eliminated everything, using full corpus");
                ((0..total).collect(), false, outcome.classification.canonical_file)
            } else {
                let narrowed = outcome.candidates.len() < total;
                (outcome.candidates, narrowed, outcome.classification.canonical_file)
            }
        } else {
            ((0..total).collect::<Vec<_>>(), false, self.concept_in_query(text))
        };

        let weights = if narrowed {
            FusionWeights {
                semantic: self.config.filtered_semantic_weight,
                keyword: self.config.filtered_keyword_weight,
                authority: self.config.filtered_authority_weight,
            }
        } else {
            FusionWeights {
                semantic: self.config.semantic_weight,
                keyword: self.config.keyword_weight,
                authority: self.config.authority_weight,
            }
        };

        let semantic = self.semantic_scores(text, &candidates);
        let keyword_raw = self.keyword_scores(&self.precision.expand_query(text), &candidates);
        let query_keywords = self.precision.extract_keywords(text);
        let today = chrono::Utc::now().date_naive();

        let mut fused = Vec::with_capacity(candidates.len());
        for (pos, &i) in candidates.iter().enumerate() {
            let chunk = &self.snapshot.chunks[i];
            let keyword = keyword_raw[pos] * heading_boost(&chunk.heading_text, &query_keywords);

            let mut authority = authority_score(
                chunk.metadata.status,
                chunk.metadata.verified,
                today,
                chunk.metadata.canonical,
                &self.config,
            );
            if self.config.enable_canonical_boost {
                if let Some(canonical) = &canonical_file {
                    if chunk.source_file.contains(canonical.as_str()) {
                        // Deliberately uncapped: a canonical hit should
                        // dominate the authority component.
                        authority *= self.config.canonical_boost_multiplier;
                    }
                }
            }

            let score = weights.semantic * semantic[pos]
                + weights.keyword * keyword
                + weights.authority * authority;
            let score = apply_status_filter(score, chunk.metadata.status, status_filter);
            fused.push((i, score, semantic[pos], keyword, authority));
        }

        let scores: Vec<f32> = fused.iter().map(|f| f.1).collect();
        let results: Vec<QueryResult> = rank_descending(&scores, top_k)
            .into_iter()
            .map(|pos| {
                let (i, score, sem, kw, auth) = fused[pos];
                self.result(i, score, sem, kw, auth, LookupMethod::Hybrid, None, narrowed)
            })
            .collect();

        if self.config.enable_routing_suppression {
            self.suppress_routing(results)
        } else {
            results
        }
    }

    /// Drops routing results whose referenced document is not otherwise
    /// represented in the result set.
    ///
    /// Single pass: only the first matching routing pattern per result is
    /// consulted, and representation is judged against the results that are
    /// not routing results themselves. A routing result therefore can't keep
    /// another routing result alive, and running the pass twice changes
    /// nothing.
    fn suppress_routing(&self, results: Vec<QueryResult>) -> Vec<QueryResult> {
        if self.routing_patterns.is_empty() {
            return results;
        }
        let referenced: Vec<Option<String>> = results
            .iter()
            .map(|result| {
                self.routing_patterns
                    .iter()
                    .find_map(|re| re.captures(&result.content).map(|caps| caps[1].to_string()))
            })
            .collect();
        let keep: Vec<bool> = results
            .iter()
            .zip(&referenced)
            .map(|(result, target)| {
                let Some(target) = target else {
                    return true;
                };
                let represented = results.iter().zip(&referenced).any(|(other, other_target)| {
                    other_target.is_none()
                        && other.source_file != result.source_file
                        && file_name(&other.source_file) == target
                });
                if !represented {
                    debug!(
                        chunk = %result.chunk_id,
                        referenced = %target,
                        "suppressing routing result"
                    );
                }
                represented
            })
            .collect();
        results
            .into_iter()
            .zip(keep)
            .filter_map(|(result, keep)| keep.then_some(result))
            .collect()
    }

    /// Cosine scores for the candidates; zeros when embedding fails.
    fn semantic_scores(&self, text: &str, candidates: &[usize]) -> Vec<f32> {
        match self.provider.embed(text) {
            Ok(query_vector) => candidates
                .iter()
                .map(|&i| dot(&query_vector, &self.snapshot.vectors[i]))
                .collect(),
            Err(e) => {
                warn!(error = %e, "query embedding failed, semantic component zeroed");
                vec![0.0; candidates.len()]
            }
        }
    }

    /// Normalized BM25 scores for the candidates; zeros without a scorer.
    fn keyword_scores(&self, query: &str, candidates: &[usize]) -> Vec<f32> {
        match &self.keyword {
            Some(scorer) => scorer.scores(query, candidates),
            None => vec![0.0; candidates.len()],
        }
    }

    /// Legacy concept detection used when the precision filter is disabled:
    /// a canonical concept appearing as whole words in the query selects its
    /// source file for the canonical boost.
    fn concept_in_query(&self, text: &str) -> Option<String> {
        let query_lower = text.to_lowercase();
        for (concept, file) in &self.snapshot.canonical_sources {
            let pattern = format!(r"\b{}\b", regex::escape(concept).replace(r"\ ", r"\s+"));
            match Regex::new(&pattern) {
                Ok(re) if re.is_match(&query_lower) => return Some(file.clone()),
                _ => {}
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    fn result(
        &self,
        index: usize,
        score: f32,
        semantic: f32,
        keyword: f32,
        authority: f32,
        method: LookupMethod,
        confidence: Option<f32>,
        precision_filtered: bool,
    ) -> QueryResult {
        let chunk = &self.snapshot.chunks[index];
        QueryResult {
            chunk_id: chunk.chunk_id.clone(),
            source_file: chunk.source_file.clone(),
            section_reference: chunk.section_reference.clone(),
            heading_text: chunk.heading_text.clone(),
            content: chunk.content.clone(),
            line_range: chunk.line_range,
            score,
            semantic_score: semantic,
            keyword_score: keyword,
            authority_score: authority,
            lookup_method: method,
            confidence,
            precision_filtered,
        }
    }
}

/// Multiplier for keyword scores when query keywords appear in the heading.
///
/// Bracket characters are stripped first so markdown link syntax doesn't
/// hide matches. Caps at 2.0.
fn heading_boost(heading: &str, keywords: &BTreeSet<String>) -> f32 {
    let cleaned: String = heading
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')'))
        .collect();
    let hits = keywords.iter().filter(|k| cleaned.contains(k.as_str())).count();
    (1.0 + HEADING_BOOST_PER_HIT * hits as f32).min(MAX_HEADING_BOOST)
}

fn apply_status_filter(score: f32, status: DocStatus, filter: Option<&[DocStatus]>) -> f32 {
    match filter {
        Some(allowed) if !allowed.contains(&status) => 0.0,
        _ => score,
    }
}

/// Indices of the `top_k` highest scores, descending, ties broken by the
/// lower index.
fn rank_descending(scores: &[f32], top_k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    order.truncate(top_k);
    order
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::types::{Chunk, DocumentMetadata, QuickReferenceEntry};
    use crate::embedding::HashingProvider;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn chunk(id: &str, file: &str, heading: &str, content: &str, status: DocStatus) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            source_file: file.to_string(),
            section_reference: format!("{} § {heading}", file_name(file)),
            heading_text: heading.to_string(),
            heading_level: 2,
            parent_sections: Vec::new(),
            content: content.to_string(),
            line_range: (1, 30),
            metadata: DocumentMetadata {
                status,
                verified: NaiveDate::from_ymd_opt(2026, 8, 1),
                version: None,
                canonical: false,
            },
            outgoing_references: Vec::new(),
        }
    }

    fn retriever_with(chunks: Vec<Chunk>, config: RetrievalConfig) -> HybridRetriever {
        let provider = Arc::new(HashingProvider::new(128));
        let vectors = chunks
            .iter()
            .map(|c| {
                provider
                    .embed(&format!("{}\n{}", c.heading_text, c.content))
                    .unwrap()
            })
            .collect();
        let quick_reference = vec![QuickReferenceEntry {
            question: "How do I set up the project?".to_string(),
            file: "docs/DEV_GUIDE.md".to_string(),
        }];
        let quick_reference_vectors = quick_reference
            .iter()
            .map(|e| provider.embed(&e.question).unwrap())
            .collect();
        let snapshot = Snapshot {
            chunks,
            vectors,
            quick_reference,
            quick_reference_vectors,
            canonical_sources: BTreeMap::new(),
            model: "hashing-embedder".to_string(),
            dimension: 128,
        };
        HybridRetriever::from_snapshot(snapshot, provider, config)
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk(
                "guide__setup",
                "docs/DEV_GUIDE.md",
                "Setup",
                "install the toolchain and run the setup script",
                DocStatus::Authoritative,
            ),
            chunk(
                "arch__pipeline",
                "docs/ARCHITECTURE.md",
                "Pipeline",
                "the pipeline has three stages for processing",
                DocStatus::Stable,
            ),
            chunk(
                "old__notes",
                "docs/OLD.md",
                "Notes",
                "historical notes kept for context",
                DocStatus::Archived,
            ),
        ]
    }

    #[test]
    fn test_empty_query_falls_back_to_authority() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let results = retriever.query("", None, None);
        assert!(!results.is_empty());
        assert_eq!(results[0].source_file, "docs/DEV_GUIDE.md");
        assert_eq!(results[0].lookup_method, LookupMethod::AuthorityFallback);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_structured_match_pins_results_to_one_file() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let results = retriever.query("how do I set up the project", None, None);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.source_file == "docs/DEV_GUIDE.md"));
        assert_eq!(results[0].lookup_method, LookupMethod::QuickReference);
        assert_eq!(results[0].confidence, Some(0.9));
    }

    #[test]
    fn test_hybrid_path_marks_precision_narrowing() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let results = retriever.query("pipeline stages processing", None, None);
        assert!(!results.is_empty());
        assert_eq!(results[0].source_file, "docs/ARCHITECTURE.md");
        assert_eq!(results[0].lookup_method, LookupMethod::Hybrid);
        assert!(results[0].precision_filtered);
    }

    #[test]
    fn test_status_filter_zeroes_but_keeps_slots() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let results = retriever.query("", Some(3), Some(&[DocStatus::Archived]));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].source_file, "docs/OLD.md");
        assert!(results[0].score > 0.0);
        assert_eq!(results[1].score, 0.0);
        assert_eq!(results[2].score, 0.0);
    }

    #[test]
    fn test_top_k_zero_returns_nothing() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        assert!(retriever.query("setup", Some(0), None).is_empty());
    }

    #[test]
    fn test_heading_boost_caps_at_two() {
        let keywords: BTreeSet<String> =
            ["api", "endpoint"].into_iter().map(str::to_string).collect();
        assert_eq!(heading_boost("API Endpoint Reference", &keywords), 2.0);

        let many: BTreeSet<String> = ["api", "endpoint", "reference"]
            .into_iter()
            .map(str::to_string)
            .collect();
        assert_eq!(heading_boost("API Endpoint Reference", &many), 2.0);

        let one: BTreeSet<String> = ["api"].into_iter().map(str::to_string).collect();
        assert_eq!(heading_boost("API Overview", &one), 1.5);
        assert_eq!(heading_boost("Unrelated", &one), 1.0);
    }

    #[test]
    fn test_heading_boost_sees_through_brackets() {
        let keywords: BTreeSet<String> = ["api"].into_iter().map(str::to_string).collect();
        assert_eq!(heading_boost("[API] (draft)", &keywords), 1.5);
    }

    #[test]
    fn test_routing_chunk_suppressed_when_target_absent() {
        let mut chunks = corpus();
        chunks[1].content = "See OTHER.md § Setup for the full pipeline stages detail".to_string();
        let retriever = retriever_with(chunks, RetrievalConfig::default());
        let results = retriever.query("pipeline stages processing", None, None);
        assert!(results.iter().all(|r| r.source_file != "docs/ARCHITECTURE.md"));
    }

    #[test]
    fn test_routing_chunk_kept_when_target_present() {
        let mut chunks = corpus();
        chunks[1].content =
            "See OLD.md § Notes for historical pipeline stages context".to_string();
        chunks[2].content = "historical notes about pipeline stages".to_string();
        let retriever = retriever_with(chunks, RetrievalConfig::default());
        let results = retriever.query("pipeline stages", None, None);
        assert!(results.iter().any(|r| r.source_file == "docs/ARCHITECTURE.md"));
        assert!(results.iter().any(|r| r.source_file == "docs/OLD.md"));
    }

    #[test]
    fn test_routing_suppression_is_idempotent() {
        let mut chunks = corpus();
        chunks[1].content = "See OTHER.md § Setup for pipeline stages".to_string();
        let retriever = retriever_with(chunks, RetrievalConfig::default());
        let results = retriever.query("pipeline stages", None, None);
        let again = retriever.suppress_routing(results.clone());
        assert_eq!(results.len(), again.len());
    }

    #[test]
    fn test_chained_routing_references_suppressed_in_one_pass() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let result = |id: &str, file: &str, content: &str| QueryResult {
            chunk_id: id.to_string(),
            source_file: file.to_string(),
            section_reference: format!("{} § Top", file_name(file)),
            heading_text: "Top".to_string(),
            content: content.to_string(),
            line_range: (1, 10),
            score: 1.0,
            semantic_score: 0.5,
            keyword_score: 0.5,
            authority_score: 1.0,
            lookup_method: LookupMethod::Hybrid,
            confidence: None,
            precision_filtered: false,
        };
        // A.md routes to OTHER.md, whose own result routes to an absent
        // THIRD.md. Neither may survive: a routing result can't stand in
        // for the file it belongs to.
        let results = vec![
            result("a__top", "docs/A.md", "See OTHER.md § Setup for details"),
            result("other__top", "docs/OTHER.md", "See THIRD.md § More for details"),
            result("plain__top", "docs/PLAIN.md", "plain content with no pointers"),
        ];
        let once = retriever.suppress_routing(results);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].source_file, "docs/PLAIN.md");

        let twice = retriever.suppress_routing(once.clone());
        assert_eq!(twice.len(), 1);
        assert_eq!(twice[0].source_file, "docs/PLAIN.md");
    }

    #[test]
    fn test_debug_output_summarizes_snapshot() {
        let retriever = retriever_with(corpus(), RetrievalConfig::default());
        let rendered = format!("{retriever:?}");
        assert!(rendered.contains("HybridRetriever"));
        assert!(rendered.contains("dimension: 128"));
    }

    #[test]
    fn test_rank_descending_stable_ties() {
        let order = rank_descending(&[0.5, 0.9, 0.5, 0.1], 4);
        assert_eq!(order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_dimension_mismatch_rejected_at_load() {
        use tempfile::TempDir;
        let dir = TempDir::new().unwrap();
        let snapshot = Snapshot {
            chunks: Vec::new(),
            vectors: Vec::new(),
            quick_reference: Vec::new(),
            quick_reference_vectors: Vec::new(),
            canonical_sources: BTreeMap::new(),
            model: "hashing-embedder".to_string(),
            dimension: 64,
        };
        snapshot.write(dir.path()).unwrap();

        let err = HybridRetriever::load(
            dir.path(),
            Arc::new(HashingProvider::new(128)),
            RetrievalConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch { stored: 64, live: 128 }
        ));
    }
}
