//! Retrieval configuration.
//!
//! All tunable parameters live in [`RetrievalConfig`], an explicit immutable
//! value passed into every component constructor. There is no ambient global
//! configuration; tests construct alternate configurations freely and get
//! deterministic behavior.

use serde::{Deserialize, Serialize};

/// A named query type used by the precision filter to classify queries.
///
/// Types are checked in declaration order; the first type whose regex
/// patterns or keyword set match the query wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTypePattern {
    /// Type name, e.g. `"architecture"` or `"debugging"`
    pub name: String,
    /// Keywords whose intersection with the query keywords selects this type
    pub keywords: Vec<String>,
    /// Optional regex patterns checked before keywords (more precise)
    pub patterns: Vec<String>,
    /// Canonical file where answers for this type are most likely found
    pub canonical_file: Option<String>,
}

/// Immutable configuration for chunking, scoring, and retrieval.
///
/// `Default` mirrors the production tuning. Weights and thresholds here were
/// tuned together; in particular the fusion weights assume BM25 scores
/// normalized by the candidate-subset maximum (see `search::keyword`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    // -------------------------------------------------------------------------
    // Fusion weights
    // -------------------------------------------------------------------------
    /// Semantic weight when ranking the full (unfiltered) chunk set
    pub semantic_weight: f32,
    /// Keyword weight when ranking the full chunk set
    pub keyword_weight: f32,
    /// Authority weight when ranking the full chunk set
    pub authority_weight: f32,
    /// Semantic weight when the precision filter actually narrowed candidates
    pub filtered_semantic_weight: f32,
    /// Keyword weight when the precision filter actually narrowed candidates
    pub filtered_keyword_weight: f32,
    /// Authority weight when the precision filter actually narrowed candidates
    pub filtered_authority_weight: f32,
    /// Semantic weight for ranking within a structurally matched file
    pub within_file_semantic_weight: f32,
    /// Keyword weight for ranking within a structurally matched file
    pub within_file_keyword_weight: f32,
    /// Authority weight within a matched file (zero: all chunks of an
    /// already-trusted file are equally authoritative)
    pub within_file_authority_weight: f32,

    // -------------------------------------------------------------------------
    // Authority scoring
    // -------------------------------------------------------------------------
    /// Base weight for AUTHORITATIVE documents
    pub authority_weight_authoritative: f32,
    /// Base weight for STABLE documents
    pub authority_weight_stable: f32,
    /// Base weight for documents with no declared status
    pub authority_weight_unmarked: f32,
    /// Base weight for ARCHIVED documents
    pub authority_weight_archived: f32,
    /// Flat additive bonus for canonical sources, applied after freshness
    pub canonical_bonus: f32,
    /// Lower bound of the authority score
    pub min_authority_score: f32,
    /// Upper bound of the authority score
    pub max_authority_score: f32,
    /// Freshness decay window in days; decay bottoms out at 0.5
    pub decay_window_days: i64,

    // -------------------------------------------------------------------------
    // Chunking
    // -------------------------------------------------------------------------
    /// Chunks smaller than this many lines are merge candidates
    pub min_chunk_lines: usize,
    /// Heading keywords that keep a chunk atomic even if small
    pub protected_heading_keywords: Vec<String>,

    // -------------------------------------------------------------------------
    // Query pipeline
    // -------------------------------------------------------------------------
    /// Default number of results per query
    pub default_top_k: usize,
    /// Enable deterministic structured lookup before ranking
    pub enable_structured_lookup: bool,
    /// Enable the Phase A precision pre-filter
    pub enable_precision_filter: bool,
    /// Enable the canonical-source authority multiplier
    pub enable_canonical_boost: bool,
    /// Enable suppression of routing documents in ranked results
    pub enable_routing_suppression: bool,

    // -------------------------------------------------------------------------
    // Structured lookup
    // -------------------------------------------------------------------------
    /// Minimum quick-reference score (Jaccard + phrase boost) to match
    pub quick_reference_threshold: f32,
    /// Additive boost when a question bigram appears verbatim in the query
    pub phrase_boost_bigram: f32,
    /// Additive boost when a question trigram appears verbatim in the query
    pub phrase_boost_trigram: f32,
    /// Minimum phrase length in characters for a phrase boost
    pub min_phrase_length: usize,
    /// Minimum canonical-concept token-overlap score to match
    pub canonical_threshold: f32,

    // -------------------------------------------------------------------------
    // Precision filter
    // -------------------------------------------------------------------------
    /// Minimum fraction of query keywords a chunk must contain
    pub min_keyword_overlap: f32,
    /// Minimum keyword length after tokenization
    pub min_keyword_length: usize,
    /// Regex patterns for files excluded from precision-filter candidates
    pub precision_excluded_patterns: Vec<String>,
    /// Suppress navigation docs for concept query types
    pub suppress_navigation: bool,
    /// Documents that route to other docs rather than containing content
    pub navigation_docs: Vec<String>,
    /// Query types for which navigation docs are suppressed
    pub concept_query_types: Vec<String>,
    /// Abbreviation -> expansion pairs; expansion is inserted after the
    /// abbreviation so both forms remain matchable
    pub abbreviations: Vec<(String, String)>,
    /// Ordered query-type classification table
    pub query_types: Vec<QueryTypePattern>,

    // -------------------------------------------------------------------------
    // Ranking boosts and suppression
    // -------------------------------------------------------------------------
    /// Authority multiplier for chunks of a detected canonical file
    pub canonical_boost_multiplier: f32,
    /// Regex patterns identifying routing content; group 1 captures the
    /// referenced file name
    pub routing_patterns: Vec<String>,

    // -------------------------------------------------------------------------
    // Index build
    // -------------------------------------------------------------------------
    /// Path prefixes under the docs root to skip during indexing
    pub excluded_paths: Vec<String>,
    /// Root-relative path of the document index (status table, quick
    /// reference, canonical sources)
    pub document_index: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.6,
            keyword_weight: 0.25,
            authority_weight: 0.15,
            filtered_semantic_weight: 0.5,
            filtered_keyword_weight: 0.35,
            filtered_authority_weight: 0.15,
            within_file_semantic_weight: 0.7,
            within_file_keyword_weight: 0.3,
            within_file_authority_weight: 0.0,

            authority_weight_authoritative: 1.0,
            authority_weight_stable: 0.7,
            authority_weight_unmarked: 0.4,
            authority_weight_archived: 0.1,
            canonical_bonus: 0.2,
            min_authority_score: 0.1,
            max_authority_score: 1.2,
            decay_window_days: 60,

            min_chunk_lines: 20,
            protected_heading_keywords: [
                "stage",
                "contract",
                "api",
                "endpoint",
                "phase",
                "track",
                "guardrail",
                "archived",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),

            default_top_k: 5,
            enable_structured_lookup: true,
            enable_precision_filter: true,
            enable_canonical_boost: true,
            enable_routing_suppression: true,

            quick_reference_threshold: 0.4,
            phrase_boost_bigram: 0.3,
            phrase_boost_trigram: 0.5,
            min_phrase_length: 6,
            canonical_threshold: 0.8,

            min_keyword_overlap: 0.3,
            min_keyword_length: 3,
            precision_excluded_patterns: Vec::new(),
            suppress_navigation: true,
            navigation_docs: vec![
                "docs/START_HERE.md".to_string(),
                "docs/CORE_DOCS_INDEX.md".to_string(),
            ],
            concept_query_types: ["architecture", "debugging", "methodology", "build"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            abbreviations: [
                ("api", "application programming interface"),
                ("cli", "command line interface"),
                ("ci", "continuous integration"),
                ("cd", "continuous deployment"),
                ("json", "javascript object notation"),
                ("llm", "large language model"),
                ("ux", "user experience"),
            ]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
            query_types: vec![
                QueryTypePattern {
                    name: "architecture".to_string(),
                    keywords: ["architecture", "pipeline", "system", "component"]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    patterns: Vec::new(),
                    canonical_file: Some("docs/ARCHITECTURE.md".to_string()),
                },
                QueryTypePattern {
                    name: "debugging".to_string(),
                    keywords: ["debug", "error", "bug", "fix", "broken", "symptom"]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    patterns: Vec::new(),
                    canonical_file: Some("docs/DEBUG_RUNBOOK.md".to_string()),
                },
                QueryTypePattern {
                    name: "methodology".to_string(),
                    keywords: ["methodology", "pattern", "measurement", "prototype"]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    patterns: Vec::new(),
                    canonical_file: Some("docs/DEV_GUIDE.md".to_string()),
                },
                QueryTypePattern {
                    name: "build".to_string(),
                    keywords: ["build", "workflow", "script", "generate", "template"]
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                    patterns: Vec::new(),
                    canonical_file: Some("docs/WORKFLOW_REGISTRY.md".to_string()),
                },
            ],

            canonical_boost_multiplier: 5.0,
            routing_patterns: vec![
                r"See \[?([A-Z_][A-Za-z_]+\.md)\]?".to_string(),
                r"\[([A-Z_]+\.md)\]\([^)]+\)".to_string(),
                r"See ([A-Z_]+\.md) §".to_string(),
                r"Details:\s*See \[?([A-Z_]+\.md)\]?".to_string(),
            ],

            excluded_paths: vec!["docs/_archive/".to_string()],
            document_index: "docs/CORE_DOCS_INDEX.md".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let config = RetrievalConfig::default();
        let broad = config.semantic_weight + config.keyword_weight + config.authority_weight;
        let filtered = config.filtered_semantic_weight
            + config.filtered_keyword_weight
            + config.filtered_authority_weight;
        let within = config.within_file_semantic_weight
            + config.within_file_keyword_weight
            + config.within_file_authority_weight;
        assert!((broad - 1.0).abs() < 1e-6);
        assert!((filtered - 1.0).abs() < 1e-6);
        assert!((within - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_authority_ordering() {
        let config = RetrievalConfig::default();
        assert!(config.authority_weight_authoritative > config.authority_weight_stable);
        assert!(config.authority_weight_stable > config.authority_weight_unmarked);
        assert!(config.authority_weight_unmarked > config.authority_weight_archived);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = RetrievalConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RetrievalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.query_types.len(), config.query_types.len());
        assert_eq!(back.routing_patterns, config.routing_patterns);
    }
}
