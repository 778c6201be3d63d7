//! Precision pre-filter.
//!
//! Before any ranking, the query is expanded (abbreviations), reduced to
//! keywords, and classified into a query type; chunks are then filtered to
//! those plausibly relevant. Narrowing the candidate set before fusion is
//! what lets the keyword signal carry more weight without drowning in noise.
//!
//! The filter is conservative by construction: when it has no signal (no
//! usable keywords) or would eliminate everything, the caller falls back to
//! the full chunk set.

use crate::chunking::types::Chunk;
use crate::config::RetrievalConfig;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;
use tracing::{debug, warn};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+(?:\.[0-9]+)?").expect("valid token regex"));

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "is", "are", "was", "were", "what", "how", "why", "when", "where",
        "who", "which", "do", "does", "did", "can", "could", "should", "would", "in", "on",
        "at", "to", "for", "of", "with", "and", "or", "not", "be", "been", "being", "this",
        "that", "these", "those", "it", "its", "from", "by", "as", "have", "has", "had",
        "will", "about", "into", "if", "then", "than", "so", "but", "my", "our", "your", "we",
        "you",
    ]
    .into_iter()
    .collect()
});

/// Outcome of query classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryClassification {
    /// Matched query-type name, `"general"` when nothing matched
    pub query_type: String,
    /// Canonical file for the matched type, if declared
    pub canonical_file: Option<String>,
}

/// Outcome of candidate filtering.
#[derive(Debug, Clone)]
pub struct PrecisionOutcome {
    /// Ordinals (into the chunk list) of surviving candidates
    pub candidates: Vec<usize>,
    /// Classification that drove the filtering
    pub classification: QueryClassification,
}

struct CompiledQueryType {
    name: String,
    keywords: HashSet<String>,
    patterns: Vec<Regex>,
    canonical_file: Option<String>,
}

/// Compiled form of the precision-filter configuration.
pub struct PrecisionFilter {
    abbreviations: Vec<(Regex, String)>,
    query_types: Vec<CompiledQueryType>,
    excluded: Vec<Regex>,
    navigation_docs: Vec<String>,
    concept_types: HashSet<String>,
    min_keyword_length: usize,
    min_keyword_overlap: f32,
    suppress_navigation: bool,
}

impl PrecisionFilter {
    /// Compiles the filter from configuration. Invalid regex patterns are
    /// skipped with a warning rather than failing construction.
    pub fn new(config: &RetrievalConfig) -> Self {
        let abbreviations = config
            .abbreviations
            .iter()
            .filter_map(|(abbrev, expansion)| {
                let pattern = format!(r"\b{}\b", regex::escape(&abbrev.to_lowercase()));
                match Regex::new(&pattern) {
                    Ok(re) => Some((re, format!("{} {}", abbrev.to_lowercase(), expansion))),
                    Err(e) => {
                        warn!(abbrev, error = %e, "skipping unusable abbreviation");
                        None
                    }
                }
            })
            .collect();

        let query_types = config
            .query_types
            .iter()
            .map(|qt| CompiledQueryType {
                name: qt.name.clone(),
                keywords: qt.keywords.iter().map(|k| k.to_lowercase()).collect(),
                patterns: qt
                    .patterns
                    .iter()
                    .filter_map(|p| match Regex::new(p) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(pattern = %p, error = %e, "skipping unusable query-type pattern");
                            None
                        }
                    })
                    .collect(),
                canonical_file: qt.canonical_file.clone(),
            })
            .collect();

        let excluded = config
            .precision_excluded_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "skipping unusable exclusion pattern");
                    None
                }
            })
            .collect();

        Self {
            abbreviations,
            query_types,
            excluded,
            navigation_docs: config.navigation_docs.clone(),
            concept_types: config.concept_query_types.iter().cloned().collect(),
            min_keyword_length: config.min_keyword_length,
            min_keyword_overlap: config.min_keyword_overlap,
            suppress_navigation: config.suppress_navigation,
        }
    }

    /// Lowercases the query and inserts abbreviation expansions after each
    /// abbreviation, so both the short and long forms remain matchable.
    pub fn expand_query(&self, query: &str) -> String {
        let mut expanded = query.to_lowercase();
        for (re, replacement) in &self.abbreviations {
            expanded = re.replace_all(&expanded, replacement.as_str()).into_owned();
        }
        expanded
    }

    /// Extracts content keywords from a query.
    ///
    /// Tokens are lowercase alphanumerics (dotted version numbers like
    /// `2.1` survive as one token), filtered by stopwords and minimum
    /// length. Naive `-ing`/`-ed` stems are added alongside the originals.
    pub fn extract_keywords(&self, query: &str) -> BTreeSet<String> {
        let expanded = self.expand_query(query);
        let mut keywords = BTreeSet::new();
        for token in TOKEN_RE.find_iter(&expanded) {
            let token = token.as_str();
            if token.len() < self.min_keyword_length || STOPWORDS.contains(token) {
                continue;
            }
            keywords.insert(token.to_string());
            if let Some(stem) = token.strip_suffix("ing").filter(|s| s.len() >= 3) {
                keywords.insert(stem.to_string());
            } else if let Some(stem) = token.strip_suffix("ed").filter(|s| s.len() >= 3) {
                keywords.insert(stem.to_string());
            }
        }
        keywords
    }

    /// Classifies a query against the configured type table.
    ///
    /// Types are tried in declaration order; within each type the regex
    /// patterns are checked before the keyword intersection, and the first
    /// type with any hit wins. Defaults to `"general"` with no canonical
    /// file.
    pub fn classify(&self, query: &str) -> QueryClassification {
        let query_lower = query.to_lowercase();
        let keywords = self.extract_keywords(query);
        for qt in &self.query_types {
            let hit = qt.patterns.iter().any(|re| re.is_match(&query_lower))
                || keywords.iter().any(|k| qt.keywords.contains(k));
            if hit {
                return QueryClassification {
                    query_type: qt.name.clone(),
                    canonical_file: qt.canonical_file.clone(),
                };
            }
        }
        QueryClassification {
            query_type: "general".to_string(),
            canonical_file: None,
        }
    }

    /// Filters chunks down to plausible candidates for the query.
    ///
    /// Per chunk: excluded paths are dropped; navigation documents (matched
    /// by path containment, so depth prefixes don't matter) are dropped for
    /// concept-type queries; the classified canonical file is
    /// always kept; everything else must contain at least
    /// `max(1, round(n × min_keyword_overlap))` of the query's keywords.
    ///
    /// A query with no usable keywords filters nothing.
    pub fn filter(&self, query: &str, chunks: &[Chunk]) -> PrecisionOutcome {
        let classification = self.classify(query);
        let keywords = self.extract_keywords(query);
        if keywords.is_empty() {
            return PrecisionOutcome {
                candidates: (0..chunks.len()).collect(),
                classification,
            };
        }

        let required = ((keywords.len() as f32 * self.min_keyword_overlap).round() as usize).max(1);
        let is_concept = self.concept_types.contains(&classification.query_type);

        let mut candidates = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if self.excluded.iter().any(|re| re.is_match(&chunk.source_file)) {
                continue;
            }
            if self.suppress_navigation
                && is_concept
                && self
                    .navigation_docs
                    .iter()
                    .any(|d| chunk.source_file.contains(d.as_str()))
            {
                continue;
            }
            if let Some(canonical) = &classification.canonical_file {
                if chunk.source_file.contains(canonical.as_str()) {
                    candidates.push(i);
                    continue;
                }
            }
            let text = format!("{} {}", chunk.heading_text, chunk.content).to_lowercase();
            let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
            if hits >= required {
                candidates.push(i);
            }
        }

        debug!(
            query_type = %classification.query_type,
            keywords = keywords.len(),
            candidates = candidates.len(),
            total = chunks.len(),
            "precision filter"
        );
        PrecisionOutcome {
            candidates,
            classification,
        }
    }
}
