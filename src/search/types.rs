//! Result and match types for the search pipeline.

use serde::{Deserialize, Serialize};

/// How a result (or structured match) was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMethod {
    /// Deterministic quick-reference table hit
    QuickReference,
    /// Deterministic canonical-sources concept hit
    CanonicalSource,
    /// Ranked semantic + keyword + authority fusion
    Hybrid,
    /// Empty-query fallback ordered by authority alone
    AuthorityFallback,
}

/// A deterministic structured-lookup hit, resolved before any ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredMatch {
    /// Root-relative path of the matched document
    pub file: String,
    /// The quick-reference question that matched, if any
    pub question: Option<String>,
    /// Fixed confidence of the lookup layer that produced the match
    pub confidence: f32,
    /// Which lookup layer matched
    pub method: LookupMethod,
}

/// One ranked retrieval result.
///
/// Component scores are retained alongside the fused score so callers can
/// explain a ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Stable chunk identifier
    pub chunk_id: String,
    /// Root-relative path of the source document
    pub source_file: String,
    /// Human-readable citation, e.g. `"GUIDE.md § Error Handling"`
    pub section_reference: String,
    /// Chunk heading
    pub heading_text: String,
    /// Raw chunk content
    pub content: String,
    /// 1-based inclusive line range in the source document
    pub line_range: (usize, usize),
    /// Fused ranking score
    pub score: f32,
    /// Semantic (cosine) component
    pub semantic_score: f32,
    /// Normalized, heading-boosted keyword component
    pub keyword_score: f32,
    /// Authority component, after any canonical multiplier
    pub authority_score: f32,
    /// Pipeline path that produced this result
    pub lookup_method: LookupMethod,
    /// Structured-lookup confidence, when applicable
    pub confidence: Option<f32>,
    /// Whether the precision filter narrowed the candidate set
    pub precision_filtered: bool,
}
