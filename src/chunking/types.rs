//! Core record types shared across the chunking, indexing, and search layers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a document, declared in the document index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocStatus {
    /// The single source of truth for its topic
    #[serde(rename = "AUTHORITATIVE")]
    Authoritative,
    /// Correct but not the primary reference
    #[serde(rename = "STABLE")]
    Stable,
    /// Kept for history; should rank last
    #[serde(rename = "ARCHIVED")]
    Archived,
    /// No declared status
    #[serde(rename = "unmarked")]
    Unmarked,
}

impl DocStatus {
    /// Parses a status label as it appears in index tables.
    ///
    /// Unknown labels map to [`DocStatus::Unmarked`].
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "AUTHORITATIVE" => DocStatus::Authoritative,
            "STABLE" => DocStatus::Stable,
            "ARCHIVED" => DocStatus::Archived,
            _ => DocStatus::Unmarked,
        }
    }

    /// The canonical label for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocStatus::Authoritative => "AUTHORITATIVE",
            DocStatus::Stable => "STABLE",
            DocStatus::Archived => "ARCHIVED",
            DocStatus::Unmarked => "unmarked",
        }
    }
}

impl Default for DocStatus {
    fn default() -> Self {
        DocStatus::Unmarked
    }
}

/// Per-document metadata resolved from the document index (or from the
/// file's own header block as a fallback).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Declared lifecycle status
    pub status: DocStatus,
    /// Last human verification date; `None` means unknown and skips
    /// freshness decay entirely
    pub verified: Option<NaiveDate>,
    /// Declared version string, e.g. `"2.1"`
    pub version: Option<String>,
    /// Whether the document is listed as a canonical source
    pub canonical: bool,
}

/// A contiguous, heading-aligned slice of one markdown document.
///
/// Chunks are the unit of embedding, scoring, and retrieval. For any one
/// document the chunk line ranges are contiguous and non-overlapping, both
/// before and after the merge pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier derived purely from the file stem and heading text
    pub chunk_id: String,
    /// Path of the source document, relative to the corpus root
    pub source_file: String,
    /// Human-readable citation, e.g. `"GUIDE.md § Error Handling"`
    pub section_reference: String,
    /// Heading text without the `#` markers
    pub heading_text: String,
    /// Heading level: 1 for header/whole-file chunks, 2 or 3 for sections
    pub heading_level: u8,
    /// Enclosing level-2 heading for level-3 chunks, empty otherwise
    pub parent_sections: Vec<String>,
    /// Raw markdown content of the chunk's lines
    pub content: String,
    /// 1-based inclusive line range in the source document
    pub line_range: (usize, usize),
    /// Metadata of the source document
    pub metadata: DocumentMetadata,
    /// `FILE.md § Section` references found in the content, first-seen order
    pub outgoing_references: Vec<String>,
}

impl Chunk {
    /// Number of source lines this chunk spans.
    pub fn line_count(&self) -> usize {
        self.line_range.1 - self.line_range.0 + 1
    }
}

/// One row of the quick-reference table: a literal question mapped to the
/// document that answers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReferenceEntry {
    /// The question as written in the table
    pub question: String,
    /// Root-relative path of the answering document
    pub file: String,
}
