//! Document-index parsing.
//!
//! The corpus carries a human-maintained index document with three tables the
//! engine reads:
//!
//! - a **status table** mapping each document to its lifecycle status,
//!   verification date, and version;
//! - a **quick-reference table** mapping literal questions to the document
//!   that answers them;
//! - a **canonical-sources table** mapping concepts to their single source
//!   of truth.
//!
//! All parsers are lenient: a missing section or malformed row degrades to an
//! empty result with a warning, never an error. The regex logic is kept in
//! narrow per-table functions so scoring code never touches markdown.

pub mod authority;

use crate::chunking::types::{DocStatus, DocumentMetadata, QuickReferenceEntry};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

pub use authority::authority_score;

// Cells must not cross line boundaries, or a backticked path in a later
// table gets glued onto the tail of the status table.
static ROW4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*`([^`]+\.md)`\s*\|([^|\n]+)\|([^|\n]+)\|([^|\n]+)\|").expect("valid row regex")
});
static ROW3_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*`([^`]+\.md)`\s*\|([^|\n]+)\|([^|\n]+)\|").expect("valid row regex")
});
static BOLD_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([A-Z]+)\*\*").expect("valid status regex"));
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid date regex"));
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v(\d+\.\d+)").expect("valid version regex"));
static CANONICAL_ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\|\s*\*\*[^|]+\*\*\s*\|\s*`/?([^`]+\.md)`\s*\|").expect("valid canonical regex")
});
static QUICK_REF_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)##\s+Quick Reference(.*?)(?:\n##\s|\z)").expect("valid section regex")
});
static CANONICAL_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)##\s+Canonical Sources(.*?)(?:\n##\s|\z)").expect("valid section regex")
});
static BACKTICK_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`]+\.(?:md|py|json))`").expect("valid path regex"));
static BARE_MD_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9_/.-]+\.md)").expect("valid path regex"));
static HEADER_STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Status:\*\*\s*([A-Za-z]+)").expect("valid header regex"));
static HEADER_UPDATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*Last Updated:\*\*\s*(\d{4}-\d{2}-\d{2})").expect("valid header regex")
});
static HEADER_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*Version:\*\*\s*v?(\d+\.\d+)").expect("valid header regex"));

fn extract_status(cell: &str) -> DocStatus {
    if let Some(caps) = BOLD_STATUS_RE.captures(cell) {
        return DocStatus::from_label(&caps[1]);
    }
    // Unbolded fallback for hand-edited rows.
    for label in ["AUTHORITATIVE", "STABLE", "ARCHIVED"] {
        if cell.contains(label) {
            return DocStatus::from_label(label);
        }
    }
    DocStatus::Unmarked
}

fn extract_date(cell: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE_RE.captures(cell)?;
    NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()
}

/// Parses the status table of the document index.
///
/// Four-column rows (`path | purpose | status | verified`) are tried first;
/// the three-column form (no date) is a fallback used only when no
/// four-column row matched anywhere. Canonical-sources rows found in the
/// same text flip the `canonical` flag on matching entries.
pub fn parse_document_index(text: &str) -> BTreeMap<String, DocumentMetadata> {
    let mut index: BTreeMap<String, DocumentMetadata> = BTreeMap::new();

    for caps in ROW4_RE.captures_iter(text) {
        let path = caps[1].trim().to_string();
        let purpose = &caps[2];
        let metadata = DocumentMetadata {
            status: extract_status(&caps[3]),
            verified: extract_date(&caps[4]),
            version: VERSION_RE.captures(purpose).map(|v| v[1].to_string()),
            canonical: false,
        };
        index.insert(path, metadata);
    }

    if index.is_empty() {
        for caps in ROW3_RE.captures_iter(text) {
            let path = caps[1].trim().to_string();
            let purpose = &caps[2];
            let metadata = DocumentMetadata {
                status: extract_status(&caps[3]),
                verified: None,
                version: VERSION_RE.captures(purpose).map(|v| v[1].to_string()),
                canonical: false,
            };
            index.insert(path, metadata);
        }
    }

    for caps in CANONICAL_ROW_RE.captures_iter(text) {
        let canonical_path = caps[1].trim().to_string();
        if let Some(entry) = index.get_mut(&canonical_path) {
            entry.canonical = true;
            continue;
        }
        // Table paths and canonical paths are not always written at the same
        // depth; fall back to matching by file name.
        let canonical_name = file_name(&canonical_path);
        for (path, entry) in index.iter_mut() {
            if file_name(path) == canonical_name {
                entry.canonical = true;
            }
        }
    }

    if index.is_empty() {
        warn!("no status rows found in document index");
    } else {
        debug!(documents = index.len(), "parsed document index");
    }
    index
}

/// Parses the quick-reference table: one `(question, file)` entry per row.
///
/// The first column is the question; the answering file is the first
/// backticked path anywhere in the row, with a bare `.md` path as fallback.
pub fn parse_quick_reference_table(text: &str) -> Vec<QuickReferenceEntry> {
    let Some(section) = QUICK_REF_SECTION_RE.captures(text) else {
        debug!("no quick-reference section found");
        return Vec::new();
    };

    let mut entries = Vec::new();
    for line in section[1].lines() {
        let line = line.trim();
        if !line.starts_with('|') || line.contains("---") {
            continue;
        }
        let cells: Vec<&str> = line.trim_matches('|').split('|').collect();
        let question = cells
            .first()
            .map(|c| c.trim().trim_matches('*').trim().to_string())
            .unwrap_or_default();
        if question.is_empty() || question.eq_ignore_ascii_case("question") {
            continue;
        }
        let file = BACKTICK_PATH_RE
            .captures(line)
            .map(|caps| caps[1].to_string())
            .or_else(|| BARE_MD_PATH_RE.captures(line).map(|caps| caps[1].to_string()));
        if let Some(file) = file {
            entries.push(QuickReferenceEntry { question, file });
        }
    }
    debug!(entries = entries.len(), "parsed quick-reference table");
    entries
}

/// Parses the canonical-sources table into a concept → path map.
///
/// Concepts are lowercased with bold markers stripped. Values that don't
/// look like paths (no `.` or no `/`) are dropped.
pub fn parse_canonical_sources_table(text: &str) -> BTreeMap<String, String> {
    let Some(section) = CANONICAL_SECTION_RE.captures(text) else {
        debug!("no canonical-sources section found");
        return BTreeMap::new();
    };

    let mut map = BTreeMap::new();
    for line in section[1].lines() {
        let line = line.trim();
        if !line.starts_with('|') || line.contains("---") {
            continue;
        }
        let cells: Vec<&str> = line.trim_matches('|').split('|').collect();
        if cells.len() < 2 {
            continue;
        }
        let concept = cells[0].trim().trim_matches('*').trim().to_lowercase();
        let path = cells[1].trim().trim_matches('`').trim().to_string();
        if concept.is_empty() || concept == "concept" {
            continue;
        }
        if path.contains('.') && path.contains('/') {
            map.insert(concept, path);
        }
    }
    debug!(concepts = map.len(), "parsed canonical-sources table");
    map
}

/// Extracts fallback metadata from a document's own header block.
///
/// Scans the first 50 lines for `**Status:**`, `**Last Updated:**`, and
/// `**Version:**` markers. Used for files absent from the document index.
pub fn parse_file_header(text: &str) -> DocumentMetadata {
    let head: String = text.lines().take(50).collect::<Vec<_>>().join("\n");
    DocumentMetadata {
        status: HEADER_STATUS_RE
            .captures(&head)
            .map(|caps| DocStatus::from_label(&caps[1].to_uppercase()))
            .unwrap_or_default(),
        verified: HEADER_UPDATED_RE
            .captures(&head)
            .and_then(|caps| NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()),
        version: HEADER_VERSION_RE.captures(&head).map(|caps| caps[1].to_string()),
        canonical: false,
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
