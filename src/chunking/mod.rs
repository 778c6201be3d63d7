//! Heading-based markdown chunking.
//!
//! Documents are split at `##` and `###` headings into contiguous,
//! non-overlapping line ranges, then a merge pass folds undersized `###`
//! sections into their parent `##` chunk so that retrieval returns passages
//! of useful length.
//!
//! # Chunk boundaries
//!
//! - Headings inside fenced code blocks are ignored.
//! - Content before the first heading becomes a synthetic `Header` chunk,
//!   emitted only when it contains a non-blank line.
//! - A document with no `##`/`###` headings becomes a single whole-file
//!   chunk titled after its first `#` heading, or the file stem when there
//!   is none.
//!
//! # Merge rules
//!
//! A chunk is kept atomic when it is the document's first chunk, is a `##`
//! section, carries a protected heading keyword, or meets the minimum line
//! count. Anything else is folded into the most recently retained chunk,
//! provided that chunk is a `##` section.
//!
//! Chunking never fails: malformed markdown degrades to coarser chunks.

pub mod types;

use crate::config::RetrievalConfig;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

pub use types::{Chunk, DocStatus, DocumentMetadata, QuickReferenceEntry};

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{2,3})\s+(.+)$").expect("valid heading regex"));
static H1_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s+(.+)$").expect("valid h1 regex"));
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z_]+\.md)\s*§\s*([^`\n]+)").expect("valid reference regex"));
static VERSION_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(v\d+\.\d+[^)]*\)").expect("valid version regex"));
static VERSION_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v\d+\.\d+").expect("valid version regex"));
static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Derives a chunk identifier from a file stem and heading text.
///
/// Pure function of its inputs: version markers like `(v2.1)` are stripped,
/// the heading is lowercased and slugged, and the result is truncated to
/// 100 characters. The stem keeps its original case.
pub fn chunk_id(stem: &str, heading: &str) -> String {
    let cleaned = VERSION_PAREN_RE.replace_all(heading, "");
    let cleaned = VERSION_BARE_RE.replace_all(&cleaned, "");
    let slug = NON_ALNUM_RE
        .replace_all(&cleaned.to_lowercase(), "_")
        .trim_matches('_')
        .to_string();
    let id = format!("{stem}__{slug}");
    let truncated: String = id.chars().take(100).collect();
    truncated.trim_end_matches('_').to_string()
}

/// Extracts `FILE.md § Section` references from chunk content.
///
/// Section names are trimmed of whitespace and trailing punctuation;
/// duplicates are dropped keeping first-seen order.
fn extract_references(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for caps in REFERENCE_RE.captures_iter(content) {
        let file = &caps[1];
        let section = caps[2].trim().trim_end_matches(['.', ',', ';', ':']);
        let formatted = format!("{file} § {section}");
        if !refs.contains(&formatted) {
            refs.push(formatted);
        }
    }
    refs
}

/// A raw section found during the heading scan.
struct RawSection {
    heading: String,
    level: u8,
    parent: Option<String>,
    /// 0-based inclusive line range
    start: usize,
    end: usize,
}

/// Splits a markdown document into heading-aligned chunks.
///
/// `rel_path` is the document's path relative to the corpus root and is
/// recorded verbatim in each chunk. The given metadata is attached to every
/// chunk of the document.
///
/// Line ranges in the returned chunks are 1-based inclusive, contiguous,
/// and non-overlapping per document.
pub fn chunk_document(
    text: &str,
    rel_path: &str,
    metadata: &DocumentMetadata,
    config: &RetrievalConfig,
) -> Vec<Chunk> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let path = Path::new(rel_path);
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel_path.to_string());

    // Heading scan with fenced-code-block tracking. The fence toggle is
    // checked before the heading match so commented-out headings inside
    // code examples don't split chunks.
    let mut boundaries: Vec<(usize, u8, String)> = Vec::new();
    let mut in_fence = false;
    for (i, line) in lines.iter().enumerate() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len() as u8;
            boundaries.push((i, level, caps[2].trim().to_string()));
        }
    }

    let mut sections: Vec<RawSection> = Vec::new();

    if boundaries.is_empty() {
        // Whole-file fallback: title from a first-line H1, else the stem.
        let heading = lines
            .first()
            .and_then(|l| H1_RE.captures(l))
            .map(|caps| caps[1].trim().to_string())
            .unwrap_or_else(|| stem.replace('_', " "));
        let content = lines.join("\n");
        let chunk = Chunk {
            chunk_id: chunk_id(&stem, &heading),
            source_file: rel_path.to_string(),
            section_reference: file_name.clone(),
            heading_text: heading,
            heading_level: 1,
            parent_sections: Vec::new(),
            content: content.clone(),
            line_range: (1, lines.len()),
            metadata: metadata.clone(),
            outgoing_references: extract_references(&content),
        };
        debug!(file = rel_path, chunks = 1, "chunked document (no headings)");
        return vec![chunk];
    }

    // Synthetic header chunk for content before the first heading.
    let first_heading = boundaries[0].0;
    if first_heading > 0 && lines[..first_heading].iter().any(|l| !l.trim().is_empty()) {
        sections.push(RawSection {
            heading: "Header".to_string(),
            level: 1,
            parent: None,
            start: 0,
            end: first_heading - 1,
        });
    }

    let mut current_h2: Option<String> = None;
    for (idx, (start, level, heading)) in boundaries.iter().enumerate() {
        let end = boundaries
            .get(idx + 1)
            .map(|(next, _, _)| next - 1)
            .unwrap_or(lines.len() - 1);
        let parent = if *level == 3 {
            current_h2.clone()
        } else {
            current_h2 = Some(heading.clone());
            None
        };
        sections.push(RawSection {
            heading: heading.clone(),
            level: *level,
            parent,
            start: *start,
            end,
        });
    }

    let chunks: Vec<Chunk> = sections
        .into_iter()
        .map(|section| {
            let content = lines[section.start..=section.end].join("\n");
            let section_reference = format!("{file_name} § {}", section.heading);
            Chunk {
                chunk_id: chunk_id(&stem, &section.heading),
                source_file: rel_path.to_string(),
                section_reference,
                heading_text: section.heading,
                heading_level: section.level,
                parent_sections: section.parent.into_iter().collect(),
                content: content.clone(),
                line_range: (section.start + 1, section.end + 1),
                metadata: metadata.clone(),
                outgoing_references: extract_references(&content),
            }
        })
        .collect();

    let merged = merge_small_chunks(chunks, config);
    debug!(file = rel_path, chunks = merged.len(), "chunked document");
    merged
}

/// Folds undersized `###` chunks into the preceding retained `##` chunk.
///
/// A chunk is retained as-is when any guard holds: it is the document's
/// first chunk, it is a `##` section, its heading carries a protected
/// keyword, or it meets `min_chunk_lines`. A merge candidate whose
/// predecessor is not a `##` chunk is also retained.
fn merge_small_chunks(chunks: Vec<Chunk>, config: &RetrievalConfig) -> Vec<Chunk> {
    let mut merged: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for (idx, chunk) in chunks.into_iter().enumerate() {
        let heading_lower = chunk.heading_text.to_lowercase();
        let protected = config
            .protected_heading_keywords
            .iter()
            .any(|kw| heading_lower.contains(&kw.to_lowercase()));
        if idx == 0
            || chunk.heading_level == 2
            || protected
            || chunk.line_count() >= config.min_chunk_lines
        {
            merged.push(chunk);
            continue;
        }
        match merged.last_mut() {
            Some(prev) if prev.heading_level == 2 => {
                prev.content.push('\n');
                prev.content.push_str(&chunk.content);
                prev.line_range.1 = chunk.line_range.1;
                for reference in chunk.outgoing_references {
                    if !prev.outgoing_references.contains(&reference) {
                        prev.outgoing_references.push(reference);
                    }
                }
            }
            _ => merged.push(chunk),
        }
    }
    merged
}
