//! Index building: corpus walk → metadata → chunks → embeddings → snapshot.
//!
//! [`IndexBuilder`] runs the whole batch pipeline in one synchronous pass.
//! Per-file failures are recovered (warn and skip) so one unreadable document
//! never fails a build; per-chunk embedding failures degrade to zero vectors
//! and are counted in the returned [`BuildStats`].

pub mod snapshot;

use crate::chunking::{chunk_document, types::Chunk};
use crate::config::RetrievalConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::IndexError;
use crate::metadata::{
    parse_canonical_sources_table, parse_document_index, parse_file_header,
    parse_quick_reference_table,
};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

pub use snapshot::Snapshot;

/// Maximum content prefix embedded per chunk. Headings plus the opening of
/// a section carry most of its topical signal.
const EMBED_CONTENT_CHARS: usize = 500;

/// Summary of one index build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStats {
    /// Markdown files chunked into the index
    pub file_count: usize,
    /// Total chunks produced
    pub chunk_count: usize,
    /// Files skipped because they could not be read
    pub skipped_files: usize,
    /// Chunks or questions that fell back to a zero vector
    pub embed_failures: usize,
    /// Mean chunk length in source lines
    pub avg_chunk_lines: f32,
    /// Wall-clock build duration
    pub build_seconds: f64,
    /// Quick-reference questions embedded
    pub quick_reference_questions: usize,
}

#[derive(Serialize)]
struct BuildLogEvent<'a> {
    timestamp: String,
    file_count: usize,
    chunk_count: usize,
    avg_chunk_lines: f32,
    build_seconds: f64,
    model: &'a str,
    embedding_dim: usize,
    quick_reference_questions: usize,
}

/// Builds an index snapshot from a documentation corpus.
pub struct IndexBuilder {
    provider: Arc<dyn EmbeddingProvider>,
    config: RetrievalConfig,
}

impl IndexBuilder {
    /// Creates a builder using the given embedding provider.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: RetrievalConfig) -> Self {
        Self { provider, config }
    }

    /// Walks `docs_root`, chunks every `.md` file, embeds chunks and
    /// quick-reference questions, and writes an atomic snapshot to `out_dir`.
    ///
    /// Document metadata is resolved from the document index first (exact
    /// path, then file-name match), falling back to the file's own header
    /// block. A build event is appended to `build_log.jsonl` in `out_dir`.
    #[instrument(skip(self), fields(root = %docs_root.display()))]
    pub fn build(&self, docs_root: &Path, out_dir: &Path) -> Result<BuildStats, IndexError> {
        let started = Instant::now();

        let index_text = match fs::read_to_string(docs_root.join(&self.config.document_index)) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    path = %self.config.document_index,
                    error = %e,
                    "document index unreadable, building without status metadata"
                );
                String::new()
            }
        };
        let doc_index = parse_document_index(&index_text);
        let quick_reference = parse_quick_reference_table(&index_text);
        let canonical_sources = parse_canonical_sources_table(&index_text);

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut vectors: Vec<Vec<f32>> = Vec::new();
        let mut file_count = 0usize;
        let mut skipped_files = 0usize;
        let mut embed_failures = 0usize;
        let mut total_lines = 0usize;

        for entry in WalkDir::new(docs_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("md") {
                continue;
            }
            let rel = relative_path(path, docs_root);
            if self.config.excluded_paths.iter().any(|p| rel.starts_with(p)) {
                continue;
            }

            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %rel, error = %e, "skipping unreadable file");
                    skipped_files += 1;
                    continue;
                }
            };

            let metadata = doc_index
                .get(&rel)
                .cloned()
                .or_else(|| {
                    let name = rel.rsplit('/').next().unwrap_or(&rel);
                    doc_index.iter().find_map(|(path, meta)| {
                        (path.rsplit('/').next().unwrap_or(path) == name).then(|| meta.clone())
                    })
                })
                .unwrap_or_else(|| parse_file_header(&text));

            for chunk in chunk_document(&text, &rel, &metadata, &self.config) {
                let prefix: String = chunk.content.chars().take(EMBED_CONTENT_CHARS).collect();
                let embed_text = format!("{}\n{}", chunk.heading_text, prefix);
                vectors.push(self.embed_or_zero(&embed_text, &mut embed_failures));
                total_lines += chunk.line_count();
                chunks.push(chunk);
            }
            file_count += 1;
        }

        let quick_reference_vectors: Vec<Vec<f32>> = quick_reference
            .iter()
            .map(|entry| self.embed_or_zero(&entry.question, &mut embed_failures))
            .collect();

        let snapshot = Snapshot {
            chunks,
            vectors,
            quick_reference,
            quick_reference_vectors,
            canonical_sources,
            model: self.provider.model_id().to_string(),
            dimension: self.provider.dimension(),
        };
        snapshot.write(out_dir)?;

        let chunk_count = snapshot.chunks.len();
        let stats = BuildStats {
            file_count,
            chunk_count,
            skipped_files,
            embed_failures,
            avg_chunk_lines: if chunk_count > 0 {
                total_lines as f32 / chunk_count as f32
            } else {
                0.0
            },
            build_seconds: started.elapsed().as_secs_f64(),
            quick_reference_questions: snapshot.quick_reference.len(),
        };

        self.append_build_log(out_dir, &stats);
        info!(
            files = stats.file_count,
            chunks = stats.chunk_count,
            skipped = stats.skipped_files,
            seconds = stats.build_seconds,
            "index build complete"
        );
        Ok(stats)
    }

    fn embed_or_zero(&self, text: &str, failures: &mut usize) -> Vec<f32> {
        match self.provider.embed(text) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(error = %e, "embedding failed, using zero vector");
                *failures += 1;
                vec![0.0; self.provider.dimension()]
            }
        }
    }

    /// Appends a build event to the append-only build log. The log is
    /// advisory, so failures here only warn.
    fn append_build_log(&self, out_dir: &Path, stats: &BuildStats) {
        let event = BuildLogEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            file_count: stats.file_count,
            chunk_count: stats.chunk_count,
            avg_chunk_lines: stats.avg_chunk_lines,
            build_seconds: stats.build_seconds,
            model: self.provider.model_id(),
            embedding_dim: self.provider.dimension(),
            quick_reference_questions: stats.quick_reference_questions,
        };
        let result = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(out_dir.join("build_log.jsonl"))
            .and_then(|mut file| {
                let line = serde_json::to_string(&event).unwrap_or_default();
                writeln!(file, "{line}")
            });
        if let Err(e) = result {
            warn!(error = %e, "failed to append build log event");
        }
    }
}

fn relative_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
