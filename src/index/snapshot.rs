//! Persisted index snapshot.
//!
//! A snapshot is the write-once artifact the retriever loads:
//!
//! - `manifest.json` — embedding model id, dimension, chunk count
//! - `chunks.jsonl` — one chunk record per line, ordered
//! - `vectors.bin` — `(count, dim)` u64 LE header, then `count × dim`
//!   little-endian f32 values, row `i` paired with chunk line `i`
//! - `quick_reference.json` — quick-reference entries with their question
//!   vectors, plus the canonical-sources concept map
//!
//! Every file is written to a temporary sibling and renamed into place, with
//! the manifest renamed last, so a reader never observes a half-written
//! snapshot. Corrupt chunk lines are skipped on load together with their
//! paired vector, keeping the chunk/vector arrays aligned.

use crate::chunking::types::{Chunk, QuickReferenceEntry};
use crate::error::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{info, warn};

const MANIFEST_FILE: &str = "manifest.json";
const CHUNKS_FILE: &str = "chunks.jsonl";
const VECTORS_FILE: &str = "vectors.bin";
const QUICK_REFERENCE_FILE: &str = "quick_reference.json";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    model: String,
    dimension: usize,
    chunk_count: usize,
    created_at: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QuickReferenceFile {
    entries: Vec<QuickReferenceEntry>,
    vectors: Vec<Vec<f32>>,
    canonical_sources: BTreeMap<String, String>,
}

/// An immutable, fully loaded index snapshot.
///
/// `chunks` and `vectors` are paired by position. The retriever treats a
/// loaded snapshot as read-only, which is what makes lock-free concurrent
/// queries safe.
#[derive(Debug)]
pub struct Snapshot {
    /// All chunks in build order
    pub chunks: Vec<Chunk>,
    /// Chunk embedding vectors, `vectors[i]` belongs to `chunks[i]`
    pub vectors: Vec<Vec<f32>>,
    /// Quick-reference entries from the document index
    pub quick_reference: Vec<QuickReferenceEntry>,
    /// Question vectors, paired by position with `quick_reference`
    pub quick_reference_vectors: Vec<Vec<f32>>,
    /// Concept → canonical source path
    pub canonical_sources: BTreeMap<String, String>,
    /// Identifier of the embedding model that produced the vectors
    pub model: String,
    /// Embedding dimension
    pub dimension: usize,
}

impl Snapshot {
    /// Writes the snapshot to `dir`, creating it if needed.
    ///
    /// Each file goes through a write-then-rename; the manifest lands last
    /// so its presence implies the rest of the snapshot is complete.
    pub fn write(&self, dir: &Path) -> Result<(), IndexError> {
        fs::create_dir_all(dir)?;

        let mut lines = String::new();
        for chunk in &self.chunks {
            lines.push_str(&serde_json::to_string(chunk)?);
            lines.push('\n');
        }
        write_atomic(dir, CHUNKS_FILE, lines.as_bytes())?;

        write_atomic(dir, VECTORS_FILE, &encode_vectors(&self.vectors, self.dimension))?;

        let quick_reference = QuickReferenceFile {
            entries: self.quick_reference.clone(),
            vectors: self.quick_reference_vectors.clone(),
            canonical_sources: self.canonical_sources.clone(),
        };
        write_atomic(
            dir,
            QUICK_REFERENCE_FILE,
            serde_json::to_vec_pretty(&quick_reference)?.as_slice(),
        )?;

        let manifest = Manifest {
            model: self.model.clone(),
            dimension: self.dimension,
            chunk_count: self.chunks.len(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        write_atomic(dir, MANIFEST_FILE, serde_json::to_vec_pretty(&manifest)?.as_slice())?;

        info!(
            dir = %dir.display(),
            chunks = self.chunks.len(),
            dimension = self.dimension,
            "wrote index snapshot"
        );
        Ok(())
    }

    /// Loads a snapshot from `dir`.
    ///
    /// Returns [`IndexError::Missing`] when a required file is absent and
    /// [`IndexError::Corrupt`] when the vector blob is inconsistent with the
    /// manifest. Individually corrupt chunk lines are skipped with a warning,
    /// along with their paired vectors.
    pub fn load(dir: &Path) -> Result<Self, IndexError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(IndexError::Missing(manifest_path.display().to_string()));
        }
        let manifest: Manifest = serde_json::from_str(&fs::read_to_string(&manifest_path)?)?;

        let chunks_path = dir.join(CHUNKS_FILE);
        if !chunks_path.exists() {
            return Err(IndexError::Missing(chunks_path.display().to_string()));
        }
        let vectors_path = dir.join(VECTORS_FILE);
        if !vectors_path.exists() {
            return Err(IndexError::Missing(vectors_path.display().to_string()));
        }

        let mut chunks = Vec::new();
        let mut kept_rows = Vec::new();
        let reader = BufReader::new(fs::File::open(&chunks_path)?);
        for (row, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Chunk>(&line) {
                Ok(chunk) => {
                    chunks.push(chunk);
                    kept_rows.push(row);
                }
                Err(e) => warn!(row, error = %e, "skipping corrupt chunk record"),
            }
        }

        let all_vectors = decode_vectors(&fs::read(&vectors_path)?, manifest.dimension)?;
        let mut vectors = Vec::with_capacity(kept_rows.len());
        for &row in &kept_rows {
            let vector = all_vectors.get(row).ok_or_else(|| {
                IndexError::Corrupt(format!(
                    "vector blob has {} rows but chunk file references row {row}",
                    all_vectors.len()
                ))
            })?;
            vectors.push(vector.clone());
        }

        let quick_reference: QuickReferenceFile = match fs::read_to_string(dir.join(QUICK_REFERENCE_FILE)) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(error = %e, "corrupt quick-reference file, continuing without it");
                QuickReferenceFile::default()
            }),
            // Optional signal: absence just disables structured lookup.
            Err(_) => QuickReferenceFile::default(),
        };

        info!(
            dir = %dir.display(),
            chunks = chunks.len(),
            quick_reference = quick_reference.entries.len(),
            model = %manifest.model,
            "loaded index snapshot"
        );

        Ok(Self {
            chunks,
            vectors,
            quick_reference: quick_reference.entries,
            quick_reference_vectors: quick_reference.vectors,
            canonical_sources: quick_reference.canonical_sources,
            model: manifest.model,
            dimension: manifest.dimension,
        })
    }
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = dir.join(format!("{name}.tmp"));
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

fn encode_vectors(vectors: &[Vec<f32>], dimension: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(16 + vectors.len() * dimension * 4);
    bytes.extend_from_slice(&(vectors.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&(dimension as u64).to_le_bytes());
    for vector in vectors {
        for value in vector {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

fn decode_vectors(bytes: &[u8], expected_dim: usize) -> Result<Vec<Vec<f32>>, IndexError> {
    if bytes.len() < 16 {
        return Err(IndexError::Corrupt("vector blob shorter than header".to_string()));
    }
    let count = u64::from_le_bytes(bytes[0..8].try_into().expect("sliced 8 bytes")) as usize;
    let dim = u64::from_le_bytes(bytes[8..16].try_into().expect("sliced 8 bytes")) as usize;
    if dim != expected_dim {
        return Err(IndexError::Corrupt(format!(
            "vector blob dimension {dim} does not match manifest dimension {expected_dim}"
        )));
    }
    let expected_len = 16 + count * dim * 4;
    if bytes.len() != expected_len {
        return Err(IndexError::Corrupt(format!(
            "vector blob is {} bytes, expected {expected_len}",
            bytes.len()
        )));
    }
    let mut vectors = Vec::with_capacity(count);
    let mut offset = 16;
    for _ in 0..count {
        let mut vector = Vec::with_capacity(dim);
        for _ in 0..dim {
            vector.push(f32::from_le_bytes(
                bytes[offset..offset + 4].try_into().expect("sliced 4 bytes"),
            ));
            offset += 4;
        }
        vectors.push(vector);
    }
    Ok(vectors)
}
