//! Error types for lorebook.
//!
//! Errors follow the propagation policy of the retrieval pipeline:
//! build-time failures on individual files or chunks are recovered locally
//! and surfaced as warnings, load-time failures on required snapshot files
//! are fatal, and query-time failures on optional signals degrade into
//! zeroed score contributions rather than reaching the caller.

use thiserror::Error;

/// Errors that can occur while building, persisting, or loading an index
/// snapshot.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A required snapshot file is absent. Fatal to query operations;
    /// the caller must rebuild the index.
    #[error("index snapshot not found at {0} (rebuild the index)")]
    Missing(String),
    /// Stored embedding dimension does not match the live embedding
    /// provider. Detected at load time, never mid-ranking.
    #[error("embedding dimension mismatch: snapshot has {stored}, provider produces {live}")]
    DimensionMismatch {
        /// Dimension recorded in the snapshot manifest
        stored: usize,
        /// Dimension of the configured embedding provider
        live: usize,
    },
    /// I/O failure reading or writing snapshot files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A snapshot file exists but cannot be interpreted.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
}

/// Errors raised by an embedding provider.
///
/// At query time these are always recovered by substituting a zero vector;
/// at build time they are recovered per chunk and counted in the build stats.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// The provider failed to produce a vector.
    #[error("embedding failed: {0}")]
    Provider(String),
    /// The provider returned a vector of unexpected dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected embedding dimension
        expected: usize,
        /// Actual embedding dimension received
        actual: usize,
    },
}

/// Validates that an embedding has the expected dimension.
///
/// Returns `Err(EmbeddingError::DimensionMismatch)` otherwise.
pub fn validate_dimension(expected: usize, actual: usize) -> Result<(), EmbeddingError> {
    if actual == expected {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch { expected, actual })
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::Corrupt(e.to_string())
    }
}
