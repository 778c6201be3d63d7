//! Embedding provider seam.
//!
//! The embedding model is an external collaborator: the engine only requires
//! something that maps text to a fixed-dimension vector. Providers are
//! expected to return **L2-normalized** vectors so that a dot product is a
//! cosine similarity; the engine never re-normalizes.
//!
//! [`HashingProvider`] is a deterministic, dependency-free implementation used
//! in tests and as an offline fallback. It produces stable vectors from token
//! hashes, which is enough to exercise every ranking path end to end.

use crate::error::EmbeddingError;

/// Maps text to a fixed-dimension embedding vector.
///
/// # Contract
///
/// - `embed` returns a vector of exactly `dimension()` elements, L2-normalized
///   (or all-zero for degenerate input).
/// - `model_id` identifies the model for snapshot compatibility checks; a
///   snapshot built with one model must not be queried through another.
///
/// Implementations must be `Send + Sync`: the retriever shares one provider
/// across concurrent `&self` queries.
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embedding dimension this provider produces.
    fn dimension(&self) -> usize;

    /// Stable identifier of the underlying model.
    fn model_id(&self) -> &str;
}

/// Dot product of two vectors.
///
/// With L2-normalized inputs this is cosine similarity. Mismatched lengths
/// score the overlapping prefix; callers guarantee equal dimensions via the
/// load-time manifest check.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Deterministic hashing embedder.
///
/// Tokenizes on non-alphanumeric boundaries, hashes each token into a bucket
/// (FNV-1a), accumulates with alternating sign, and L2-normalizes. Identical
/// texts always produce identical vectors, and texts sharing tokens have
/// positive similarity, which is all the ranking tests need.
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    /// Creates a provider with the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn fnv1a(token: &str) -> u64 {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in token.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let hash = Self::fnv1a(token);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "hashing-embedder"
    }
}
