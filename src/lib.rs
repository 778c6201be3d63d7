//! # lorebook
//!
//! Documentation retrieval engine: heading-aware chunking, authority
//! scoring, and hybrid semantic + keyword retrieval over a curated markdown
//! corpus.
//!
//! The pipeline has two halves:
//!
//! - **Build** ([`index::IndexBuilder`]): walk the corpus, resolve each
//!   document's status and freshness from the human-maintained document
//!   index, split documents into heading-aligned chunks, embed them through
//!   an [`embedding::EmbeddingProvider`], and persist an atomic snapshot.
//! - **Query** ([`search::HybridRetriever`]): answer natural-language
//!   queries through deterministic fast paths first (quick-reference and
//!   canonical-source lookup), then a precision-filtered fusion of semantic
//!   similarity, BM25 keyword relevance, and document authority.
//!
//! ```no_run
//! use lorebook::config::RetrievalConfig;
//! use lorebook::embedding::HashingProvider;
//! use lorebook::index::IndexBuilder;
//! use lorebook::search::HybridRetriever;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), lorebook::error::IndexError> {
//! let provider = Arc::new(HashingProvider::default());
//! let config = RetrievalConfig::default();
//!
//! let builder = IndexBuilder::new(provider.clone(), config.clone());
//! builder.build(Path::new("corpus"), Path::new("outputs/index"))?;
//!
//! let retriever = HybridRetriever::load(Path::new("outputs/index"), provider, config)?;
//! for result in retriever.query("how do I set up the project", None, None) {
//!     println!("{}  {:.3}", result.section_reference, result.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod metadata;
pub mod search;

pub use chunking::types::{Chunk, DocStatus, DocumentMetadata, QuickReferenceEntry};
pub use config::RetrievalConfig;
pub use embedding::EmbeddingProvider;
pub use error::{EmbeddingError, IndexError};
pub use index::{BuildStats, IndexBuilder, Snapshot};
pub use search::{HybridRetriever, LookupMethod, QueryResult};
