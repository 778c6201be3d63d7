//! Query-time retrieval: keyword scoring, precision filtering, structured
//! lookup, and the hybrid orchestrator.

pub mod keyword;
pub mod precision;
pub mod retriever;
pub mod structured;
pub mod types;

pub use keyword::KeywordScorer;
pub use precision::{PrecisionFilter, PrecisionOutcome, QueryClassification};
pub use retriever::HybridRetriever;
pub use structured::StructuredLookup;
pub use types::{LookupMethod, QueryResult, StructuredMatch};
