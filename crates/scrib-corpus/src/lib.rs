//! Excerpt store and semantic retrieval
//!
//! The leaf of the synthesis core:
//! - Immutable [`ExcerptStore`] of citable source records with precomputed
//!   embeddings (ingestion supplies vectors; nothing re-embeds mid-run)
//! - [`SemanticRetriever`] ranking candidates by cosine similarity with
//!   deterministic tie-breaks

pub mod error;
pub mod excerpt;
pub mod retriever;
pub mod store;

pub use error::CorpusError;
pub use excerpt::{Excerpt, ExcerptId, Signature};
pub use retriever::{RankedExcerpt, SemanticRetriever};
pub use store::ExcerptStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
