//! Lexical search infrastructure for vendor documentation.
//!
//! This module provides BM25 ranking over pre-built vendor indexes, including
//! tokenization, index loading with derived term statistics, and scoring.

// Module declarations
pub(crate) mod index;
pub(crate) mod scoring;
pub(crate) mod tokenize;

// Public re-exports (used via lib.rs)
pub use index::{CorpusIndex, INDEX_SCHEMA_VERSION};
pub use scoring::{B, K1, Ranking, ScoredDocument, idf, rank, term_score};
pub use tokenize::tokenize;
