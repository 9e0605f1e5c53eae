// ============================================================
// span-reader — extractive question answering
// ============================================================
// Given a batch of (query, documents) pairs the reader splits
// every document into overlapping token windows, scores each
// window with a start/end span model and rebuilds one ranked
// answer list per query.
//
// Layers, outermost first:
//
//   application  — ExtractiveReader, ReaderConfig
//   domain       — Document, ExtractedAnswer, collaborator traits
//   data         — window splitting, batching, document loading
//   ml           — burn span model and the scoring adapter
//   span         — normalisation, span extraction, aggregation
//   infra        — tokenizer and checkpoint persistence
//
// The CLI (Layer 1) lives in the binary next to main.rs.

#![recursion_limit = "256"]

pub mod application;
pub mod data;
pub mod domain;
pub mod error;
pub mod infra;
pub mod ml;
pub mod span;

#[cfg(test)]
pub(crate) mod testing;

pub use application::{
    config::{ReaderConfig, RunOptions},
    reader::ExtractiveReader,
};
pub use domain::{answer::ExtractedAnswer, document::Document};
pub use error::{ReaderError, Result};
pub use span::normalizer::ScoringPolicy;
