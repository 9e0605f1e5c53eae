// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums, and traits that describe what the
// reader works with. No burn types, no file I/O, no tokenizer
// internals.
//
//   document.rs — the read-only text a query is asked against
//   answer.rs   — the ranked, externally visible answer unit
//   traits.rs   — the collaborators the reader consumes:
//                 a text encoder, a span scorer, a model loader
//                 and a document source
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// A document the reader extracts answers from
pub mod document;

/// An extracted (or "no answer") result for one query
pub mod answer;

/// Abstractions over tokenization, scoring, and loading
pub mod traits;
