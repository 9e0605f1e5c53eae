// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between raw text and the token batches the model
// scores:
//
//   Vec<Vec<Document>>  (one list per query)
//       │
//       ▼
//   flatten             → one list, each entry tagged with its query
//       │
//       ▼
//   WindowSplitter      → [CLS] query [SEP] chunk [SEP] windows
//       │
//       ▼
//   WindowBatcher       → row-major TokenBatch sub-batches
//
// DocumentLoader sits beside the pipeline and feeds it from disk.
//
// Reference: Rust Book §13 (Iterators and Closures)

/// Reads .txt / .md / .docx files into Documents
pub mod loader;

/// Window type, token roles and query boundaries
pub mod window;

/// Cuts documents into overlapping windows
pub mod splitter;

/// Packs windows into fixed-size TokenBatches
pub mod batcher;
