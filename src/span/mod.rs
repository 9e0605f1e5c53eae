// ============================================================
// Layer 5b — Span Post-processing
// ============================================================
// Everything between raw model logits and the final answers.
// Plain Rust over f64, no tensor library:
//
//   WindowScores ──► normalizer ──► SpanGrid (per window)
//                                      │
//                                      ▼
//                     extractor ──► SpanCandidate × answers_per_seq
//                                      │
//                                      ▼
//                    aggregator ──► Vec<ExtractedAnswer> per query

/// Masking and the two probability policies
pub mod normalizer;

/// Top cells per window, mapped to byte offsets
pub mod extractor;

/// Per-query ranking with top_k / top_p / no-answer
pub mod aggregator;
