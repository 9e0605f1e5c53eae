// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn framework code lives here; no other layer imports
// burn directly.
//
//   model.rs   — transformer encoder with a start/end span head
//   scorer.rs  — SpanScorer implementation over SpanModel
//   adapter.rs — sub-batched scoring with order-preserving
//                reassembly (backend independent)
//
// Reference: Burn Book §3 (Building Blocks)

/// Transformer encoder span model
pub mod model;

/// Burn-backed SpanScorer
pub mod scorer;

/// Scoring Adapter: sequential sub-batches, reassembled in order
pub mod adapter;
