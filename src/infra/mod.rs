// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything the reader needs from disk:
//
//   tokenizer_store.rs — Tokenizer persistence
//                        Builds a word-level tokenizer from a
//                        corpus or loads a saved one, and wraps
//                        it as the reader's TextEncoder.
//
//   checkpoint.rs      — Model persistence
//                        Burn CompactRecorder weights plus the
//                        architecture as model_config.json, and
//                        the ModelLoader used by warm-up.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, loading and encoding
pub mod tokenizer_store;
