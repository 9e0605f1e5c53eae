// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The reader never talks to a tokenizer library or a tensor
// framework directly. It consumes these traits instead:
//
//   TextEncoder    → tokenizers::Tokenizer   (infra)
//   SpanScorer     → burn span model         (ml)
//   ModelLoader    → checkpoint directory    (infra)
//   DocumentSource → directory of files      (data)
//
// Tests plug in small deterministic implementations of the
// first two so the numeric pipeline runs without a model.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use serde::{Deserialize, Serialize};

use crate::domain::document::Document;
use crate::error::Result;

// ─── TextEncoder ──────────────────────────────────────────────────────────────
/// Token ids for one text plus the byte range each token covers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedText {
    pub ids:     Vec<u32>,
    pub offsets: Vec<(usize, usize)>,
}

impl EncodedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Ids used to frame a window as `[CLS] query [SEP] document [SEP]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub cls: u32,
    pub sep: u32,
    pub pad: u32,
}

/// Turns raw text into token ids without adding special tokens.
pub trait TextEncoder {
    fn encode(&self, text: &str) -> Result<EncodedText>;

    fn special_tokens(&self) -> SpecialTokens;
}

// ─── SpanScorer ───────────────────────────────────────────────────────────────
/// A rectangular block of windows, flattened row-major.
/// Row `i` occupies `[i * seq_len .. (i + 1) * seq_len]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBatch {
    pub rows:           usize,
    pub seq_len:        usize,
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

/// Raw start/end scores for every token position of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowScores {
    pub start: Vec<f32>,
    pub end:   Vec<f32>,
}

/// The external span-scoring model. Scores are raw logits and are
/// never interpreted here.
pub trait SpanScorer {
    /// Score every row of `batch`, returning one entry per row in order.
    fn score(&self, batch: &TokenBatch) -> Result<Vec<WindowScores>>;

    /// True when scoring runs on an accelerated device.
    fn is_accelerated(&self) -> bool;
}

// ─── ModelLoader ──────────────────────────────────────────────────────────────
/// Where the span model should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputeDevice {
    /// Accelerated when available, CPU otherwise
    #[default]
    Auto,
    Gpu,
    Cpu,
}

/// Everything `warm_up` produces: the encoder and the scorer are
/// loaded together so they always share a vocabulary.
pub struct ReaderModel {
    pub encoder: Box<dyn TextEncoder>,
    pub scorer:  Box<dyn SpanScorer>,
}

pub trait ModelLoader {
    fn load(&self, device: ComputeDevice) -> anyhow::Result<ReaderModel>;
}

// ─── DocumentSource ───────────────────────────────────────────────────────────
/// Any component that can produce documents to read from.
///
/// Implementations:
///   - DocumentLoader → a directory of .txt / .md / .docx files
pub trait DocumentSource {
    fn load_all(&self) -> anyhow::Result<Vec<Document>>;
}
