// Deterministic stand-ins for the tokenizer and the span model,
// shared by unit tests across layers.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::domain::traits::{
    ComputeDevice, EncodedText, ModelLoader, ReaderModel, SpanScorer, SpecialTokens,
    TextEncoder, TokenBatch, WindowScores,
};
use crate::error::{ReaderError, Result};

pub const SPECIAL: SpecialTokens = SpecialTokens { cls: 101, sep: 102, pad: 0 };

/// Stable id for a lowercased word, always in 1000..40000.
pub fn word_id(word: &str) -> u32 {
    let hash = word
        .to_lowercase()
        .bytes()
        .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    1000 + hash % 39_000
}

/// Splits on whitespace and trims trailing ASCII punctuation from each
/// word, so "France." becomes the token "france" covering "France".
pub struct WhitespaceEncoder;

impl TextEncoder for WhitespaceEncoder {
    fn encode(&self, text: &str) -> Result<EncodedText> {
        let mut spans = Vec::new();
        let mut start = None;
        for (i, c) in text.char_indices() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    spans.push((s, i));
                }
            } else if start.is_none() {
                start = Some(i);
            }
        }
        if let Some(s) = start {
            spans.push((s, text.len()));
        }

        let mut encoded = EncodedText::default();
        for (s, e) in spans {
            let word    = &text[s..e];
            let trimmed = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
            let word    = if trimmed.is_empty() { word } else { trimmed };
            encoded.ids.push(word_id(word));
            encoded.offsets.push((s, s + word.len()));
        }
        Ok(encoded)
    }

    fn special_tokens(&self) -> SpecialTokens {
        SPECIAL
    }
}

/// Scores tokens by lookup: listed words get the given logit, every
/// other position scores 0.
#[derive(Default)]
pub struct KeywordScorer {
    start:        HashMap<u32, f32>,
    end:          HashMap<u32, f32>,
    fail_after:   Option<usize>,
    calls:        Cell<usize>,
}

impl KeywordScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start(mut self, word: &str, logit: f32) -> Self {
        self.start.insert(word_id(word), logit);
        self
    }

    pub fn with_end(mut self, word: &str, logit: f32) -> Self {
        self.end.insert(word_id(word), logit);
        self
    }

    /// Boost `word` as both start and end.
    pub fn with_span(self, word: &str, logit: f32) -> Self {
        self.with_start(word, logit).with_end(word, logit)
    }

    /// Start/end boosts keyed by raw token id instead of word.
    pub fn with_id_span(mut self, id: u32, logit: f32) -> Self {
        self.start.insert(id, logit);
        self.end.insert(id, logit);
        self
    }

    /// Fail every call after the first `n`.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl SpanScorer for KeywordScorer {
    fn score(&self, batch: &TokenBatch) -> Result<Vec<WindowScores>> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if self.fail_after.is_some_and(|n| call > n) {
            return Err(ReaderError::Scoring { message: format!("call {call} refused") });
        }

        Ok(batch
            .input_ids
            .chunks(batch.seq_len.max(1))
            .take(batch.rows)
            .map(|row| WindowScores {
                start: row.iter().map(|id| *self.start.get(id).unwrap_or(&0.0)).collect(),
                end:   row.iter().map(|id| *self.end.get(id).unwrap_or(&0.0)).collect(),
            })
            .collect())
    }

    fn is_accelerated(&self) -> bool {
        false
    }
}

/// Hands out a fresh WhitespaceEncoder + KeywordScorer per load and
/// counts how often it was asked.
pub struct FixtureLoader {
    make:  Box<dyn Fn() -> KeywordScorer>,
    loads: Rc<Cell<usize>>,
    fail:  bool,
}

impl FixtureLoader {
    pub fn new(make: impl Fn() -> KeywordScorer + 'static) -> Self {
        Self { make: Box::new(make), loads: Rc::default(), fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::new(KeywordScorer::new) }
    }

    pub fn load_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.loads)
    }
}

impl ModelLoader for FixtureLoader {
    fn load(&self, _device: ComputeDevice) -> anyhow::Result<ReaderModel> {
        self.loads.set(self.loads.get() + 1);
        if self.fail {
            anyhow::bail!("no checkpoint here");
        }
        Ok(ReaderModel {
            encoder: Box::new(WhitespaceEncoder),
            scorer:  Box::new((self.make)()),
        })
    }
}
