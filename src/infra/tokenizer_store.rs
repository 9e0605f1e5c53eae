// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Persists the tokenizer next to the model weights and adapts it
// to the reader's TextEncoder trait.
//
// Building:
//   A word-level vocabulary is counted from the corpus and written
//   as HuggingFace tokenizer JSON, then parsed back with
//   Tokenizer::from_str. Words are ranked by frequency, ties by
//   the word itself, so the same corpus always gives the same ids.
//
//   Special tokens keep BERT's ids:
//     [PAD]=0  [UNK]=1  [CLS]=101  [SEP]=102  [MASK]=103
//
// Encoding:
//   tokenizers reports byte offsets into the original text (the
//   normalizer's lowercasing is mapped back), which is exactly what
//   the splitter needs for slicing answers out of Document::content.
//
// Reference: HuggingFace tokenizers, WordLevel model

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    str::FromStr,
};
use tokenizers::Tokenizer;

use crate::domain::traits::{EncodedText, SpecialTokens, TextEncoder};
use crate::error::ReaderError;

pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Ids below this are reserved for special tokens.
const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load the saved tokenizer, or build one from `texts` and save it.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from disk");
            self.load()
        } else {
            tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot load tokenizer from '{}': {e}", path.display()))
    }

    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let json = word_level_json(texts, vocab_size);
        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!("Tokenizer saved to '{}'", path.display());
        parse(&json)
    }
}

/// Build a word-level tokenizer in memory.
pub fn build_word_level(texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
    parse(&word_level_json(texts, vocab_size))
}

/// Largest token id the tokenizer can produce, plus one. This is the
/// embedding size a model needs to accept every id.
pub fn id_space(tokenizer: &Tokenizer) -> usize {
    tokenizer
        .get_vocab(true)
        .values()
        .map(|&id| id as usize + 1)
        .max()
        .unwrap_or(0)
}

fn parse(json: &serde_json::Value) -> Result<Tokenizer> {
    Tokenizer::from_str(&json.to_string())
        .map_err(|e| anyhow::anyhow!("Invalid tokenizer JSON: {e}"))
}

fn word_level_json(texts: &[String], vocab_size: usize) -> serde_json::Value {
    // ── Step 1: count words the way the Whitespace pre-tokenizer splits ──────
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            *freq.entry(word.to_lowercase()).or_insert(0) += 1;
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(vocab_size.saturating_sub(5));

    // ── Step 2: vocab with BERT special ids ──────────────────────────────────
    let mut vocab = serde_json::json!({
        "[PAD]":  0,
        "[UNK]":  1,
        "[CLS]":  101,
        "[SEP]":  102,
        "[MASK]": 103,
    });
    for (offset, (word, _)) in words.iter().enumerate() {
        vocab[word.as_str()] = serde_json::json!(FIRST_WORD_ID + offset);
    }

    let added = |id: u32, content: &str| {
        serde_json::json!({
            "id": id, "content": content, "single_word": false, "lstrip": false,
            "rstrip": false, "normalized": false, "special": true
        })
    };

    // ── Step 3: HuggingFace tokenizer JSON ───────────────────────────────────
    serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            added(0, "[PAD]"),
            added(1, "[UNK]"),
            added(101, "[CLS]"),
            added(102, "[SEP]"),
            added(103, "[MASK]"),
        ],
        "normalizer": {
            "type": "BertNormalizer",
            "clean_text": true,
            "handle_chinese_chars": true,
            "strip_accents": null,
            "lowercase": true
        },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab,
            "unk_token": "[UNK]"
        }
    })
}

// ─── TextEncoder over tokenizers ──────────────────────────────────────────────

/// `TextEncoder` backed by a HuggingFace tokenizer.
pub struct HfTextEncoder {
    tokenizer: Tokenizer,
    special:   SpecialTokens,
}

impl HfTextEncoder {
    /// Resolve the framing tokens: BERT names first, RoBERTa names
    /// as a fallback.
    pub fn new(tokenizer: Tokenizer) -> Result<Self> {
        let lookup = |names: [&str; 2]| -> Result<u32> {
            names
                .iter()
                .find_map(|name| tokenizer.token_to_id(name))
                .with_context(|| format!("Tokenizer has none of the tokens {names:?}"))
        };
        let special = SpecialTokens {
            cls: lookup(["[CLS]", "<s>"])?,
            sep: lookup(["[SEP]", "</s>"])?,
            pad: lookup(["[PAD]", "<pad>"])?,
        };
        Ok(Self { tokenizer, special })
    }

    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(TokenizerStore::new(dir.as_ref()).load()?)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}

impl TextEncoder for HfTextEncoder {
    fn encode(&self, text: &str) -> crate::error::Result<EncodedText> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| ReaderError::Tokenization { message: e.to_string() })?;
        Ok(EncodedText {
            ids:     encoding.get_ids().to_vec(),
            offsets: encoding.get_offsets().to_vec(),
        })
    }

    fn special_tokens(&self) -> SpecialTokens {
        self.special
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        vec![
            "Paris is the capital of France.".to_string(),
            "Rome is the capital of Italy.".to_string(),
        ]
    }

    #[test]
    fn test_vocab_is_ranked_by_frequency_then_word() {
        let tokenizer = build_word_level(&corpus(), 100).unwrap();
        // "capital", "is", "of", "the" appear twice; alphabetical among them
        assert_eq!(tokenizer.token_to_id("capital"), Some(104));
        assert_eq!(tokenizer.token_to_id("is"), Some(105));
        assert_eq!(tokenizer.token_to_id("of"), Some(106));
        assert_eq!(tokenizer.token_to_id("the"), Some(107));
        assert_eq!(tokenizer.token_to_id("france"), Some(108));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build_word_level(&corpus(), 100).unwrap();
        let b = build_word_level(&corpus(), 100).unwrap();
        assert_eq!(a.get_vocab(true), b.get_vocab(true));
        assert_eq!(id_space(&a), 104 + 8);
    }

    #[test]
    fn test_vocab_size_caps_the_word_list() {
        let tokenizer = build_word_level(&corpus(), 7).unwrap();
        assert_eq!(tokenizer.get_vocab(true).len(), 7);
        assert_eq!(tokenizer.token_to_id("france"), None);
    }

    #[test]
    fn test_encoder_reports_byte_offsets() {
        let encoder = HfTextEncoder::new(build_word_level(&corpus(), 100).unwrap()).unwrap();
        let text    = "Paris is lovely.";
        let encoded = encoder.encode(text).unwrap();

        let (s, e) = encoded.offsets[0];
        assert_eq!(&text[s..e], "Paris");
        assert_eq!(encoded.ids[0], encoder.tokenizer().token_to_id("paris").unwrap());
        // unknown word falls back to [UNK]
        assert_eq!(encoded.ids[2], 1);
        assert_eq!(
            encoder.special_tokens(),
            SpecialTokens { cls: 101, sep: 102, pad: 0 }
        );
    }

    #[test]
    fn test_load_or_build_round_trips_through_disk() {
        let dir   = tempfile::tempdir().unwrap();
        let store = TokenizerStore::new(dir.path());

        let built = store.load_or_build(&corpus(), 100).unwrap();
        assert!(store.path().exists());

        // a different corpus is ignored once the file exists
        let loaded = store.load_or_build(&["other words".to_string()], 100).unwrap();
        assert_eq!(built.get_vocab(true), loaded.get_vocab(true));
    }
}
