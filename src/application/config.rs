// ============================================================
// Layer 2 — Reader Configuration
// ============================================================
// Two levels of settings:
//
//   ReaderConfig  — fixed when the reader is built (or read from
//                   a JSON file); every field has a default
//   RunOptions    — optional per-call overrides for one `run`
//
// `resolve` merges them (call override, then config, then the
// built-in defaults) and validates the result before any
// tokenization or scoring happens.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::traits::ComputeDevice;
use crate::error::{ReaderError, Result};
use crate::span::aggregator::SelectionParams;
use crate::span::normalizer::ScoringPolicy;

/// Used when neither `top_k` nor `top_p` is configured.
pub const DEFAULT_TOP_K: usize = 10;

/// Last fallback for `answers_per_seq` (after `top_k`).
pub const DEFAULT_ANSWERS_PER_SEQ: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub top_k:           Option<usize>,
    pub top_p:           Option<f64>,
    pub max_seq_length:  usize,
    pub stride:          usize,
    /// None scores every window in a single batch
    pub max_batch_size:  Option<usize>,
    pub answers_per_seq: Option<usize>,
    /// Add a query-level no-answer (calibrated sigmoid only)
    pub no_answer:       bool,
    pub policy:          ScoringPolicy,
    pub device:          ComputeDevice,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            top_k:           None,
            top_p:           None,
            max_seq_length:  384,
            stride:          128,
            max_batch_size:  None,
            answers_per_seq: None,
            no_answer:       false,
            policy:          ScoringPolicy::default(),
            device:          ComputeDevice::default(),
        }
    }
}

/// Per-call overrides; `None` keeps the configured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub top_k:           Option<usize>,
    pub top_p:           Option<f64>,
    pub max_seq_length:  Option<usize>,
    pub stride:          Option<usize>,
    pub max_batch_size:  Option<usize>,
    pub answers_per_seq: Option<usize>,
}

/// Fully merged and validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    pub max_seq_length:  usize,
    pub stride:          usize,
    pub max_batch_size:  Option<usize>,
    pub answers_per_seq: usize,
    pub selection:       SelectionParams,
}

impl ReaderConfig {
    /// Read a config from JSON; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config JSON in '{}'", path.display()))
    }

    pub fn resolve(&self, options: &RunOptions) -> Result<ResolvedParams> {
        let mut top_k = options.top_k.or(self.top_k);
        let top_p     = options.top_p.or(self.top_p);
        if top_k.is_none() && top_p.is_none() {
            top_k = Some(DEFAULT_TOP_K);
        }

        let answers_per_seq = options
            .answers_per_seq
            .or(self.answers_per_seq)
            .or(top_k)
            .unwrap_or(DEFAULT_ANSWERS_PER_SEQ);

        let resolved = ResolvedParams {
            max_seq_length: options.max_seq_length.unwrap_or(self.max_seq_length),
            stride:         options.stride.unwrap_or(self.stride),
            max_batch_size: options.max_batch_size.or(self.max_batch_size),
            answers_per_seq,
            selection: SelectionParams {
                top_k,
                top_p,
                synthesize_no_answer: self.no_answer && self.policy.needs_synthesized_no_answer(),
            },
        };

        self.validate(&resolved)?;
        Ok(resolved)
    }

    fn validate(&self, resolved: &ResolvedParams) -> Result<()> {
        let invalid = |message: String| Err(ReaderError::InvalidConfig { message });

        if resolved.selection.top_k == Some(0) {
            return invalid("top_k must be at least 1".into());
        }
        if let Some(top_p) = resolved.selection.top_p {
            if !(top_p > 0.0 && top_p <= 1.0) {
                return invalid(format!("top_p must lie in (0, 1], got {top_p}"));
            }
        }
        if resolved.answers_per_seq == 0 {
            return invalid("answers_per_seq must be at least 1".into());
        }
        if resolved.max_batch_size == Some(0) {
            return invalid("max_batch_size must be at least 1".into());
        }
        if let ScoringPolicy::CalibratedSigmoid { calibration_factor } = self.policy {
            if !(calibration_factor.is_finite() && calibration_factor > 0.0) {
                return invalid(format!(
                    "calibration_factor must be a positive number, got {calibration_factor}"
                ));
            }
        }
        Ok(())
    }
}
