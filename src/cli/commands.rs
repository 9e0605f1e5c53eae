// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `init` and `ask`, and all their
// configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, enums)
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use span_reader::domain::traits::ComputeDevice;
use span_reader::ml::model::SpanModelConfig;
use span_reader::span::normalizer::DEFAULT_CALIBRATION_FACTOR;
use span_reader::{ReaderConfig, ScoringPolicy};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a tokenizer from documents and write an untrained checkpoint
    Init(InitArgs),

    /// Answer one or more questions against a directory of documents
    Ask(AskArgs),
}

/// All arguments for the `init` command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory with .txt / .md / .docx files to build the vocabulary from
    #[arg(long, default_value = "data/docs")]
    pub docs_dir: PathBuf,

    /// Directory to write the tokenizer, config and weights into
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Upper bound on vocabulary entries (including 5 special tokens)
    #[arg(long, default_value_t = 30522)]
    pub vocab_size: usize,

    /// Positional capacity of the model; longer windows are rejected
    #[arg(long, default_value_t = 512)]
    pub max_seq_len: usize,

    /// Hidden dimension of the transformer
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// Attention heads; d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Stacked encoder layers
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,
}

impl InitArgs {
    /// `id_space` comes from the built tokenizer, not from `--vocab-size`.
    pub fn model_config(&self, id_space: usize) -> SpanModelConfig {
        SpanModelConfig::new(
            id_space,
            self.max_seq_len,
            self.d_model,
            self.num_heads,
            self.num_layers,
            self.d_ff,
        )
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyArg {
    /// One softmax per query across all its windows
    JointSoftmax,
    /// Independent sigmoid per span
    CalibratedSigmoid,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceArg {
    Auto,
    Gpu,
    Cpu,
}

impl From<DeviceArg> for ComputeDevice {
    fn from(d: DeviceArg) -> Self {
        match d {
            DeviceArg::Auto => ComputeDevice::Auto,
            DeviceArg::Gpu  => ComputeDevice::Gpu,
            DeviceArg::Cpu  => ComputeDevice::Cpu,
        }
    }
}

/// All arguments for the `ask` command.
/// Unset flags keep the value from `--config` (or the default).
#[derive(Args, Debug)]
pub struct AskArgs {
    /// A question to answer; repeat the flag for several
    #[arg(long = "question", required = true)]
    pub questions: Vec<String>,

    /// Directory with .txt / .md / .docx files to search
    #[arg(long, default_value = "data/docs")]
    pub docs_dir: PathBuf,

    /// Directory written by `init`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// JSON file with a base ReaderConfig
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub top_k: Option<usize>,

    /// Keep answers until their probability mass reaches this value
    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub max_seq_length: Option<usize>,

    /// Tokens shared by neighbouring windows of a long document
    #[arg(long)]
    pub stride: Option<usize>,

    /// Windows per forward pass (default: all at once)
    #[arg(long)]
    pub max_batch_size: Option<usize>,

    #[arg(long)]
    pub answers_per_seq: Option<usize>,

    /// Add a query-level "no answer" (calibrated sigmoid only)
    #[arg(long)]
    pub no_answer: bool,

    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Sigmoid scaling; implies --policy calibrated-sigmoid
    #[arg(long)]
    pub calibration_factor: Option<f64>,

    #[arg(long, value_enum)]
    pub device: Option<DeviceArg>,
}

impl AskArgs {
    /// The base config from `--config`, or the defaults, with every
    /// flag that was given laid on top.
    pub fn reader_config(&self) -> Result<ReaderConfig> {
        let base = match &self.config {
            Some(path) => ReaderConfig::from_json_file(path)?,
            None       => ReaderConfig::default(),
        };
        Ok(self.overlay(base))
    }

    fn overlay(&self, mut config: ReaderConfig) -> ReaderConfig {
        if self.top_k.is_some()           { config.top_k = self.top_k; }
        if self.top_p.is_some()           { config.top_p = self.top_p; }
        if let Some(n) = self.max_seq_length { config.max_seq_length = n; }
        if let Some(n) = self.stride         { config.stride = n; }
        if self.max_batch_size.is_some()  { config.max_batch_size = self.max_batch_size; }
        if self.answers_per_seq.is_some() { config.answers_per_seq = self.answers_per_seq; }
        if self.no_answer                 { config.no_answer = true; }
        if let Some(d) = self.device         { config.device = d.into(); }

        let factor = self.calibration_factor.or(match config.policy {
            ScoringPolicy::CalibratedSigmoid { calibration_factor } => Some(calibration_factor),
            ScoringPolicy::JointSoftmax => None,
        });
        match (self.policy, self.calibration_factor) {
            (Some(PolicyArg::JointSoftmax), _) => config.policy = ScoringPolicy::JointSoftmax,
            (Some(PolicyArg::CalibratedSigmoid), _) | (None, Some(_)) => {
                config.policy = ScoringPolicy::CalibratedSigmoid {
                    calibration_factor: factor.unwrap_or(DEFAULT_CALIBRATION_FACTOR),
                };
            }
            (None, None) => {}
        }
        config
    }
}

/// Flags-only conversion: defaults plus every flag given.
impl From<&AskArgs> for ReaderConfig {
    fn from(a: &AskArgs) -> Self {
        a.overlay(ReaderConfig::default())
    }
}
