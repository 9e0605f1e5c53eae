// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the span model using Burn's CompactRecorder,
// and loads a complete ReaderModel for warm-up.
//
// Checkpoint directory layout:
//   checkpoints/
//     span_model.mpk      ← model weights (CompactRecorder)
//     model_config.json   ← SpanModelConfig, to rebuild the model
//     tokenizer.json      ← vocabulary (see tokenizer_store.rs)
//
// The config is stored separately because the architecture
// (d_model, num_layers, ...) must be known before the weights can
// be loaded into it.
//
// Device choice at load time:
//   Cpu  → NdArray
//   Gpu  → Wgpu (a load error when built without the `wgpu` feature)
//   Auto → Wgpu when compiled in, NdArray otherwise
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{fs, path::PathBuf};

use crate::domain::traits::{ComputeDevice, ModelLoader, ReaderModel, SpanScorer};
use crate::infra::tokenizer_store::HfTextEncoder;
use crate::ml::model::{SpanModel, SpanModelConfig};
use crate::ml::scorer::BurnScorer;

pub const MODEL_CONFIG_FILE: &str = "model_config.json";

/// File stem of the weights; the recorder adds the extension.
const WEIGHTS_STEM: &str = "span_model";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn save_model<B: Backend>(&self, model: &SpanModel<B>) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(WEIGHTS_STEM);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save weights to '{}'", path.display()))?;

        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have the saved
    /// architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  SpanModel<B>,
        device: &B::Device,
    ) -> Result<SpanModel<B>> {
        let path = self.dir.join(WEIGHTS_STEM);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load weights '{}'. Have you run 'init' first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, config: &SpanModelConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.dir.join(MODEL_CONFIG_FILE);

        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved model config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<SpanModelConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read model config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config in '{}'", path.display()))
    }

    /// Write a randomly initialised model and its config, so a
    /// directory can be served before any weights exist.
    pub fn write_untrained(&self, config: &SpanModelConfig) -> Result<()> {
        let device = NdArrayDevice::default();
        let model: SpanModel<NdArray> = config.init(&device);
        self.save_config(config)?;
        self.save_model(&model)?;
        tracing::info!(
            "Wrote untrained checkpoint to '{}' (vocab={}, layers={})",
            self.dir.display(),
            config.vocab_size,
            config.num_layers
        );
        Ok(())
    }
}

// ─── ModelLoader ──────────────────────────────────────────────────────────────

/// Loads tokenizer, config and weights from one checkpoint directory.
pub struct CheckpointLoader {
    dir: PathBuf,
}

impl CheckpointLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn load_cpu(&self, config: &SpanModelConfig) -> Result<Box<dyn SpanScorer>> {
        let device = NdArrayDevice::default();
        let model  = CheckpointManager::new(&self.dir).load_model(config.init::<NdArray>(&device), &device)?;
        Ok(Box::new(BurnScorer::new(model, device, false)))
    }

    #[cfg(feature = "wgpu")]
    fn load_accelerated(&self, config: &SpanModelConfig) -> Result<Box<dyn SpanScorer>> {
        use burn::backend::{wgpu::WgpuDevice, Wgpu};

        let device = WgpuDevice::default();
        let model  = CheckpointManager::new(&self.dir).load_model(config.init::<Wgpu>(&device), &device)?;
        Ok(Box::new(BurnScorer::new(model, device, true)))
    }

    #[cfg(not(feature = "wgpu"))]
    fn load_accelerated(&self, _config: &SpanModelConfig) -> Result<Box<dyn SpanScorer>> {
        anyhow::bail!("an accelerated device was requested but this build has no `wgpu` feature")
    }
}

impl ModelLoader for CheckpointLoader {
    fn load(&self, device: ComputeDevice) -> Result<ReaderModel> {
        let encoder = HfTextEncoder::from_dir(&self.dir)?;
        let config  = CheckpointManager::new(&self.dir).load_config()?;

        let scorer = match device {
            ComputeDevice::Cpu  => self.load_cpu(&config)?,
            ComputeDevice::Gpu  => self.load_accelerated(&config)?,
            ComputeDevice::Auto if cfg!(feature = "wgpu") => self.load_accelerated(&config)?,
            ComputeDevice::Auto => self.load_cpu(&config)?,
        };

        Ok(ReaderModel { encoder: Box::new(encoder), scorer })
    }
}
