// ============================================================
// Layer 2 — Extractive Reader
// ============================================================
// Orchestrates one `run`:
//
//   Step 1: Check the model is loaded          (warm_up happened)
//   Step 2: Resolve and validate settings      (config + overrides)
//   Step 3: Validate the input shape           (no work done yet)
//   Step 4: Flatten documents and split        (Layer 4 - data)
//   Step 5: Score windows in sub-batches       (Layer 5 - ml)
//   Step 6: Normalise, extract, aggregate      (Layer 5b - span)
//
// The reader owns its ModelLoader and the loaded model. warm_up
// takes `&mut self` and run takes `&self`, so the borrow checker
// orders every load before every run.

use crate::application::config::{ReaderConfig, ResolvedParams, RunOptions};
use crate::data::splitter::{flatten, WindowSplitter};
use crate::domain::answer::ExtractedAnswer;
use crate::domain::document::Document;
use crate::domain::traits::{ModelLoader, ReaderModel};
use crate::error::{ReaderError, Result};
use crate::ml::adapter::score_windows;
use crate::span::aggregator::aggregate;
use crate::span::extractor::{extract, SpanCandidate};
use crate::span::normalizer::normalize;

pub struct ExtractiveReader {
    config: ReaderConfig,
    loader: Box<dyn ModelLoader>,
    model:  Option<ReaderModel>,
}

impl ExtractiveReader {
    pub fn new(config: ReaderConfig, loader: impl ModelLoader + 'static) -> Self {
        Self { config, loader: Box::new(loader), model: None }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn is_warm(&self) -> bool {
        self.model.is_some()
    }

    /// True when the loaded scorer runs on an accelerated device.
    pub fn is_accelerated(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.scorer.is_accelerated())
    }

    /// Load the tokenizer and model. Calling it again is a no-op.
    pub fn warm_up(&mut self) -> Result<()> {
        if self.model.is_some() {
            return Ok(());
        }

        let model = self
            .loader
            .load(self.config.device)
            .map_err(|e| ReaderError::ModelLoad { message: format!("{e:#}") })?;

        tracing::info!(
            "Reader warmed up (device: {:?}, accelerated: {})",
            self.config.device,
            model.scorer.is_accelerated()
        );
        self.model = Some(model);
        Ok(())
    }

    /// Answer every query against its own document list.
    ///
    /// `documents[i]` holds the documents for `queries[i]`; the result
    /// holds one ranked answer list per query, in the same order.
    pub fn run(
        &self,
        queries:   &[String],
        documents: &[Vec<Document>],
        options:   &RunOptions,
    ) -> Result<Vec<Vec<ExtractedAnswer>>> {
        // ── Step 1 + 2 ───────────────────────────────────────────────────────
        let model  = self.model.as_ref().ok_or(ReaderError::NotWarmedUp)?;
        let params = self.config.resolve(options)?;

        // ── Step 3 ───────────────────────────────────────────────────────────
        validate_inputs(queries, documents)?;

        // ── Step 4 ───────────────────────────────────────────────────────────
        let flat     = flatten(documents);
        let splitter = WindowSplitter::new(params.max_seq_length, params.stride);
        let windows  = splitter.split(model.encoder.as_ref(), queries, &flat)?;

        // ── Step 5 ───────────────────────────────────────────────────────────
        let scores = score_windows(model.scorer.as_ref(), &windows, params.max_batch_size)?;

        // ── Step 6 ───────────────────────────────────────────────────────────
        let grids = normalize(self.config.policy, &windows, &scores);
        let candidates: Vec<Vec<SpanCandidate>> = windows
            .iter()
            .zip(&grids)
            .enumerate()
            .map(|(index, (window, grid))| extract(index, window, grid, params.answers_per_seq))
            .collect();
        let answers = aggregate(queries, &flat, &windows, &candidates, &params.selection);

        log_summary(queries.len(), flat.len(), windows.len(), &params);
        Ok(answers)
    }
}

fn validate_inputs(queries: &[String], documents: &[Vec<Document>]) -> Result<()> {
    let invalid = |message: String| Err(ReaderError::InvalidInput { message });

    if queries.is_empty() {
        return invalid("At least one query is required.".into());
    }
    if queries.len() != documents.len() {
        return invalid(format!(
            "Got {} queries but {} document lists; they must match one to one.",
            queries.len(),
            documents.len()
        ));
    }
    if let Some(query_id) = documents.iter().position(Vec::is_empty) {
        return invalid(format!("Query {query_id} has no documents."));
    }
    Ok(())
}

fn log_summary(queries: usize, documents: usize, windows: usize, params: &ResolvedParams) {
    tracing::info!(
        "Answered {} queries over {} documents ({} windows, top_k={:?}, top_p={:?})",
        queries,
        documents,
        windows,
        params.selection.top_k,
        params.selection.top_p
    );
}
