// ============================================================
// Layer 5 — Burn Span Scorer
// ============================================================
// Implements the SpanScorer trait on top of SpanModel for any
// burn backend. The reader picks the backend at warm-up time:
// Wgpu when an accelerated device is wanted and compiled in,
// NdArray on the CPU otherwise.
//
// Scores leave the device as plain Vec<f32> rows, so nothing
// downstream of this file ever sees a tensor.

use burn::prelude::*;

use crate::domain::traits::{SpanScorer, TokenBatch, WindowScores};
use crate::error::{ReaderError, Result};
use crate::ml::model::SpanModel;

pub struct BurnScorer<B: Backend> {
    model:       SpanModel<B>,
    device:      B::Device,
    accelerated: bool,
}

impl<B: Backend> BurnScorer<B> {
    pub fn new(model: SpanModel<B>, device: B::Device, accelerated: bool) -> Self {
        tracing::info!(
            "Span scorer ready on {:?} (accelerated={})",
            device,
            accelerated
        );
        Self { model, device, accelerated }
    }

    fn check_batch(&self, batch: &TokenBatch) -> Result<()> {
        if batch.seq_len > self.model.max_seq_len {
            return Err(ReaderError::Scoring {
                message: format!(
                    "windows of {} tokens exceed the model's positional capacity of {}",
                    batch.seq_len, self.model.max_seq_len
                ),
            });
        }
        if let Some(id) = batch
            .input_ids
            .iter()
            .find(|&&id| id as usize >= self.model.vocab_size)
        {
            return Err(ReaderError::Scoring {
                message: format!(
                    "token id {id} is outside the model vocabulary of {}",
                    self.model.vocab_size
                ),
            });
        }
        Ok(())
    }
}

impl<B: Backend> SpanScorer for BurnScorer<B> {
    fn score(&self, batch: &TokenBatch) -> Result<Vec<WindowScores>> {
        if batch.rows == 0 || batch.seq_len == 0 {
            return Ok(Vec::new());
        }
        self.check_batch(batch)?;

        let shape = [batch.rows, batch.seq_len];
        let ids: Vec<i32>  = batch.input_ids.iter().map(|&x| x as i32).collect();
        let mask: Vec<i32> = batch.attention_mask.iter().map(|&x| x as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape(shape);
        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask.as_slice(), &self.device)
            .reshape(shape);

        let logits = self.model.forward(input_ids, attention_mask);

        let start: Vec<f32> = logits.start.into_data().to_vec::<f32>()
            .map_err(|e| ReaderError::Scoring { message: format!("start logits: {e:?}") })?;
        let end: Vec<f32> = logits.end.into_data().to_vec::<f32>()
            .map_err(|e| ReaderError::Scoring { message: format!("end logits: {e:?}") })?;

        Ok(start
            .chunks(batch.seq_len)
            .zip(end.chunks(batch.seq_len))
            .map(|(s, e)| WindowScores { start: s.to_vec(), end: e.to_vec() })
            .collect())
    }

    fn is_accelerated(&self) -> bool {
        self.accelerated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::pack;
    use crate::data::splitter::{flatten, WindowSplitter};
    use crate::domain::document::Document;
    use crate::ml::adapter::score_windows;
    use crate::ml::model::SpanModelConfig;
    use crate::testing::WhitespaceEncoder;
    use burn::backend::NdArray;

    fn scorer(max_seq_len: usize) -> BurnScorer<NdArray> {
        let device = Default::default();
        // WhitespaceEncoder ids stay below 40_000
        let model  = SpanModelConfig::new(40_000, max_seq_len, 16, 2, 2, 32).init(&device);
        BurnScorer::new(model, device, false)
    }

    fn windows() -> Vec<crate::data::window::Window> {
        let docs = vec![
            vec![
                Document::new("a", "Paris is the capital of France and its largest city"),
                Document::new("b", "Unrelated text"),
            ],
            vec![Document::new("c", "Berlin is the capital of Germany")],
        ];
        let queries = vec!["What is the capital?".to_string(), "Which city?".to_string()];
        WindowSplitter::new(12, 2)
            .split(&WhitespaceEncoder, &queries, &flatten(&docs))
            .unwrap()
    }

    #[test]
    fn test_scores_every_row() {
        let windows = windows();
        let batch   = pack(&windows);
        let scores  = scorer(32).score(&batch).unwrap();
        assert_eq!(scores.len(), windows.len());
        assert!(scores.iter().all(|s| s.start.len() == batch.seq_len && s.end.len() == batch.seq_len));
        assert!(scores.iter().all(|s| s.start.iter().all(|x| x.is_finite())));
    }

    #[test]
    fn test_sub_batching_does_not_change_scores() {
        let windows = windows();
        let scorer  = scorer(32);
        let whole   = score_windows(&scorer, &windows, None).unwrap();
        let single  = score_windows(&scorer, &windows, Some(1)).unwrap();
        assert_eq!(whole.len(), single.len());
        for (a, b) in whole.iter().zip(&single) {
            for (x, y) in a.start.iter().zip(&b.start).chain(a.end.iter().zip(&b.end)) {
                assert!((x - y).abs() < 1e-4, "{x} vs {y}");
            }
        }
    }

    #[test]
    fn test_rejects_windows_longer_than_model_capacity() {
        let batch = pack(&windows());
        let err   = scorer(4).score(&batch).unwrap_err();
        assert!(matches!(err, ReaderError::Scoring { .. }));
    }
}
