// ============================================================
// Layer 5 — Scoring Adapter
// ============================================================
// Runs windows through a SpanScorer, optionally in sub-batches.
//
// With `max_batch_size = None` all windows are scored in one call.
// With `Some(n)` they are scored n at a time, one sub-batch after
// another, and the rows are stitched back together in the original
// window order. Sub-batches run sequentially to keep peak memory
// bounded on small devices.
//
// Any sub-batch failure aborts the whole call: a partial score
// array is never returned.

use crate::data::batcher::WindowBatcher;
use crate::data::window::Window;
use crate::domain::traits::{SpanScorer, WindowScores};
use crate::error::{ReaderError, Result};

pub fn score_windows(
    scorer:         &dyn SpanScorer,
    windows:        &[Window],
    max_batch_size: Option<usize>,
) -> Result<Vec<WindowScores>> {
    let batcher = WindowBatcher::new(max_batch_size);
    let batches = batcher.batches(windows);
    let total   = batches.len();

    let mut scores = Vec::with_capacity(windows.len());
    for (index, batch) in batches.iter().enumerate() {
        let rows = scorer.score(batch)?;

        if rows.len() != batch.rows {
            return Err(ReaderError::Scoring {
                message: format!(
                    "sub-batch {index} returned {} rows for {} windows",
                    rows.len(),
                    batch.rows
                ),
            });
        }
        if let Some(bad) = rows
            .iter()
            .find(|r| r.start.len() != batch.seq_len || r.end.len() != batch.seq_len)
        {
            return Err(ReaderError::Scoring {
                message: format!(
                    "sub-batch {index} returned {}/{} scores for windows of {} tokens",
                    bad.start.len(),
                    bad.end.len(),
                    batch.seq_len
                ),
            });
        }

        tracing::debug!("Scored sub-batch {}/{} ({} windows)", index + 1, total, batch.rows);
        scores.extend(rows);
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::splitter::{flatten, WindowSplitter};
    use crate::domain::document::Document;
    use crate::domain::traits::TokenBatch;
    use crate::testing::{KeywordScorer, WhitespaceEncoder};

    fn windows() -> Vec<Window> {
        let docs = vec![vec![
            Document::new("a", "one two three four five six seven eight"),
            Document::new("b", "nine ten"),
        ]];
        WindowSplitter::new(8, 1)
            .split(&WhitespaceEncoder, &["q".to_string()], &flatten(&docs))
            .unwrap()
    }

    #[test]
    fn test_sub_batches_are_reassembled_in_order() {
        let windows = windows();
        let scorer  = KeywordScorer::new().with_start("nine", 5.0);

        let whole = score_windows(&scorer, &windows, None).unwrap();
        assert_eq!(scorer.calls(), 1);
        let split = score_windows(&scorer, &windows, Some(2)).unwrap();
        assert_eq!(scorer.calls(), 1 + windows.len().div_ceil(2));

        assert_eq!(whole, split);
        // "nine" is the first document token of the last window
        assert_eq!(split.last().unwrap().start[3], 5.0);
    }

    struct ShortScorer;

    impl SpanScorer for ShortScorer {
        fn score(&self, batch: &TokenBatch) -> Result<Vec<WindowScores>> {
            Ok(vec![WindowScores { start: vec![0.0; batch.seq_len], end: vec![0.0; batch.seq_len] }])
        }

        fn is_accelerated(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_row_count_mismatch_aborts() {
        let err = score_windows(&ShortScorer, &windows(), None).unwrap_err();
        assert!(matches!(err, ReaderError::Scoring { .. }));
    }

    #[test]
    fn test_scorer_failure_propagates() {
        let scorer = KeywordScorer::new().failing_after(1);
        let err    = score_windows(&scorer, &windows(), Some(1)).unwrap_err();
        assert!(matches!(err, ReaderError::Scoring { .. }));
    }
}
