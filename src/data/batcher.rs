// ============================================================
// Layer 4 — Window Batcher
// ============================================================
// Packs windows into rectangular TokenBatches for the scorer.
//
// How packing works here:
//   Input:  N windows, all padded to the same length S
//   Output: one TokenBatch per sub-batch, ids and mask flattened
//           row-major so the scorer can reshape them to [rows, S]
//
//   [w1_t1, w1_t2, ..., w1_tS, w2_t1, ..., wN_tS]
//
// With no `max_batch_size` every window goes into one batch.
// With one, windows are cut into consecutive groups of that size;
// the order of windows is never changed.

use crate::data::window::Window;
use crate::domain::traits::TokenBatch;

#[derive(Debug, Clone, Copy, Default)]
pub struct WindowBatcher {
    max_batch_size: Option<usize>,
}

impl WindowBatcher {
    pub fn new(max_batch_size: Option<usize>) -> Self {
        Self { max_batch_size }
    }

    /// Number of sub-batches `count` windows are scored in.
    pub fn num_batches(&self, count: usize) -> usize {
        match self.max_batch_size {
            Some(size) if size > 0 => count.div_ceil(size),
            _ => usize::from(count > 0),
        }
    }

    /// Consecutive sub-batches covering `windows` in order.
    pub fn batches(&self, windows: &[Window]) -> Vec<TokenBatch> {
        match self.max_batch_size {
            Some(size) if size > 0 => windows.chunks(size).map(pack).collect(),
            _ if windows.is_empty() => Vec::new(),
            _ => vec![pack(windows)],
        }
    }
}

/// Flatten `windows` into a single TokenBatch.
///
/// All windows must share one length, which the splitter guarantees.
pub fn pack(windows: &[Window]) -> TokenBatch {
    let rows    = windows.len();
    let seq_len = windows.first().map(Window::len).unwrap_or(0);
    debug_assert!(windows.iter().all(|w| w.len() == seq_len));

    let input_ids: Vec<u32> = windows
        .iter()
        .flat_map(|w| w.input_ids.iter().copied())
        .collect();

    let attention_mask: Vec<u32> = windows
        .iter()
        .flat_map(|w| w.attention_mask.iter().copied())
        .collect();

    TokenBatch { rows, seq_len, input_ids, attention_mask }
}
