// ============================================================
// Layer 5b — Span Extractor
// ============================================================
// Picks the `answers_per_seq` most probable (start, end) cells of
// each window and maps them back to byte offsets in the document.
//
// Selection rule:
//   valid cells are ranked by probability, highest first; equal
//   probabilities keep row-major scan order (lower start first,
//   then lower end), so the earliest cell wins a tie.
//
// Mapping rule:
//   a cell touching position 0, (0, e) or (s, 0), is the
//   no-answer slot and maps to (None, None); any other cell maps to
//   (offset[start].begin, offset[end].finish).
//
// Exactly `answers_per_seq` candidates come back per window. When
// a window has fewer valid cells than that, the list is topped up
// with zero-probability no-answer entries.

use crate::data::window::Window;
use crate::span::normalizer::SpanGrid;

#[derive(Debug, Clone, PartialEq)]
pub struct SpanCandidate {
    /// Index of the window this candidate was taken from
    pub window:      usize,
    pub start_token: usize,
    pub end_token:   usize,
    /// Byte offsets into the document, None for no-answer
    pub start:       Option<usize>,
    pub end:         Option<usize>,
    pub probability: f64,
}

impl SpanCandidate {
    pub fn is_no_answer(&self) -> bool {
        self.start.is_none()
    }
}

/// Cell indices of the `k` best valid cells, ties in scan order.
pub fn top_cells(grid: &SpanGrid, k: usize) -> Vec<usize> {
    let values = grid.values();
    let mut cells: Vec<usize> = grid
        .valid_mask()
        .iter()
        .enumerate()
        .filter(|(_, ok)| **ok)
        .map(|(i, _)| i)
        .collect();

    // Stable sort: equal probabilities keep ascending cell order.
    cells.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    cells.truncate(k);
    cells
}

/// The `answers_per_seq` best candidates of one window.
pub fn extract(
    window_index:    usize,
    window:          &Window,
    grid:            &SpanGrid,
    answers_per_seq: usize,
) -> Vec<SpanCandidate> {
    let seq_len = grid.seq_len();

    let mut candidates: Vec<SpanCandidate> = top_cells(grid, answers_per_seq)
        .into_iter()
        .map(|cell| {
            let (start_token, end_token) = (cell / seq_len, cell % seq_len);
            let (start, end) = char_span(window, start_token, end_token);
            SpanCandidate {
                window: window_index,
                start_token,
                end_token,
                start,
                end,
                probability: grid.values()[cell],
            }
        })
        .collect();

    while candidates.len() < answers_per_seq {
        candidates.push(SpanCandidate {
            window:      window_index,
            start_token: 0,
            end_token:   0,
            start:       None,
            end:         None,
            probability: 0.0,
        });
    }

    candidates
}

fn char_span(window: &Window, start_token: usize, end_token: usize) -> (Option<usize>, Option<usize>) {
    if start_token == 0 || end_token == 0 {
        return (None, None);
    }
    let begin  = window.offsets.get(start_token).copied().flatten();
    let finish = window.offsets.get(end_token).copied().flatten();
    match (begin, finish) {
        (Some((s, _)), Some((_, e))) => (Some(s), Some(e)),
        _ => (None, None),
    }
}
