// ============================================================
// Layer 5b — Cross-Window Normalizer
// ============================================================
// Turns raw per-token start/end logits into one probability per
// (start, end) token pair, for every window.
//
// Step 1: masking (both policies)
//   cell (s, e) = start[s] + end[e] is kept only when
//     • s and e are both eligible (document token, not padding;
//       position 0 is always eligible as the no-answer slot), and
//     • e >= s.
//   Everything else is -inf and marked invalid.
//
// Step 2: one of two policies:
//
//   JointSoftmax
//     The (0, 0) no-answer logits of all windows of a query are
//     summed and written into the query's last window only; the
//     other windows lose their no-answer cell. Then one softmax
//     runs over every valid cell of every window of the query, so
//     probabilities are comparable (and sum to 1) across windows
//     and documents of that query.
//
//   CalibratedSigmoid { calibration_factor }
//     Each cell independently gets sigmoid(logit × factor). No
//     cross-window coupling; a query-level no-answer probability
//     is produced later by the aggregator.
//
// Each step builds fresh grids; the inputs are never rewritten.
//
// The grouped softmax subtracts each query's maximum logit before
// exponentiating so large logits cannot overflow.

use serde::{Deserialize, Serialize};

use crate::data::window::{query_ranges, Window};
use crate::domain::traits::WindowScores;

pub const DEFAULT_CALIBRATION_FACTOR: f64 = 0.1;

/// How masked span logits become probabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringPolicy {
    #[default]
    JointSoftmax,
    CalibratedSigmoid { calibration_factor: f64 },
}

impl ScoringPolicy {
    pub fn calibrated_sigmoid() -> Self {
        ScoringPolicy::CalibratedSigmoid { calibration_factor: DEFAULT_CALIBRATION_FACTOR }
    }

    /// Whether the aggregator must synthesize the no-answer candidate
    /// itself (the grids carry no query-level no-answer mass).
    pub fn needs_synthesized_no_answer(&self) -> bool {
        matches!(self, ScoringPolicy::CalibratedSigmoid { .. })
    }
}

/// A square (start × end) grid for one window, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanGrid {
    seq_len: usize,
    values:  Vec<f64>,
    valid:   Vec<bool>,
}

impl SpanGrid {
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn get(&self, start: usize, end: usize) -> f64 {
        self.values[start * self.seq_len + end]
    }

    pub fn is_valid(&self, start: usize, end: usize) -> bool {
        self.valid[start * self.seq_len + end]
    }

    /// Flat row-major values; index `i` is cell (i / seq_len, i % seq_len).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn valid_mask(&self) -> &[bool] {
        &self.valid
    }

    /// Apply `f` to every value, keeping the validity mask.
    fn map(&self, f: impl Fn(f64) -> f64) -> SpanGrid {
        SpanGrid {
            seq_len: self.seq_len,
            values:  self.values.iter().map(|&v| f(v)).collect(),
            valid:   self.valid.clone(),
        }
    }
}

/// Build the masked logit grid for one window.
pub fn masked_logits(window: &Window, scores: &WindowScores) -> SpanGrid {
    let seq_len  = window.len();
    let eligible: Vec<bool> = (0..seq_len).map(|p| window.is_eligible(p)).collect();

    let mut values = vec![f64::NEG_INFINITY; seq_len * seq_len];
    let mut valid  = vec![false; seq_len * seq_len];

    for s in (0..seq_len).filter(|&s| eligible[s]) {
        for e in (s..seq_len).filter(|&e| eligible[e]) {
            let index = s * seq_len + e;
            values[index] = scores.start[s] as f64 + scores.end[e] as f64;
            valid[index]  = true;
        }
    }

    SpanGrid { seq_len, values, valid }
}

/// Probability grids for every window, in window order.
///
/// `windows` and `scores` are parallel; windows of one query must be
/// contiguous, which the splitter guarantees.
pub fn normalize(policy: ScoringPolicy, windows: &[Window], scores: &[WindowScores]) -> Vec<SpanGrid> {
    let logits: Vec<SpanGrid> = windows
        .iter()
        .zip(scores)
        .map(|(w, s)| masked_logits(w, s))
        .collect();

    match policy {
        ScoringPolicy::JointSoftmax => {
            let pooled = pool_no_answer(&logits, windows);
            softmax_per_query(&pooled, windows)
        }
        ScoringPolicy::CalibratedSigmoid { calibration_factor } => logits
            .iter()
            .map(|grid| grid.map(|x| sigmoid(x * calibration_factor)))
            .collect(),
    }
}

/// Sum the (0, 0) logits of each query's windows into its last window.
fn pool_no_answer(grids: &[SpanGrid], windows: &[Window]) -> Vec<SpanGrid> {
    let mut pooled: Vec<SpanGrid> = grids.to_vec();

    for (_, range) in query_ranges(windows) {
        let total: f64 = grids[range.clone()].iter().map(|g| g.get(0, 0)).sum();
        let last = range.end - 1;
        for index in range {
            let grid = &mut pooled[index];
            if index == last {
                grid.values[0] = total;
            } else {
                grid.values[0] = f64::NEG_INFINITY;
                grid.valid[0]  = false;
            }
        }
    }

    pooled
}

/// One softmax over all cells of all windows belonging to a query.
fn softmax_per_query(grids: &[SpanGrid], windows: &[Window]) -> Vec<SpanGrid> {
    let mut out: Vec<SpanGrid> = Vec::with_capacity(grids.len());

    for (query_id, range) in query_ranges(windows) {
        let group = &grids[range];

        let max = group
            .iter()
            .flat_map(|g| g.values.iter().copied())
            .fold(f64::NEG_INFINITY, f64::max);

        if !max.is_finite() {
            // Only reachable with non-finite model output.
            tracing::warn!("Query {query_id} has no finite span logits");
            out.extend(group.iter().map(|g| g.map(|_| 0.0)));
            continue;
        }

        let exps: Vec<SpanGrid> = group.iter().map(|g| g.map(|x| (x - max).exp())).collect();
        let total: f64 = exps.iter().flat_map(|g| g.values.iter()).sum();

        tracing::debug!("Query {query_id}: softmax over {} windows", exps.len());
        out.extend(exps.iter().map(|g| g.map(|x| x / total)));
    }

    out
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
