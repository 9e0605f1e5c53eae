// ============================================================
// Layer 4 — Window Types
// ============================================================
// A Window is the unit the span model actually scores:
//
//   [CLS] query tokens [SEP] document chunk [SEP] [PAD] ...
//
// Each window remembers which (query, document) pair it came
// from, which role every token plays, and the byte range each
// document token covers in the original document text.

/// What a token position holds inside a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceRole {
    /// `[CLS]` / `[SEP]`
    Special,
    Query,
    Document,
    Padding,
}

/// Back-reference from a window to its flattened input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowOrigin {
    /// Position of the query in the input batch
    pub query_id:    usize,
    /// Position of the document after flattening all document lists
    pub document_id: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub origin:         WindowOrigin,
    pub input_ids:      Vec<u32>,
    /// 1 = real token, 0 = padding
    pub attention_mask: Vec<u32>,
    pub roles:          Vec<SequenceRole>,
    /// Byte range in the document for document tokens, None elsewhere
    pub offsets:        Vec<Option<(usize, usize)>>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Whether `position` may serve as a span start or end.
    ///
    /// Position 0 is the dedicated no-answer slot and is always
    /// eligible; every other position must be an unpadded
    /// document token.
    pub fn is_eligible(&self, position: usize) -> bool {
        if position == 0 {
            return true;
        }
        matches!(self.roles.get(position), Some(SequenceRole::Document))
            && self.attention_mask.get(position) == Some(&1)
    }

    /// Number of document tokens carried by this window.
    pub fn document_tokens(&self) -> usize {
        self.roles
            .iter()
            .filter(|r| **r == SequenceRole::Document)
            .count()
    }

    /// Extend the window to `seq_len` with padding positions.
    pub fn pad_to(&mut self, seq_len: usize, pad_id: u32) {
        while self.input_ids.len() < seq_len {
            self.input_ids.push(pad_id);
            self.attention_mask.push(0);
            self.roles.push(SequenceRole::Padding);
            self.offsets.push(None);
        }
    }
}

/// Contiguous window ranges, one per query, in ascending query order.
///
/// Windows of one query are adjacent after splitting, so a query's
/// windows form a single run; this returns the run boundaries.
pub fn query_ranges(windows: &[Window]) -> Vec<(usize, std::ops::Range<usize>)> {
    let mut ranges: Vec<(usize, std::ops::Range<usize>)> = Vec::new();
    for (index, window) in windows.iter().enumerate() {
        match ranges.last_mut() {
            Some((query_id, range)) if *query_id == window.origin.query_id => {
                range.end = index + 1;
            }
            _ => ranges.push((window.origin.query_id, index..index + 1)),
        }
    }
    ranges
}
