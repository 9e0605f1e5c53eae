// ============================================================
// Layer 4 — Window Splitter
// ============================================================
// Turns (query, document) pairs into overlapping token windows.
//
// Splitting:
//   The span model has a fixed maximum input length. A document
//   that does not fit next to its query is cut into chunks, and
//   adjacent chunks share `stride` tokens so an answer sitting on
//   a chunk boundary still appears whole in at least one window.
//
// Example with capacity=5, stride=2 (step = 3):
//   Document tokens: a b c d e f g h i
//   Window 1:        a b c d e
//   Window 2:              d e f g h
//   Window 3:                    g h i     (last chunk kept short)
//
// Capacity is what is left of `max_seq_length` after the query
// and the three framing tokens: [CLS] query [SEP] chunk [SEP].
//
// Windows come out in input order: query by query, and within a
// query document by document. Every later step relies on that
// order to find query boundaries.
//
// Reference: Devlin et al. (2019) BERT paper - sliding window approach

use std::ops::Range;

use crate::data::window::{SequenceRole, Window, WindowOrigin};
use crate::domain::document::Document;
use crate::domain::traits::{EncodedText, TextEncoder};
use crate::error::{ReaderError, Result};

/// `[CLS]`, `[SEP]` after the query, `[SEP]` after the chunk.
pub const FRAMING_TOKENS: usize = 3;

/// One document after flattening, tagged with the query it answers.
#[derive(Debug, Clone, Copy)]
pub struct FlatDocument<'a> {
    pub query_id: usize,
    pub document: &'a Document,
}

/// Flatten per-query document lists into one list, keeping order.
/// The index of an entry is its `document_id`.
pub fn flatten(documents: &[Vec<Document>]) -> Vec<FlatDocument<'_>> {
    documents
        .iter()
        .enumerate()
        .flat_map(|(query_id, docs)| {
            docs.iter().map(move |document| FlatDocument { query_id, document })
        })
        .collect()
}

/// Token ranges of the chunks a document of `len` tokens is cut into.
///
/// Consecutive ranges start `capacity - stride` apart, so neighbours
/// overlap by exactly `stride` tokens. The final range may be short.
/// A document that fits (including an empty one) gives one range.
///
/// Callers must ensure `stride < capacity` whenever `len > capacity`.
pub fn chunk_ranges(len: usize, capacity: usize, stride: usize) -> Vec<Range<usize>> {
    if len <= capacity {
        return vec![0..len];
    }
    debug_assert!(stride < capacity, "stride must be smaller than capacity");

    let step       = capacity - stride;
    let mut ranges = Vec::new();
    let mut start  = 0usize;

    loop {
        let end = (start + capacity).min(len);
        ranges.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }

    ranges
}

#[derive(Debug, Clone, Copy)]
pub struct WindowSplitter {
    max_seq_length: usize,
    stride:         usize,
}

impl WindowSplitter {
    pub fn new(max_seq_length: usize, stride: usize) -> Self {
        Self { max_seq_length, stride }
    }

    /// Document tokens that fit in one window next to a query of
    /// `query_len` tokens.
    pub fn capacity(&self, query_len: usize) -> Result<usize> {
        let capacity = self
            .max_seq_length
            .saturating_sub(query_len + FRAMING_TOKENS);
        if capacity == 0 {
            return Err(ReaderError::InvalidInput {
                message: format!(
                    "A query of {query_len} tokens leaves no room for document tokens \
                     within max_seq_length={}.",
                    self.max_seq_length
                ),
            });
        }
        Ok(capacity)
    }

    /// Split every flattened document into windows, padded to a common
    /// length. The output order is the order of `flat`.
    pub fn split(
        &self,
        encoder:   &dyn TextEncoder,
        queries:   &[String],
        flat:      &[FlatDocument<'_>],
    ) -> Result<Vec<Window>> {
        // Every query is encoded once, however many documents it has.
        let encoded_queries: Vec<EncodedText> = queries
            .iter()
            .map(|q| encoder.encode(q))
            .collect::<Result<_>>()?;

        let mut windows = Vec::new();

        for (document_id, flat_doc) in flat.iter().enumerate() {
            let query = encoded_queries.get(flat_doc.query_id).ok_or_else(|| {
                ReaderError::InvalidInput {
                    message: format!(
                        "Document {document_id} refers to query {} but only {} queries were given.",
                        flat_doc.query_id,
                        queries.len()
                    ),
                }
            })?;
            let document = encoder.encode(&flat_doc.document.content)?;
            let capacity = self.capacity(query.len())?;

            if document.len() > capacity && self.stride >= capacity {
                return Err(ReaderError::InvalidConfig {
                    message: format!(
                        "stride ({}) must be smaller than the {capacity} document tokens \
                         that fit in a window.",
                        self.stride
                    ),
                });
            }

            let origin = WindowOrigin { query_id: flat_doc.query_id, document_id };
            for range in chunk_ranges(document.len(), capacity, self.stride) {
                windows.push(self.frame(encoder, origin, query, &document, range));
            }
        }

        let seq_len = windows.iter().map(Window::len).max().unwrap_or(0);
        let pad_id  = encoder.special_tokens().pad;
        for window in &mut windows {
            window.pad_to(seq_len, pad_id);
        }

        tracing::debug!(
            "Split {} documents into {} windows of {} tokens",
            flat.len(),
            windows.len(),
            seq_len
        );

        Ok(windows)
    }

    /// Build `[CLS] query [SEP] document[range] [SEP]`.
    fn frame(
        &self,
        encoder:  &dyn TextEncoder,
        origin:   WindowOrigin,
        query:    &EncodedText,
        document: &EncodedText,
        range:    Range<usize>,
    ) -> Window {
        let special = encoder.special_tokens();
        let len     = query.len() + range.len() + FRAMING_TOKENS;

        let mut input_ids = Vec::with_capacity(len);
        let mut roles     = Vec::with_capacity(len);
        let mut offsets   = Vec::with_capacity(len);

        input_ids.push(special.cls);
        roles.push(SequenceRole::Special);
        offsets.push(None);

        input_ids.extend_from_slice(&query.ids);
        roles.extend(std::iter::repeat(SequenceRole::Query).take(query.len()));
        offsets.extend(std::iter::repeat(None).take(query.len()));

        input_ids.push(special.sep);
        roles.push(SequenceRole::Special);
        offsets.push(None);

        input_ids.extend_from_slice(&document.ids[range.clone()]);
        roles.extend(std::iter::repeat(SequenceRole::Document).take(range.len()));
        offsets.extend(document.offsets[range].iter().copied().map(Some));

        input_ids.push(special.sep);
        roles.push(SequenceRole::Special);
        offsets.push(None);

        Window {
            origin,
            attention_mask: vec![1; input_ids.len()],
            input_ids,
            roles,
            offsets,
        }
    }
}
