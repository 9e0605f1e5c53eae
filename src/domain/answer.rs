// ============================================================
// Layer 3 — ExtractedAnswer Domain Type
// ============================================================
// The only thing the reader hands back to its caller. A
// "no answer" result has `data`, `start` and `end` all set to
// None and still carries a probability, so it can be ranked
// against real spans on equal footing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::document::Document;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnswer {
    /// The extracted text, `None` for a no-answer result
    pub data:        Option<String>,
    pub question:    String,
    pub metadata:    Map<String, Value>,
    /// The document the span was taken from (absent for a
    /// synthesized query-level no-answer)
    pub document:    Option<Document>,
    pub probability: f64,
    /// Byte offset of the span start in `document.content`
    pub start:       Option<usize>,
    /// Byte offset one past the span end
    pub end:         Option<usize>,
}

impl ExtractedAnswer {
    pub fn new(
        data:        Option<String>,
        question:    impl Into<String>,
        metadata:    Map<String, Value>,
        document:    Option<Document>,
        probability: f64,
        start:       Option<usize>,
        end:         Option<usize>,
    ) -> Self {
        Self {
            data,
            question: question.into(),
            metadata,
            document,
            probability,
            start,
            end,
        }
    }

    /// A query-level "no answer" result with no document attached.
    pub fn no_answer(question: impl Into<String>, probability: f64) -> Self {
        Self::new(None, question, Map::new(), None, probability, None, None)
    }

    pub fn is_no_answer(&self) -> bool {
        self.data.is_none()
    }
}
