// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// The reader only ever reads `content`: answer spans are byte
// ranges into it, and the extracted answer text is a slice of
// it. Everything else rides along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An immutable text document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier kept for traceability (a filename for loaded docs)
    pub id: String,

    /// The full text answers are extracted from
    pub content: String,

    /// Free-form metadata, never interpreted by the reader
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    /// Create a Document with empty metadata.
    ///
    /// Example:
    ///   let doc = Document::new("geo.txt", "Paris is the capital of France.");
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id:       id.into(),
            content:  content.into(),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// The substring between two byte offsets, or `None` when the
    /// range is out of bounds or splits a UTF-8 character.
    pub fn span(&self, start: usize, end: usize) -> Option<&str> {
        self.content.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_slices_content() {
        let doc = Document::new("d", "Paris is the capital of France.");
        assert_eq!(doc.span(0, 5), Some("Paris"));
        assert_eq!(doc.span(24, 30), Some("France"));
    }

    #[test]
    fn test_span_rejects_bad_ranges() {
        let doc = Document::new("d", "café");
        // 'é' is two bytes wide, offset 4 is inside it
        assert_eq!(doc.span(0, 4), None);
        assert_eq!(doc.span(2, 99), None);
    }
}
