use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use crate::core::types::{AttributeValue, DocId, FrameId};

/// Contiguous run of a text field's tokens, the unit postings point at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub id: FrameId,
    pub doc_id: DocId,
    pub field: String,
    pub sequence: u32,               // Ordinal of the frame within its field
    pub terms: Vec<(String, u32)>,   // (term, position); positions restart at 0
    pub text: Option<String>,        // Covered source text for stored fields
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Frame {
    /// Number of token positions in the frame.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms ordered by position.
    pub fn ordered_terms(&self) -> Vec<&str> {
        let mut terms: Vec<_> = self.terms.iter().collect();
        terms.sort_by_key(|(_, position)| *position);
        terms.into_iter().map(|(term, _)| term.as_str()).collect()
    }
}

/// Post-hoc tag on an existing frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAttribute {
    pub frame_id: FrameId,
    pub name: String,
    pub value: AttributeValue,
}
