use std::collections::BTreeMap;
use crate::core::types::FrameId;
use crate::index::frame::Frame;

/// Frames and positions at which one term occurs.
/// Note: Sorted by frame_id, so iteration follows ingestion order.
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    pub frames: BTreeMap<FrameId, Vec<u32>>,
}

impl PostingList {
    pub fn add(&mut self, frame_id: FrameId, position: u32) {
        let positions = self.frames.entry(frame_id).or_default();
        match positions.binary_search(&position) {
            Ok(_) => {}
            Err(pos) => positions.insert(pos, position),
        }
    }

    /// Total number of occurrences.
    pub fn total_freq(&self) -> u64 {
        self.frames.values().map(|p| p.len() as u64).sum()
    }

    /// Number of frames containing the term.
    pub fn frame_freq(&self) -> u64 {
        self.frames.len() as u64
    }

    pub fn contains(&self, frame_id: FrameId) -> bool {
        self.frames.contains_key(&frame_id)
    }
}

/// Postings of one field
#[derive(Debug, Clone, Default)]
pub struct FieldPostings {
    pub terms: BTreeMap<String, PostingList>,
    pub frame_ids: Vec<FrameId>,  // Every live frame of the field, ascending
}

impl FieldPostings {
    pub fn vocab_size(&self) -> usize {
        self.terms.len()
    }
}

/// term -> field -> frame -> positions, keyed field first.
///
/// Rebuilt from frame contents whenever a snapshot is loaded.
#[derive(Debug, Clone, Default)]
pub struct PostingIndex {
    pub fields: BTreeMap<String, FieldPostings>,
}

impl PostingIndex {
    /// Frames must be added in ascending id order.
    pub fn add_frame(&mut self, frame: &Frame) {
        let field = self.fields.entry(frame.field.clone()).or_default();
        field.frame_ids.push(frame.id);
        for (term, position) in &frame.terms {
            field
                .terms
                .entry(term.clone())
                .or_default()
                .add(frame.id, *position);
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldPostings> {
        self.fields.get(name)
    }

    pub fn term(&self, field: &str, term: &str) -> Option<&PostingList> {
        self.fields.get(field).and_then(|f| f.terms.get(term))
    }
}
