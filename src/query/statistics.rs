use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, FrameId};
use crate::index::frame::Frame;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::FieldSelection;

/// Value recorded per term in a term-frequency vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Weighting {
    /// Occurrences in the frame.
    #[default]
    Tf,
    /// 1 for every term present.
    BinarisedTf,
}

impl FromStr for Weighting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tf" => Ok(Weighting::Tf),
            "binarised-tf" => Ok(Weighting::BinarisedTf),
            other => Err(Error::invalid_argument(format!("unknown weighting '{}'", other))),
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Weighting::Tf => write!(f, "tf"),
            Weighting::BinarisedTf => write!(f, "binarised-tf"),
        }
    }
}

fn term_not_found(term: &str, field: &str) -> Error {
    Error::new(ErrorKind::KeyNotFound, format!("'{}' not found in field '{}'", term, field))
}

impl IndexSnapshot {
    /// `(term, occurrences)` for every term of `field`, in term order.
    pub fn frequencies<'a>(&'a self, field: &str) -> impl Iterator<Item = (&'a str, u64)> + 'a {
        self.postings
            .field(field)
            .into_iter()
            .flat_map(|postings| postings.terms.iter())
            .map(|(term, list)| (term.as_str(), list.total_freq()))
    }

    pub fn term_frequency(&self, term: &str, field: &str) -> Result<u64> {
        self.postings
            .term(field, term)
            .map(|list| list.total_freq())
            .ok_or_else(|| term_not_found(term, field))
    }

    pub fn term_positions(&self, term: &str, field: &str) -> Result<&BTreeMap<FrameId, Vec<u32>>> {
        self.postings
            .term(field, term)
            .map(|list| &list.frames)
            .ok_or_else(|| term_not_found(term, field))
    }

    /// Full positional index of a field: `(term, frame -> positions)`.
    pub fn positions_index<'a>(&'a self, field: &str) -> impl Iterator<Item = (&'a str, &'a BTreeMap<FrameId, Vec<u32>>)> + 'a {
        self.postings
            .field(field)
            .into_iter()
            .flat_map(|postings| postings.terms.iter())
            .map(|(term, list)| (term.as_str(), &list.frames))
    }

    pub fn vocab_size(&self, field: &str) -> usize {
        self.postings.field(field).map_or(0, |f| f.vocab_size())
    }

    pub fn frame_ids(&self, field: &str) -> &[FrameId] {
        self.postings.field(field).map(|f| f.frame_ids.as_slice()).unwrap_or_default()
    }

    /// Live frames over `fields`, or over every field when `fields` is empty.
    pub fn frame_count<S: AsRef<str>>(&self, fields: &[S]) -> usize {
        if fields.is_empty() {
            return self.frames.len();
        }
        fields.iter().map(|field| self.frame_ids(field.as_ref()).len()).sum()
    }

    /// Distinct documents owning at least one frame in `fields` (all fields when empty).
    pub fn documents_with_frames_count<S: AsRef<str>>(&self, fields: &[S]) -> usize {
        let selection = FieldSelection::include(fields.iter().map(|f| f.as_ref().to_string()));
        let owners: BTreeSet<DocId> = self
            .selected_frames(&selection, None)
            .into_iter()
            .filter_map(|id| self.frames.get(&id).map(|frame| frame.doc_id))
            .collect();
        owners.len()
    }

    /// Distinct documents owning the given frames; unknown ids are ignored.
    pub fn document_count_from_frame_ids<I>(&self, frame_ids: I) -> usize
    where
        I: IntoIterator<Item = FrameId>,
    {
        let owners: BTreeSet<DocId> = frame_ids
            .into_iter()
            .filter_map(|id| self.frames.get(&id).map(|frame| frame.doc_id))
            .collect();
        owners.len()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    /// Frames of the selected fields, or exactly `frame_ids` when given.
    pub fn frames_matching(&self, selection: &FieldSelection, frame_ids: Option<&[FrameId]>) -> Vec<&Frame> {
        self.selected_frames(selection, frame_ids)
            .into_iter()
            .filter_map(|id| self.frames.get(&id))
            .collect()
    }

    /// `frame -> term -> weight`. Under `Weighting::Tf`, summing a term over
    /// every frame of a field gives its `term_frequency`.
    pub fn term_frequency_vectors(
        &self,
        selection: &FieldSelection,
        frame_ids: Option<&[FrameId]>,
        weighting: Weighting,
    ) -> BTreeMap<FrameId, BTreeMap<String, u64>> {
        self.frames_matching(selection, frame_ids)
            .into_iter()
            .map(|frame| {
                let mut vector: BTreeMap<String, u64> = BTreeMap::new();
                for (term, _) in &frame.terms {
                    let weight = vector.entry(term.clone()).or_insert(0);
                    *weight = match weighting {
                        Weighting::Tf => *weight + 1,
                        Weighting::BinarisedTf => 1,
                    };
                }
                (frame.id, vector)
            })
            .collect()
    }
}
