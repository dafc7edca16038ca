//! Read-only statistics over an [`IndexSnapshot`](crate::mvcc::snapshot::IndexSnapshot).

pub mod attributes;
pub mod case_fold;
pub mod metadata;
pub mod ngrams;
pub mod scan;
pub mod skipgrams;
pub mod statistics;
pub mod terms;

use crate::core::types::FrameId;
use crate::mvcc::snapshot::IndexSnapshot;

/// Which text fields a query looks at. `include` wins over `exclude`;
/// an empty selection covers every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSelection {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl FieldSelection {
    pub fn all() -> Self {
        FieldSelection::default()
    }

    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection {
            include: fields.into_iter().map(Into::into).collect(),
            exclude: Vec::new(),
        }
    }

    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection {
            include: Vec::new(),
            exclude: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, field: &str) -> bool {
        if !self.include.is_empty() {
            return self.include.iter().any(|f| f == field);
        }
        !self.exclude.iter().any(|f| f == field)
    }
}

/// Id window: `after` is exclusive, `up_to` inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub after: Option<u64>,
    pub up_to: Option<u64>,
}

impl Pagination {
    pub fn new(after: Option<u64>, up_to: Option<u64>) -> Self {
        Pagination { after, up_to }
    }

    pub fn contains(&self, id: u64) -> bool {
        self.after.is_none_or(|after| id > after) && self.up_to.is_none_or(|up_to| id <= up_to)
    }
}

impl IndexSnapshot {
    /// Live frame ids of the selected fields, or exactly `frame_ids` when given.
    pub(crate) fn selected_frames(&self, selection: &FieldSelection, frame_ids: Option<&[FrameId]>) -> Vec<FrameId> {
        match frame_ids {
            Some(ids) => {
                let mut ids: Vec<FrameId> = ids
                    .iter()
                    .copied()
                    .filter(|id| self.frames.contains_key(id))
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            None => {
                let mut ids: Vec<FrameId> = self
                    .postings
                    .fields
                    .iter()
                    .filter(|(field, _)| selection.matches(field))
                    .flat_map(|(_, postings)| postings.frame_ids.iter().copied())
                    .collect();
                ids.sort_unstable();
                ids
            }
        }
    }
}
