use std::collections::{BTreeMap, BTreeSet};
use crate::core::error::Result;
use crate::core::types::{AttributeValue, FrameId};
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::metadata::Comparison;
use crate::query::{FieldSelection, Pagination};

/// `name -> value -> ids`
pub type ValueMap = BTreeMap<String, BTreeMap<AttributeValue, BTreeSet<u64>>>;

impl IndexSnapshot {
    /// Attribute index over frames of the selected fields. With
    /// `return_documents` the ids are owning documents, each counted once per value.
    /// Pagination applies to whichever id kind is returned.
    pub fn attributes(&self, selection: &FieldSelection, return_documents: bool, pagination: Pagination) -> ValueMap {
        let mut result: ValueMap = BTreeMap::new();

        for (name, values) in &self.attributes.entries {
            for (value, frame_ids) in values {
                let ids: BTreeSet<u64> = frame_ids
                    .iter()
                    .filter_map(|id| self.frames.get(&FrameId(id)))
                    .filter(|frame| selection.matches(&frame.field))
                    .map(|frame| if return_documents { frame.doc_id.0 } else { frame.id.0 })
                    .filter(|id| pagination.contains(*id))
                    .collect();

                if !ids.is_empty() {
                    result.entry(name.clone()).or_default().insert(value.clone(), ids);
                }
            }
        }

        result
    }

    /// Structured metadata inverted onto frames of the selected fields, or onto
    /// documents with `return_documents` (the selection is then ignored).
    pub fn metadata_index(&self, selection: &FieldSelection, return_documents: bool, pagination: Pagination) -> ValueMap {
        let mut result: ValueMap = BTreeMap::new();

        if return_documents {
            for (field, values) in &self.metadata.entries {
                for (value, doc_ids) in values {
                    let ids: BTreeSet<u64> = doc_ids.iter().filter(|id| pagination.contains(*id)).collect();
                    if !ids.is_empty() {
                        result.entry(field.clone()).or_default().insert(value.clone(), ids);
                    }
                }
            }
            return result;
        }

        for frame in self.frames.values() {
            if !selection.matches(&frame.field) || !pagination.contains(frame.id.0) {
                continue;
            }
            let Some(document) = self.documents.get(&frame.doc_id) else {
                continue;
            };
            for (field, values) in &document.metadata {
                for value in values {
                    result
                        .entry(field.clone())
                        .or_default()
                        .entry(value.clone())
                        .or_default()
                        .insert(frame.id.0);
                }
            }
        }

        result
    }

    /// Frames (or owning documents) whose attributes satisfy every condition.
    /// Attribute values are compared as stored, without analysis.
    pub fn filter_attributes(
        &self,
        conditions: &[(&str, Comparison)],
        return_documents: bool,
        selection: &FieldSelection,
        pagination: Pagination,
    ) -> Result<BTreeSet<u64>> {
        let mut matched: Option<roaring::RoaringTreemap> = None;
        for (name, comparison) in conditions {
            let predicate = comparison.attribute_predicate()?;
            let ids = self.attributes.matching(name, predicate);
            matched = Some(match matched {
                Some(current) => current & ids,
                None => ids,
            });
        }

        let frame_ids = match matched {
            Some(ids) => ids,
            None => return Ok(BTreeSet::new()),
        };

        Ok(frame_ids
            .iter()
            .filter_map(|id| self.frames.get(&FrameId(id)))
            .filter(|frame| selection.matches(&frame.field))
            .map(|frame| if return_documents { frame.doc_id.0 } else { frame.id.0 })
            .filter(|id| pagination.contains(*id))
            .collect())
    }
}
