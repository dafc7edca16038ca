use std::collections::BTreeSet;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::{FieldSelection, Pagination};

impl IndexSnapshot {
    /// First `limit` frame ids of the selected fields inside the window, in
    /// insertion order. Used to page through an index.
    ///
    /// With `return_documents` the selection is ignored and every live
    /// document id in the window counts, including documents without frames.
    pub fn filter_range(
        &self,
        selection: &FieldSelection,
        pagination: Pagination,
        limit: usize,
        return_documents: bool,
    ) -> Vec<u64> {
        if return_documents {
            return self
                .documents
                .keys()
                .map(|id| id.0)
                .filter(|id| pagination.contains(*id))
                .take(limit)
                .collect();
        }

        self.selected_frames(selection, None)
            .into_iter()
            .map(|id| id.0)
            .filter(|id| pagination.contains(*id))
            .take(limit)
            .collect()
    }

    /// Frames holding at least one token.
    pub fn filter_nonempty(&self, selection: &FieldSelection, pagination: Pagination) -> BTreeSet<u64> {
        self.selected_frames(selection, None)
            .into_iter()
            .filter(|id| pagination.contains(id.0))
            .filter(|id| self.frames.get(id).is_some_and(|frame| !frame.is_empty()))
            .map(|id| id.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::{AttributeValue, FrameId};
    use crate::query::test_support::{build, snapshot_of};
    use crate::query::{FieldSelection, Pagination};

    #[test]
    fn range_pages_in_insertion_order() {
        let snapshot = snapshot_of(&[&["a b", "", "c"], &["d"]]);
        let all = FieldSelection::all();

        assert_eq!(snapshot.filter_range(&all, Pagination::default(), 100, false), vec![1, 2, 3, 4]);
        assert_eq!(snapshot.filter_range(&all, Pagination::new(Some(1), None), 2, false), vec![2, 3]);
        assert_eq!(snapshot.filter_range(&all, Pagination::new(Some(1), None), 100, true), vec![2]);
        assert_eq!(snapshot.frame(FrameId(2)).unwrap().len(), 0);
    }

    #[test]
    fn document_range_ignores_field_selection() {
        let title: &[(&str, &str)] = &[("title", "a")];
        let body: &[(&str, &str)] = &[("body", "b")];
        let region: &[(&str, AttributeValue)] = &[("region", AttributeValue::from("Victoria"))];
        let (no_frames, no_metadata): (&[(&str, &str)], &[(&str, AttributeValue)]) = (&[], &[]);
        let snapshot = build(&[(title, no_metadata), (no_frames, region), (body, no_metadata)]);
        let body = FieldSelection::include(["body"]);

        assert_eq!(snapshot.filter_range(&body, Pagination::default(), 100, false), vec![2]);
        assert_eq!(snapshot.filter_range(&body, Pagination::default(), 100, true), vec![1, 2, 3]);
        assert_eq!(snapshot.filter_range(&body, Pagination::new(Some(1), Some(3)), 1, true), vec![2]);
    }

    #[test]
    fn nonempty_skips_frames_without_tokens() {
        let snapshot = snapshot_of(&[&["a b", "", "c"], &["d"]]);
        let ids = snapshot.filter_nonempty(&FieldSelection::all(), Pagination::new(None, Some(3)));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![1, 3]);
    }
}
