use std::collections::BTreeMap;
use roaring::RoaringTreemap;
use crate::core::types::AttributeValue;

/// Inverted index `name -> value -> ids`, used for frame attributes
/// (frame ids) and structured document metadata (doc ids).
#[derive(Debug, Clone, Default)]
pub struct ValueIndex {
    pub entries: BTreeMap<String, BTreeMap<AttributeValue, RoaringTreemap>>,
}

impl ValueIndex {
    pub fn insert(&mut self, name: &str, value: AttributeValue, id: u64) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .entry(value)
            .or_default()
            .insert(id);
    }

    pub fn values(&self, name: &str) -> Option<&BTreeMap<AttributeValue, RoaringTreemap>> {
        self.entries.get(name)
    }

    /// Ids whose value for `name` satisfies `predicate`.
    pub fn matching<F>(&self, name: &str, predicate: F) -> RoaringTreemap
    where
        F: Fn(&AttributeValue) -> bool,
    {
        let mut ids = RoaringTreemap::new();
        if let Some(values) = self.entries.get(name) {
            for (value, bitmap) in values {
                if predicate(value) {
                    ids |= bitmap;
                }
            }
        }
        ids
    }
}
