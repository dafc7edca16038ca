use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u64);

impl DocId {
    pub fn new(id: u64) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for DocId {
    fn from(id: u64) -> Self {
        DocId(id)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique frame identifier, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameId(pub u64);

impl FrameId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for FrameId {
    fn from(id: u64) -> Self {
        FrameId(id)
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw value supplied for a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Boolean(_) => "boolean",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

/// Tagged value used for frame attributes and structured metadata.
///
/// Values are totally ordered: booleans, then integers, then floats, then text.
/// Floats compare with `f64::total_cmp`, so they can be used as map keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl AttributeValue {
    fn rank(&self) -> u8 {
        match self {
            AttributeValue::Boolean(_) => 0,
            AttributeValue::Integer(_) => 1,
            AttributeValue::Float(_) => 2,
            AttributeValue::Text(_) => 3,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(value) => Some(*value as f64),
            AttributeValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttributeValue {}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => a.cmp(b),
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => a.cmp(b),
            (AttributeValue::Float(a), AttributeValue::Float(b)) => a.total_cmp(b),
            (AttributeValue::Text(a), AttributeValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            AttributeValue::Boolean(value) => value.hash(state),
            AttributeValue::Integer(value) => value.hash(state),
            AttributeValue::Float(value) => value.to_bits().hash(state),
            AttributeValue::Text(value) => value.hash(state),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttributeValue::Boolean(value) => write!(f, "{}", value),
            AttributeValue::Integer(value) => write!(f, "{}", value),
            AttributeValue::Float(value) => write!(f, "{}", value),
            AttributeValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<FieldValue> for AttributeValue {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(value) => AttributeValue::Text(value),
            FieldValue::Integer(value) => AttributeValue::Integer(value),
            FieldValue::Float(value) => AttributeValue::Float(value),
            FieldValue::Boolean(value) => AttributeValue::Boolean(value),
        }
    }
}

/// A committed document: stored field values plus analysed metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fields: BTreeMap<String, FieldValue>,
    pub metadata: BTreeMap<String, Vec<AttributeValue>>,
}

impl Document {
    pub fn new(id: DocId) -> Self {
        Document {
            id,
            fields: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Change counters of an index, advanced once per effective commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision {
    pub commits: u64,
    pub add_commits: u64,
    pub delete_commits: u64,
    pub cumulative_frames: u64,
}

impl Revision {
    pub fn new(commits: u64, add_commits: u64, delete_commits: u64, cumulative_frames: u64) -> Self {
        Revision { commits, add_commits, delete_commits, cumulative_frames }
    }

    /// Revision after a commit that added `added` documents producing `frames` frames
    /// and deleted `deleted` live documents.
    pub fn advance(&self, added: usize, deleted: usize, frames: u64) -> Revision {
        let mut next = *self;
        if added > 0 {
            next.add_commits += 1;
            next.cumulative_frames += frames;
        }
        if deleted > 0 {
            next.delete_commits += 1;
        }
        next.commits = next.add_commits + next.delete_commits;
        next
    }

    pub fn as_tuple(&self) -> (u64, u64, u64, u64) {
        (self.commits, self.add_commits, self.delete_commits, self.cumulative_frames)
    }

    /// Component-wise comparison; `PartialOrd` on the struct is lexicographic.
    pub fn dominates(&self, other: &Revision) -> bool {
        self.commits >= other.commits
            && self.add_commits >= other.add_commits
            && self.delete_commits >= other.delete_commits
            && self.cumulative_frames >= other.cumulative_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn revision_counts_add_and_delete_commits() {
        let start = Revision::default();
        let added = start.advance(1, 0, 52);
        assert_eq!(added.as_tuple(), (1, 1, 0, 52));

        let deleted = added.advance(0, 1, 0);
        assert_eq!(deleted.as_tuple(), (2, 1, 1, 52));
        assert!(deleted.dominates(&added));

        let mixed = deleted.advance(2, 1, 10);
        assert_eq!(mixed.as_tuple(), (4, 2, 2, 62));
    }

    #[test]
    fn empty_commit_keeps_revision() {
        let revision = Revision::new(3, 2, 1, 40);
        assert_eq!(revision.advance(0, 0, 0), revision);
    }

    #[test]
    fn added_document_without_frames_still_counts() {
        let revision = Revision::new(3, 3, 0, 260).advance(1, 0, 0);
        assert_eq!(revision.as_tuple(), (4, 4, 0, 260));
    }

    #[test]
    fn attribute_values_order_across_kinds() {
        let values: BTreeSet<AttributeValue> = [
            AttributeValue::Text("b".into()),
            AttributeValue::Float(0.5),
            AttributeValue::Integer(3),
            AttributeValue::Boolean(true),
            AttributeValue::Text("a".into()),
            AttributeValue::Integer(3),
        ]
        .into_iter()
        .collect();

        let ordered: Vec<_> = values.into_iter().collect();
        assert_eq!(ordered.len(), 5);
        assert_eq!(ordered[0], AttributeValue::Boolean(true));
        assert_eq!(ordered[1], AttributeValue::Integer(3));
        assert_eq!(ordered[4], AttributeValue::Text("b".into()));
    }
}
