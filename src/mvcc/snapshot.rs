use std::collections::BTreeMap;
use chrono::{DateTime, Utc};
use roaring::RoaringTreemap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, FrameId, Revision};
use crate::index::frame::Frame;
use crate::index::posting::PostingIndex;
use crate::index::value_index::ValueIndex;
use crate::schema::plugins::PluginRegistry;
use crate::schema::schema::Schema;
use crate::schema::settings::Settings;
use crate::storage::backend::StoredState;
use crate::storage::manifest::Manifest;

/// Immutable view of the index at one committed manifest.
///
/// Only live documents and frames are kept; every derived index is rebuilt
/// from frame contents, so nothing can drift from the stored data.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub manifest: Manifest,
    pub documents: BTreeMap<DocId, Document>,
    pub frames: BTreeMap<FrameId, Frame>,
    pub postings: PostingIndex,
    pub attributes: ValueIndex,  // attribute -> value -> frame ids
    pub metadata: ValueIndex,    // structured field -> value -> doc ids
    pub deleted_docs: RoaringTreemap,
    pub loaded_at: DateTime<Utc>,
}

impl IndexSnapshot {
    pub fn build(state: StoredState) -> Self {
        let StoredState { manifest, segments } = state;

        let mut deleted_docs = RoaringTreemap::new();
        for doc_id in &manifest.deleted_documents {
            deleted_docs.insert(doc_id.0);
        }

        let mut documents = BTreeMap::new();
        let mut frames = BTreeMap::new();
        for segment in segments {
            for document in segment.documents {
                if !deleted_docs.contains(document.id.0) {
                    documents.insert(document.id, document);
                }
            }
            for frame in segment.frames {
                if !deleted_docs.contains(frame.doc_id.0) {
                    frames.insert(frame.id, frame);
                }
            }
            // Later segments overwrite earlier values of the same attribute.
            for attribute in segment.attributes {
                if let Some(frame) = frames.get_mut(&attribute.frame_id) {
                    frame.attributes.insert(attribute.name, attribute.value);
                }
            }
        }

        let mut postings = PostingIndex::default();
        let mut attributes = ValueIndex::default();
        for frame in frames.values() {
            postings.add_frame(frame);
            for (name, value) in &frame.attributes {
                attributes.insert(name, value.clone(), frame.id.0);
            }
        }

        let mut metadata = ValueIndex::default();
        for document in documents.values() {
            for (field, values) in &document.metadata {
                for value in values {
                    metadata.insert(field, value.clone(), document.id.0);
                }
            }
        }

        IndexSnapshot {
            manifest,
            documents,
            frames,
            postings,
            attributes,
            metadata,
            deleted_docs,
            loaded_at: Utc::now(),
        }
    }

    pub fn revision(&self) -> Revision {
        self.manifest.revision
    }

    pub fn schema(&self) -> &Schema {
        &self.manifest.schema
    }

    pub fn settings(&self) -> &Settings {
        &self.manifest.settings
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.manifest.plugins
    }

    pub fn document(&self, doc_id: DocId) -> Result<&Document> {
        self.documents
            .get(&doc_id)
            .ok_or_else(|| Error::new(ErrorKind::DocumentNotFound, format!("no document '{}'", doc_id)))
    }

    pub fn frame(&self, frame_id: FrameId) -> Result<&Frame> {
        self.frames
            .get(&frame_id)
            .ok_or_else(|| Error::new(ErrorKind::DocumentNotFound, format!("no frame '{}'", frame_id)))
    }

    pub fn is_live(&self, doc_id: DocId) -> bool {
        self.documents.contains_key(&doc_id)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AttributeValue, FieldValue};
    use crate::index::frame::FrameAttribute;
    use crate::schema::schema::FieldType;
    use crate::storage::segment::SegmentData;

    fn document(id: u64) -> Document {
        let mut doc = Document::new(DocId(id));
        doc.fields.insert("body".into(), FieldValue::Text("x".into()));
        doc.metadata.insert("kind".into(), vec![AttributeValue::Text("note".into())]);
        doc
    }

    fn frame(id: u64, doc: u64) -> Frame {
        Frame {
            id: FrameId(id),
            doc_id: DocId(doc),
            field: "body".into(),
            sequence: 0,
            terms: vec![("x".into(), 0)],
            text: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn deleted_documents_and_their_frames_are_hidden() {
        let mut manifest = Manifest::empty(Schema::new().field("body", FieldType::text()));
        manifest.deleted_documents.insert(DocId(1));

        let state = StoredState {
            manifest,
            segments: vec![
                SegmentData {
                    documents: vec![document(1), document(2)],
                    frames: vec![frame(1, 1), frame(2, 2)],
                    attributes: Vec::new(),
                },
                SegmentData {
                    documents: Vec::new(),
                    frames: Vec::new(),
                    attributes: vec![
                        FrameAttribute { frame_id: FrameId(2), name: "tone".into(), value: "calm".into() },
                        FrameAttribute { frame_id: FrameId(1), name: "tone".into(), value: "loud".into() },
                    ],
                },
                SegmentData {
                    documents: Vec::new(),
                    frames: Vec::new(),
                    attributes: vec![FrameAttribute { frame_id: FrameId(2), name: "tone".into(), value: "angry".into() }],
                },
            ],
        };

        let snapshot = IndexSnapshot::build(state);
        assert_eq!(snapshot.document_count(), 1);
        assert_eq!(snapshot.frame(FrameId(1)).unwrap_err().kind, ErrorKind::DocumentNotFound);
        assert_eq!(snapshot.postings.term("body", "x").unwrap().total_freq(), 1);

        let tones = snapshot.attributes.values("tone").unwrap();
        assert_eq!(tones.len(), 1);
        assert!(tones[&AttributeValue::Text("angry".into())].contains(2));
        assert_eq!(snapshot.metadata.matching("kind", |_| true).len(), 1);
    }
}
