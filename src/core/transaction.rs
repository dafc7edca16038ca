use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{AttributeValue, DocId, Document, FrameId, Revision};
use crate::index::frame::{Frame, FrameAttribute};
use crate::index::framer::FramedDocument;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::schema::plugins::{PluginRegistry, PluginState};
use crate::schema::schema::Schema;
use crate::schema::settings::{SettingValue, Settings};
use crate::storage::file_lock::FileLock;
use crate::storage::manifest::Manifest;
use crate::storage::segment::SegmentData;

/// Transaction ID generator
static TRANSACTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// What a commit changed, reported back to the writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitSummary {
    pub added: Vec<DocId>,
    pub deleted: Vec<DocId>,
    /// Plugin instances whose state was stored and not deleted afterwards.
    pub updated_plugins: Vec<u64>,
    pub revision: Revision,
}

/// Write transaction staged in memory on top of one committed snapshot.
///
/// Holds the writer lock for its whole life, so ids can be reserved eagerly:
/// no other writer can observe or reuse them. Dropping it discards every
/// staged change and releases the lock.
pub struct Transaction {
    pub id: u64,
    state: TransactionState,
    base: Arc<IndexSnapshot>,
    schema: Schema,
    settings: Settings,
    plugins: PluginRegistry,
    updated_plugins: BTreeSet<u64>,
    documents: Vec<Document>,
    frames: Vec<Frame>,
    attributes: Vec<FrameAttribute>,
    deletes: BTreeSet<DocId>,  // Live documents of the base snapshot only
    next_doc_id: u64,
    next_frame_id: u64,
    _lock: FileLock,
}

impl Transaction {
    pub fn begin(base: Arc<IndexSnapshot>, lock: FileLock) -> Self {
        let id = TRANSACTION_ID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let manifest = &base.manifest;

        Transaction {
            id,
            state: TransactionState::Active,
            schema: manifest.schema.clone(),
            settings: manifest.settings.clone(),
            plugins: manifest.plugins.clone(),
            updated_plugins: BTreeSet::new(),
            next_doc_id: manifest.next_doc_id,
            next_frame_id: manifest.next_frame_id,
            documents: Vec::new(),
            frames: Vec::new(),
            attributes: Vec::new(),
            deletes: BTreeSet::new(),
            base,
            _lock: lock,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn base(&self) -> &Arc<IndexSnapshot> {
        &self.base
    }

    /// Schema including fields added in this transaction.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn replace_schema(&mut self, schema: Schema) -> Result<()> {
        self.check_active()?;
        self.schema = schema;
        Ok(())
    }

    pub fn set_setting(&mut self, name: &str, value: SettingValue) -> Result<()> {
        self.check_active()?;
        self.settings.set(name, value);
        Ok(())
    }

    pub fn set_plugin_state(&mut self, plugin_type: &str, settings: &str, state: PluginState) -> Result<u64> {
        self.check_active()?;
        let id = self.plugins.set(plugin_type, settings, state);
        self.updated_plugins.insert(id);
        Ok(id)
    }

    /// Whether the instance existed.
    pub fn delete_plugin_instance(&mut self, plugin_type: &str, settings: &str) -> Result<bool> {
        self.check_active()?;
        Ok(self.plugins.delete_instance(plugin_type, settings).is_some())
    }

    /// Number of instances removed.
    pub fn delete_plugin_type(&mut self, plugin_type: &str) -> Result<usize> {
        self.check_active()?;
        Ok(self.plugins.delete_type(plugin_type).len())
    }

    /// Assigns the next document and frame ids and stages the document.
    pub fn stage_document(&mut self, framed: FramedDocument) -> Result<DocId> {
        self.check_active()?;

        let doc_id = DocId(self.next_doc_id);
        let (document, frames) = framed.assign(doc_id, self.next_frame_id);
        self.next_doc_id += 1;
        self.next_frame_id += frames.len() as u64;

        self.documents.push(document);
        self.frames.extend(frames);
        Ok(doc_id)
    }

    /// Stages a delete. Unknown and already deleted ids are accepted; a
    /// document staged in this transaction is simply un-staged.
    pub fn stage_delete(&mut self, doc_id: DocId) -> Result<()> {
        self.check_active()?;

        if let Some(index) = self.documents.iter().position(|doc| doc.id == doc_id) {
            self.documents.remove(index);
            let removed: BTreeSet<FrameId> = self
                .frames
                .iter()
                .filter(|frame| frame.doc_id == doc_id)
                .map(|frame| frame.id)
                .collect();
            self.frames.retain(|frame| frame.doc_id != doc_id);
            self.attributes.retain(|attribute| !removed.contains(&attribute.frame_id));
            return Ok(());
        }

        if self.base.is_live(doc_id) {
            self.deletes.insert(doc_id);
        }
        Ok(())
    }

    /// Live in the base snapshot and not deleted here, or staged here.
    pub fn frame_exists(&self, frame_id: FrameId) -> bool {
        match self.base.frames.get(&frame_id) {
            Some(frame) => !self.deletes.contains(&frame.doc_id),
            None => self.frames.iter().any(|frame| frame.id == frame_id),
        }
    }

    /// Checks every frame before staging anything.
    pub fn stage_attributes(&mut self, attributes: BTreeMap<FrameId, BTreeMap<String, AttributeValue>>) -> Result<()> {
        self.check_active()?;

        if let Some(missing) = attributes.keys().find(|id| !self.frame_exists(**id)) {
            return Err(Error::new(
                ErrorKind::DocumentNotFound,
                format!("cannot tag unknown or deleted frame '{}'", missing),
            ));
        }

        for (frame_id, values) in attributes {
            for (name, value) in values {
                self.attributes.push(FrameAttribute { frame_id, name, value });
            }
        }
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        !self.documents.is_empty()
            || !self.deletes.is_empty()
            || !self.attributes.is_empty()
            || self.schema != self.base.manifest.schema
            || self.settings != self.base.manifest.settings
            || self.plugins != self.base.manifest.plugins
    }

    /// Next manifest and the data of the new segment. The transaction is
    /// finished afterwards whether or not the caller manages to persist them.
    pub fn prepare(&mut self) -> Result<(Manifest, SegmentData, CommitSummary)> {
        self.check_active()?;
        self.state = TransactionState::Committed;

        let data = SegmentData {
            documents: std::mem::take(&mut self.documents),
            frames: std::mem::take(&mut self.frames),
            attributes: std::mem::take(&mut self.attributes),
        };
        let deletes = std::mem::take(&mut self.deletes);

        let mut manifest = self.base.manifest.clone();
        manifest.revision = manifest
            .revision
            .advance(data.documents.len(), deletes.len(), data.frames.len() as u64);
        manifest.deleted_documents.extend(deletes.iter().copied());
        manifest.next_doc_id = self.next_doc_id;
        manifest.next_frame_id = self.next_frame_id;
        manifest.schema = self.schema.clone();
        manifest.settings = self.settings.clone();
        manifest.plugins = self.plugins.clone();

        let summary = CommitSummary {
            added: data.documents.iter().map(|doc| doc.id).collect(),
            deleted: deletes.into_iter().collect(),
            updated_plugins: self
                .updated_plugins
                .iter()
                .copied()
                .filter(|id| self.plugins.contains(*id))
                .collect(),
            revision: manifest.revision,
        };
        Ok((manifest, data, summary))
    }

    pub fn abort(&mut self) {
        self.state = TransactionState::Aborted;
    }

    fn check_active(&self) -> Result<()> {
        if self.state != TransactionState::Active {
            return Err(Error::invalid_state(format!("transaction {} is not active", self.id)));
        }
        Ok(())
    }
}
