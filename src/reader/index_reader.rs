use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Document, FrameId, Revision};
use crate::index::frame::Frame;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::query::attributes::ValueMap;
use crate::query::metadata::Comparison;
use crate::query::ngrams::{FilterNgramOptions, NgramOptions};
use crate::query::skipgrams::Skipgram;
use crate::query::statistics::Weighting;
use crate::query::terms::TermQuery;
use crate::query::{FieldSelection, Pagination};
use crate::schema::plugins::{PluginInstance, PluginState};
use crate::schema::schema::Schema;
use crate::schema::settings::SettingValue;
use crate::storage::backend::{FileStorage, StorageBackend};
use crate::storage::file_lock::FileLock;
use crate::storage::migration::{self, CURRENT_SCHEMA};

/// Read transaction over one committed state of an index.
///
/// `begin` loads the latest committed snapshot; every query afterwards sees
/// exactly that state, however many commits happen meanwhile. Readers take no
/// lock, except briefly to migrate an older storage version.
pub struct IndexReader {
    storage: Arc<dyn StorageBackend>,
    config: Config,
    analyzers: Arc<AnalyzerRegistry>,
    snapshot: Option<Arc<IndexSnapshot>>,
}

impl IndexReader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_config(path, Config::default())
    }

    pub fn with_config(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(path, config.clone()));
        Self::with_storage(storage, config)
    }

    pub fn with_storage(storage: Arc<dyn StorageBackend>, config: Config) -> Result<Self> {
        if !storage.exists() {
            return Err(Error::new(
                ErrorKind::IndexNotFound,
                format!("no index at {}", storage.location().display()),
            ));
        }
        Ok(IndexReader {
            storage,
            config,
            analyzers: Arc::new(AnalyzerRegistry::new()),
            snapshot: None,
        })
    }

    /// Opens the reader and begins a read transaction.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = Self::new(path)?;
        reader.begin()?;
        Ok(reader)
    }

    pub fn with_analyzers(mut self, analyzers: Arc<AnalyzerRegistry>) -> Self {
        self.analyzers = analyzers;
        self
    }

    /// Loads the latest committed state, replacing any earlier snapshot.
    pub fn begin(&mut self) -> Result<()> {
        let version = self.storage.storage_version()?;
        if migration::check_version(version, self.config.auto_migrate)? {
            let _lock = FileLock::acquire(&self.storage.lock_path(), None, &self.config)?;
            // Another process may have migrated while we waited.
            if self.storage.storage_version()? < CURRENT_SCHEMA {
                let migrated = self.storage.migrate()?;
                info!(from = version, to = migrated, "migrated index before reading");
            }
        }

        let snapshot = IndexSnapshot::build(self.storage.load()?);
        debug!(revision = ?snapshot.revision().as_tuple(), documents = snapshot.document_count(), "read transaction started");
        self.snapshot = Some(Arc::new(snapshot));
        Ok(())
    }

    pub fn close(&mut self) {
        self.snapshot = None;
    }

    pub fn is_open(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Shared snapshot of the current read transaction, usable from other threads.
    pub fn snapshot(&self) -> Result<&Arc<IndexSnapshot>> {
        self.snapshot
            .as_ref()
            .ok_or_else(|| Error::invalid_state("reader has no open read transaction"))
    }

    pub fn get_schema(&self) -> Result<&Schema> {
        Ok(self.snapshot()?.schema())
    }

    pub fn get_revision(&self) -> Result<Revision> {
        Ok(self.snapshot()?.revision())
    }

    pub fn get_setting(&self, name: &str) -> Result<SettingValue> {
        self.snapshot()?.settings().get(name).cloned()
    }

    /// Settings present among `names`; missing ones are left out.
    pub fn get_settings<S: AsRef<str>>(&self, names: &[S]) -> Result<BTreeMap<String, SettingValue>> {
        Ok(self.snapshot()?.settings().get_many(names))
    }

    /// State stored by the plugin instance `(plugin_type, settings)`.
    pub fn get_plugin_state(&self, plugin_type: &str, settings: &str) -> Result<PluginState> {
        self.snapshot()?.plugins().state(plugin_type, settings).cloned()
    }

    pub fn get_plugin_by_id(&self, id: u64) -> Result<PluginInstance> {
        self.snapshot()?.plugins().by_id(id).cloned()
    }

    /// `(plugin_type, settings, id)` of every stored plugin instance.
    pub fn list_plugins(&self) -> Result<Vec<(String, String, u64)>> {
        Ok(self.snapshot()?.plugins().list())
    }

    pub fn get_frequencies(&self, field: &str) -> Result<BTreeMap<String, u64>> {
        Ok(self
            .snapshot()?
            .frequencies(field)
            .map(|(term, count)| (term.to_string(), count))
            .collect())
    }

    pub fn get_term_frequency(&self, term: &str, field: &str) -> Result<u64> {
        self.snapshot()?.term_frequency(term, field)
    }

    pub fn get_term_positions(&self, term: &str, field: &str) -> Result<BTreeMap<FrameId, Vec<u32>>> {
        self.snapshot()?.term_positions(term, field).cloned()
    }

    pub fn get_positions_index(&self, field: &str) -> Result<BTreeMap<String, BTreeMap<FrameId, Vec<u32>>>> {
        Ok(self
            .snapshot()?
            .positions_index(field)
            .map(|(term, positions)| (term.to_string(), positions.clone()))
            .collect())
    }

    pub fn get_vocab_size(&self, field: &str) -> Result<usize> {
        Ok(self.snapshot()?.vocab_size(field))
    }

    pub fn get_document(&self, doc_id: DocId) -> Result<Document> {
        self.snapshot()?.document(doc_id).cloned()
    }

    /// Every live document, or the given ones. Unknown ids fail.
    pub fn get_documents(&self, doc_ids: Option<&[DocId]>) -> Result<Vec<Document>> {
        let snapshot = self.snapshot()?;
        match doc_ids {
            Some(ids) => ids.iter().map(|id| snapshot.document(*id).cloned()).collect(),
            None => Ok(snapshot.documents().cloned().collect()),
        }
    }

    pub fn get_document_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.document_count())
    }

    pub fn get_frame(&self, frame_id: FrameId) -> Result<Frame> {
        self.snapshot()?.frame(frame_id).cloned()
    }

    pub fn get_frames(&self, selection: &FieldSelection, frame_ids: Option<&[FrameId]>) -> Result<Vec<Frame>> {
        Ok(self
            .snapshot()?
            .frames_matching(selection, frame_ids)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_frame_ids(&self, field: &str) -> Result<Vec<FrameId>> {
        Ok(self.snapshot()?.frame_ids(field).to_vec())
    }

    /// Frames over `fields`, or over every field when empty.
    pub fn get_frame_count<S: AsRef<str>>(&self, fields: &[S]) -> Result<usize> {
        Ok(self.snapshot()?.frame_count(fields))
    }

    pub fn get_documents_with_frames_count<S: AsRef<str>>(&self, fields: &[S]) -> Result<usize> {
        Ok(self.snapshot()?.documents_with_frames_count(fields))
    }

    pub fn get_document_count_from_frame_ids(&self, frame_ids: &[FrameId]) -> Result<usize> {
        Ok(self.snapshot()?.document_count_from_frame_ids(frame_ids.iter().copied()))
    }

    pub fn filter(&self, conditions: &[(&str, Comparison)]) -> Result<BTreeSet<DocId>> {
        self.snapshot()?.filter(conditions, &self.analyzers)
    }

    pub fn get_attributes(&self, selection: &FieldSelection, return_documents: bool, pagination: Pagination) -> Result<ValueMap> {
        Ok(self.snapshot()?.attributes(selection, return_documents, pagination))
    }

    pub fn get_metadata(&self, selection: &FieldSelection, return_documents: bool, pagination: Pagination) -> Result<ValueMap> {
        Ok(self.snapshot()?.metadata_index(selection, return_documents, pagination))
    }

    pub fn filter_attributes(
        &self,
        conditions: &[(&str, Comparison)],
        return_documents: bool,
        selection: &FieldSelection,
        pagination: Pagination,
    ) -> Result<BTreeSet<u64>> {
        self.snapshot()?.filter_attributes(conditions, return_documents, selection, pagination)
    }

    pub fn filter_range(
        &self,
        selection: &FieldSelection,
        pagination: Pagination,
        limit: usize,
        return_documents: bool,
    ) -> Result<Vec<u64>> {
        Ok(self.snapshot()?.filter_range(selection, pagination, limit, return_documents))
    }

    pub fn filter_nonempty(&self, selection: &FieldSelection, pagination: Pagination) -> Result<BTreeSet<u64>> {
        Ok(self.snapshot()?.filter_nonempty(selection, pagination))
    }

    pub fn get_case_fold_terms(&self, selection: &FieldSelection, merge_threshold: f64) -> Result<Vec<(String, String)>> {
        self.snapshot()?.case_fold_terms(selection, merge_threshold)
    }

    pub fn detect_significant_ngrams(&self, options: &NgramOptions) -> Result<Vec<Vec<String>>> {
        self.snapshot()?.significant_ngrams(options)
    }

    pub fn filter_ngrams(&self, ngrams: &[Vec<String>], options: &FilterNgramOptions) -> Result<BTreeMap<u64, Vec<f64>>> {
        self.snapshot()?.filter_ngrams(ngrams, options)
    }

    pub fn get_skipgrams(
        &self,
        start_offset: u32,
        end_offset: u32,
        selection: &FieldSelection,
        frame_ids: Option<&[FrameId]>,
    ) -> Result<Vec<Skipgram>> {
        self.snapshot()?.skipgrams(start_offset, end_offset, selection, frame_ids)
    }

    pub fn get_term_frequency_vectors(
        &self,
        selection: &FieldSelection,
        frame_ids: Option<&[FrameId]>,
        weighting: Weighting,
    ) -> Result<BTreeMap<FrameId, BTreeMap<String, u64>>> {
        Ok(self.snapshot()?.term_frequency_vectors(selection, frame_ids, weighting))
    }

    /// Frames (or documents) matching a boolean term query, in id order.
    /// `limit` of `None` returns every match in the window.
    pub fn filter_terms(&self, query: &TermQuery, pagination: Pagination, limit: Option<usize>) -> Result<BTreeMap<u64, f64>> {
        self.snapshot()?.filter_terms(query, pagination, limit, &self.analyzers)
    }

    /// Best scoring matches first. Pass the last entry of one page as
    /// `after` to fetch the next.
    pub fn filter_and_rank(&self, query: &TermQuery, after: Option<(u64, f64)>, limit: usize) -> Result<Vec<(u64, f64)>> {
        self.snapshot()?.rank_terms(query, after, limit, &self.analyzers)
    }
}
