use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::config::{Config, IndexConfig};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::transaction::Transaction;
use crate::core::types::{AttributeValue, DocId, FieldValue, FrameId, Revision};
use crate::index::framer::Framer;
use crate::mvcc::snapshot::IndexSnapshot;
use crate::schema::plugins::PluginState;
use crate::schema::schema::{FieldType, Schema};
use crate::schema::settings::SettingValue;
use crate::storage::backend::{FileStorage, StorageBackend};
use crate::storage::file_lock::FileLock;
use crate::storage::migration;

/// Single writer of an index location.
///
/// Every mutation happens inside a transaction opened with [`begin`](Self::begin),
/// which holds the location's writer lock until [`commit`](Self::commit) or
/// [`rollback`](Self::rollback). Dropping an open writer rolls back.
pub struct IndexWriter {
    storage: Arc<dyn StorageBackend>,
    index_config: Option<IndexConfig>,
    config: Config,
    analyzers: Arc<AnalyzerRegistry>,
    transaction: Option<Transaction>,
    last_committed: Vec<DocId>,
    last_deleted: Vec<DocId>,
    last_updated_plugins: Vec<u64>,
}

impl IndexWriter {
    /// Writer for `path`. Without an `IndexConfig` the index must already
    /// exist; with one, it is created on the first `begin` if missing.
    pub fn new(path: impl AsRef<Path>, index_config: Option<IndexConfig>) -> Result<Self> {
        Self::with_config(path, index_config, Config::default())
    }

    pub fn with_config(path: impl AsRef<Path>, index_config: Option<IndexConfig>, config: Config) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(path, config.clone()));
        Self::with_storage(storage, index_config, config)
    }

    pub fn with_storage(
        storage: Arc<dyn StorageBackend>,
        index_config: Option<IndexConfig>,
        config: Config,
    ) -> Result<Self> {
        if index_config.is_none() && !storage.exists() {
            return Err(Error::new(
                ErrorKind::IndexNotFound,
                format!("no index at {} and no index config to create one", storage.location().display()),
            ));
        }

        Ok(IndexWriter {
            storage,
            index_config,
            config,
            analyzers: Arc::new(AnalyzerRegistry::new()),
            transaction: None,
            last_committed: Vec::new(),
            last_deleted: Vec::new(),
            last_updated_plugins: Vec::new(),
        })
    }

    /// Replaces the analyzer registry, e.g. one with custom analyzers registered.
    pub fn with_analyzers(mut self, analyzers: Arc<AnalyzerRegistry>) -> Self {
        self.analyzers = analyzers;
        self
    }

    pub fn analyzers(&self) -> &Arc<AnalyzerRegistry> {
        &self.analyzers
    }

    /// Acquires the writer lock and opens a transaction on the latest
    /// committed state. `None` waits for the lock indefinitely.
    pub fn begin(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::invalid_state("writer already has an open transaction"));
        }

        self.storage.prepare()?;
        let lock = FileLock::acquire(&self.storage.lock_path(), timeout, &self.config)?;

        if self.storage.exists() {
            let version = self.storage.storage_version()?;
            if migration::check_version(version, self.config.auto_migrate)? {
                let migrated = self.storage.migrate()?;
                info!(from = version, to = migrated, "migrated index before writing");
            }
        } else {
            let index_config = self.index_config.as_ref().ok_or_else(|| {
                Error::new(
                    ErrorKind::IndexNotFound,
                    format!("index at {} was removed", self.storage.location().display()),
                )
            })?;
            self.storage.bootstrap(&index_config.schema)?;
        }

        let snapshot = Arc::new(IndexSnapshot::build(self.storage.load()?));
        let transaction = Transaction::begin(snapshot, lock);
        debug!(transaction = transaction.id, revision = ?transaction.base().revision().as_tuple(), "write transaction started");
        self.transaction = Some(transaction);
        Ok(())
    }

    /// Persists every staged change atomically and releases the lock.
    /// Returns the revision now visible to new readers.
    pub fn commit(&mut self) -> Result<Revision> {
        let mut transaction = self.take_transaction()?;

        if !transaction.has_changes() {
            debug!(transaction = transaction.id, "nothing to commit");
            self.last_committed.clear();
            self.last_deleted.clear();
            self.last_updated_plugins.clear();
            return Ok(transaction.base().revision());
        }

        let (manifest, data, summary) = transaction.prepare()?;
        let frames = data.frames.len();
        if let Err(err) = self.storage.commit(manifest, data) {
            warn!(transaction = transaction.id, error = %err, "commit failed, changes discarded");
            return Err(err);
        }

        info!(
            transaction = transaction.id,
            added = summary.added.len(),
            deleted = summary.deleted.len(),
            plugins = summary.updated_plugins.len(),
            frames,
            revision = ?summary.revision.as_tuple(),
            "committed"
        );
        self.last_committed = summary.added;
        self.last_deleted = summary.deleted;
        self.last_updated_plugins = summary.updated_plugins;
        Ok(summary.revision)
    }

    /// Discards every staged change and releases the lock.
    pub fn rollback(&mut self) -> Result<()> {
        let mut transaction = self.take_transaction()?;
        transaction.abort();
        debug!(transaction = transaction.id, "rolled back");
        Ok(())
    }

    /// Runs `f` in its own transaction: committed when `f` succeeds, rolled
    /// back when it fails.
    pub fn transaction<T, F>(&mut self, timeout: Option<Duration>, f: F) -> Result<T>
    where
        F: FnOnce(&mut IndexWriter) -> Result<T>,
    {
        self.begin(timeout)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if self.transaction.is_some() {
                    self.rollback()?;
                }
                Err(err)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.transaction.is_some()
    }

    /// Frames and stages one document. `frame_size` of `None` uses the
    /// configured default; `Some(0)` keeps each text field in one frame.
    pub fn add_document<I, K, V>(&mut self, frame_size: Option<usize>, fields: I) -> Result<DocId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let frame_size = frame_size.unwrap_or(self.config.default_frame_size);
        let transaction = self.transaction.as_mut().ok_or_else(not_open)?;
        let framed = Framer::new(transaction.schema(), &self.analyzers).frame_document(frame_size, fields)?;
        transaction.stage_document(framed)
    }

    /// Unknown and already deleted ids are accepted and change nothing.
    pub fn delete_document(&mut self, doc_id: DocId) -> Result<()> {
        self.active()?.stage_delete(doc_id)
    }

    /// Tags existing frames; a later value for the same attribute of a
    /// frame replaces the earlier one.
    pub fn append_frame_attributes(&mut self, attributes: BTreeMap<FrameId, BTreeMap<String, AttributeValue>>) -> Result<()> {
        self.active()?.stage_attributes(attributes)
    }

    /// Adds fields to the schema. Either every field is added or none is.
    pub fn add_fields<I, S>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, FieldType)>,
        S: AsRef<str>,
    {
        let transaction = self.active()?;
        let mut schema = transaction.schema().clone();
        for (name, field_type) in fields {
            schema.add_field(name.as_ref(), field_type)?;
        }
        transaction.replace_schema(schema)
    }

    pub fn set_setting(&mut self, name: &str, value: impl Into<SettingValue>) -> Result<()> {
        self.active()?.set_setting(name, value.into())
    }

    /// Stores the state of one plugin instance, replacing any earlier state.
    /// Returns the instance id, stable across later updates.
    pub fn set_plugin_state(&mut self, plugin_type: &str, settings: &str, state: PluginState) -> Result<u64> {
        let id = self.active()?.set_plugin_state(plugin_type, settings, state)?;
        debug!(plugin_type, plugin = id, "plugin state staged");
        Ok(id)
    }

    /// Unknown instances are accepted and change nothing.
    pub fn delete_plugin_instance(&mut self, plugin_type: &str, settings: &str) -> Result<()> {
        if self.active()?.delete_plugin_instance(plugin_type, settings)? {
            debug!(plugin_type, settings, "plugin instance deleted");
        }
        Ok(())
    }

    /// Removes every instance of `plugin_type` and its state.
    pub fn delete_plugin_type(&mut self, plugin_type: &str) -> Result<()> {
        let removed = self.active()?.delete_plugin_type(plugin_type)?;
        debug!(plugin_type, removed, "plugin type deleted");
        Ok(())
    }

    /// Schema as seen by the open transaction.
    pub fn schema(&self) -> Result<&Schema> {
        self.transaction.as_ref().map(|t| t.schema()).ok_or_else(not_open)
    }

    /// Documents added by the last commit.
    pub fn last_committed_documents(&self) -> &[DocId] {
        &self.last_committed
    }

    /// Live documents removed by the last commit.
    pub fn last_deleted_documents(&self) -> &[DocId] {
        &self.last_deleted
    }

    /// Plugin instances whose state the last commit stored.
    pub fn last_updated_plugins(&self) -> &[u64] {
        &self.last_updated_plugins
    }

    fn active(&mut self) -> Result<&mut Transaction> {
        self.transaction.as_mut().ok_or_else(not_open)
    }

    fn take_transaction(&mut self) -> Result<Transaction> {
        self.transaction.take().ok_or_else(not_open)
    }
}

fn not_open() -> Error {
    Error::invalid_state("writer has no open transaction")
}

impl Drop for IndexWriter {
    fn drop(&mut self) {
        if let Some(mut transaction) = self.transaction.take() {
            transaction.abort();
            debug!(transaction = transaction.id, "writer dropped, rolled back");
        }
    }
}
