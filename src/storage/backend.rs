use std::fs;
use std::path::{Path, PathBuf};
use chrono::Utc;
use tracing::{debug, info, warn};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::schema::schema::Schema;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{self, Manifest};
use crate::storage::migration;
use crate::storage::segment::{SegmentData, SegmentId};
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;

/// Committed state as read by one read transaction, segments in commit order.
#[derive(Debug, Clone)]
pub struct StoredState {
    pub manifest: Manifest,
    pub segments: Vec<SegmentData>,
}

/// Durable transactional store behind writers and readers.
///
/// `commit` must be atomic: either the new manifest with its segment becomes
/// visible to later `load` calls, or the previous state stays untouched.
pub trait StorageBackend: Send + Sync {
    fn location(&self) -> &Path;

    /// Path of the writer lock for this location.
    fn lock_path(&self) -> PathBuf;

    fn exists(&self) -> bool;

    /// Makes the location able to hold a lock, without creating an index.
    fn prepare(&self) -> Result<()>;

    fn bootstrap(&self, schema: &Schema) -> Result<Manifest>;

    fn storage_version(&self) -> Result<u32>;

    fn migrate(&self) -> Result<u32>;

    fn load(&self) -> Result<StoredState>;

    /// Persists `data` as a new segment (when non-empty) and swaps in `next`.
    fn commit(&self, next: Manifest, data: SegmentData) -> Result<Manifest>;
}

/// Directory bundle: immutable segment files plus an atomically replaced manifest.
pub struct FileStorage {
    layout: StorageLayout,
    config: Config,
}

impl FileStorage {
    pub fn new(location: impl AsRef<Path>, config: Config) -> Self {
        FileStorage {
            layout: StorageLayout::new(location),
            config,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn not_found(&self) -> Error {
        Error::new(
            ErrorKind::IndexNotFound,
            format!("no index exists at {}", self.layout.base_dir.display()),
        )
    }
}

impl StorageBackend for FileStorage {
    fn location(&self) -> &Path {
        &self.layout.base_dir
    }

    fn lock_path(&self) -> PathBuf {
        self.layout.lock_path()
    }

    fn exists(&self) -> bool {
        self.layout.is_initialized()
    }

    fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.layout.base_dir)?;
        Ok(())
    }

    fn bootstrap(&self, schema: &Schema) -> Result<Manifest> {
        self.layout.create_dirs()?;
        let manifest = Manifest::empty(schema.clone());
        manifest.save(&self.layout, self.config.sync_on_commit)?;
        info!(location = %self.layout.base_dir.display(), fields = schema.fields.len(), "bootstrapped empty index");
        Ok(manifest)
    }

    fn storage_version(&self) -> Result<u32> {
        if !self.exists() {
            return Err(self.not_found());
        }
        manifest::read_version(&self.layout.manifest_path())
    }

    fn migrate(&self) -> Result<u32> {
        migration::migrate(&self.layout, &self.config)
    }

    fn load(&self) -> Result<StoredState> {
        if !self.exists() {
            return Err(self.not_found());
        }
        let manifest = Manifest::load(&self.layout)?;
        manifest.schema.check_format()?;

        let mut segments = Vec::with_capacity(manifest.segments.len());
        for segment in &manifest.segments {
            segments.push(SegmentReader::open(&self.layout, segment.id)?.read_data()?);
        }
        debug!(segments = segments.len(), revision = ?manifest.revision.as_tuple(), "loaded committed state");

        Ok(StoredState { manifest, segments })
    }

    fn commit(&self, mut next: Manifest, data: SegmentData) -> Result<Manifest> {
        let mut written = None;
        if !data.is_empty() {
            let segment = SegmentWriter::new(&self.layout, SegmentId::new(), self.config.compression)
                .sync(self.config.sync_on_commit)
                .write(&data)?;
            written = Some(segment.id);
            next.segments.push(segment);
        }
        next.committed_at = Utc::now();

        if let Err(err) = next.save(&self.layout, self.config.sync_on_commit) {
            if let Some(id) = written {
                if let Err(cleanup) = fs::remove_file(self.layout.segment_path(&id)) {
                    warn!(segment = %id.0, error = %cleanup, "could not remove orphaned segment");
                }
            }
            return Err(err);
        }
        Ok(next)
    }
}
