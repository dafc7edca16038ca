use std::path::{Path, PathBuf};
use std::fs;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

/// Directory structure of an index location
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Immutable segment files (.seg)
    pub meta_dir: PathBuf,      // Manifest location
}

impl StorageLayout {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        StorageLayout {
            segments_dir: base_dir.join("segments"),
            meta_dir: base_dir.join("meta"),
            base_dir,
        }
    }

    /// Creates the directories; the manifest is written separately.
    pub fn create_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.segments_dir)?;
        fs::create_dir_all(&self.meta_dir)?;
        Ok(())
    }

    pub fn segment_path(&self, id: &SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{}.seg", id.0))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.meta_dir.join("MANIFEST")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join("writer.lock")
    }

    /// An index exists once its manifest has been written.
    pub fn is_initialized(&self) -> bool {
        self.manifest_path().is_file()
    }
}
