use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Revision};
use crate::schema::plugins::PluginRegistry;
use crate::schema::schema::Schema;
use crate::schema::settings::Settings;
use crate::storage::layout::StorageLayout;
use crate::storage::migration::CURRENT_SCHEMA;
use crate::storage::segment::Segment;

const MAGIC: &[u8; 4] = b"FDXM";

/// Committed state of an index: the single record swapped on every commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub segments: Vec<Segment>,
    pub deleted_documents: BTreeSet<DocId>,
    pub next_doc_id: u64,
    pub next_frame_id: u64,
    pub revision: Revision,
    pub schema: Schema,
    pub settings: Settings,
    pub plugins: PluginRegistry,
    pub committed_at: DateTime<Utc>,
}

impl Manifest {
    pub fn empty(schema: Schema) -> Self {
        Manifest {
            segments: Vec::new(),
            deleted_documents: BTreeSet::new(),
            next_doc_id: 1,
            next_frame_id: 1,
            revision: Revision::default(),
            schema,
            settings: Settings::new(),
            plugins: PluginRegistry::new(),
            committed_at: Utc::now(),
        }
    }

    pub fn load(storage: &StorageLayout) -> Result<Self> {
        read_payload(&storage.manifest_path(), CURRENT_SCHEMA)
    }

    pub fn save(&self, storage: &StorageLayout, sync: bool) -> Result<()> {
        write_payload(storage, CURRENT_SCHEMA, self, sync)
    }
}

/// Storage version recorded in the manifest header.
pub fn read_version(path: &Path) -> Result<u32> {
    let bytes = fs::read(path)?;
    parse_header(path, &bytes)
}

fn parse_header(path: &Path, bytes: &[u8]) -> Result<u32> {
    if bytes.len() < 8 || &bytes[..4] != MAGIC {
        return Err(Error::new(
            ErrorKind::Corrupted,
            format!("{} is not an index manifest", path.display()),
        ));
    }
    Ok(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]))
}

/// Reads a manifest payload written at `version`.
pub fn read_payload<T: DeserializeOwned>(path: &Path, version: u32) -> Result<T> {
    let bytes = fs::read(path)?;
    let found = parse_header(path, &bytes)?;
    if found != version {
        return Err(Error::new(
            ErrorKind::SchemaMismatch,
            format!("manifest has storage version {}, expected {}", found, version),
        ));
    }
    Ok(bincode::deserialize(&bytes[8..])?)
}

/// Atomically replaces the manifest: temp file in the same directory, then rename.
pub fn write_payload<T: Serialize>(storage: &StorageLayout, version: u32, payload: &T, sync: bool) -> Result<()> {
    let mut bytes = Vec::with_capacity(1024);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&version.to_le_bytes());
    bincode::serialize_into(&mut bytes, payload)?;

    let mut temp = NamedTempFile::new_in(&storage.meta_dir)?;
    temp.write_all(&bytes)?;
    if sync {
        temp.as_file().sync_all()?;
    }
    temp.persist(storage.manifest_path())?;

    if sync {
        sync_dir(&storage.meta_dir)?;
    }
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::schema::FieldType;

    #[test]
    fn manifest_survives_replacement() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.create_dirs().unwrap();

        let mut manifest = Manifest::empty(Schema::new().field("body", FieldType::text()));
        manifest.save(&layout, true).unwrap();
        assert_eq!(read_version(&layout.manifest_path()).unwrap(), CURRENT_SCHEMA);

        manifest.revision = Revision::new(1, 1, 0, 4);
        manifest.next_doc_id = 2;
        manifest.save(&layout, false).unwrap();

        let loaded = Manifest::load(&layout).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(fs::read_dir(&layout.meta_dir).unwrap().count(), 1);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.create_dirs().unwrap();
        fs::write(layout.manifest_path(), b"not a manifest").unwrap();

        let err = Manifest::load(&layout).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupted);
    }
}
