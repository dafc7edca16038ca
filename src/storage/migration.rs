//! Forward migration of on-disk storage versions.
//!
//! Version history:
//! 1. Segments are bare bincode payloads; the manifest keeps a single commit counter.
//! 2. The manifest carries the full revision vector.
//! 3. Segments gain a checksummed, compressed header and the manifest lists segment metadata.
//! 4. The manifest stores plugin state next to the settings.
//!
//! Each step rewrites what it needs and persists the next version as its last action,
//! so a failed step leaves the index at the previous version and a retry resumes there.

use std::collections::BTreeSet;
use std::fs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use crate::core::config::Config;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, Revision};
use crate::schema::plugins::PluginRegistry;
use crate::schema::schema::Schema;
use crate::schema::settings::Settings;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{self, Manifest};
use crate::storage::segment::{Segment, SegmentData, SegmentId};
use crate::storage::segment_writer::SegmentWriter;

/// Storage version written by this build.
pub const CURRENT_SCHEMA: u32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestV1 {
    segments: Vec<SegmentId>,
    deleted_documents: BTreeSet<DocId>,
    next_doc_id: u64,
    next_frame_id: u64,
    commits: u64,
    schema: Schema,
    settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestV2 {
    segments: Vec<SegmentId>,
    deleted_documents: BTreeSet<DocId>,
    next_doc_id: u64,
    next_frame_id: u64,
    revision: Revision,
    schema: Schema,
    settings: Settings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestV3 {
    segments: Vec<Segment>,
    deleted_documents: BTreeSet<DocId>,
    next_doc_id: u64,
    next_frame_id: u64,
    revision: Revision,
    schema: Schema,
    settings: Settings,
    committed_at: DateTime<Utc>,
}

type Step = fn(&StorageLayout, &Config) -> Result<()>;

const STEPS: [(u32, Step); 3] = [
    (1, migrate_v1_to_v2),
    (2, migrate_v2_to_v3),
    (3, migrate_v3_to_v4),
];

/// Runs every step from the persisted version up to `CURRENT_SCHEMA`.
/// The caller must hold the writer lock.
pub fn migrate(layout: &StorageLayout, config: &Config) -> Result<u32> {
    let mut version = manifest::read_version(&layout.manifest_path())?;
    if version > CURRENT_SCHEMA {
        return Err(newer_version(version));
    }

    while version < CURRENT_SCHEMA {
        let (_, step) = STEPS
            .iter()
            .find(|(from, _)| *from == version)
            .ok_or_else(|| Error::new(ErrorKind::Migration, format!("no migration from storage version {}", version)))?;

        info!(from = version, to = version + 1, location = %layout.base_dir.display(), "running migration step");
        step(layout, config).map_err(|err| {
            Error::new(
                ErrorKind::Migration,
                format!("migrating storage version {} to {} failed: {}", version, version + 1, err),
            )
        })?;

        version = manifest::read_version(&layout.manifest_path())?;
    }

    Ok(version)
}

/// Fails unless the persisted version can be opened, either as is or after migrating.
pub fn check_version(version: u32, auto_migrate: bool) -> Result<bool> {
    if version == CURRENT_SCHEMA {
        return Ok(false);
    }
    if version > CURRENT_SCHEMA {
        return Err(newer_version(version));
    }
    if !auto_migrate {
        return Err(Error::new(
            ErrorKind::SchemaMismatch,
            format!("storage version {} requires migration to {} and auto migration is disabled", version, CURRENT_SCHEMA),
        ));
    }
    Ok(true)
}

fn newer_version(version: u32) -> Error {
    Error::new(
        ErrorKind::SchemaMismatch,
        format!("storage version {} is newer than supported version {}", version, CURRENT_SCHEMA),
    )
}

fn migrate_v1_to_v2(layout: &StorageLayout, config: &Config) -> Result<()> {
    let old: ManifestV1 = manifest::read_payload(&layout.manifest_path(), 1)?;

    // Version 1 wrote one segment per adding commit.
    let add_commits = old.segments.len() as u64;
    let delete_commits = old.commits.saturating_sub(add_commits);
    let revision = Revision::new(
        add_commits + delete_commits,
        add_commits,
        delete_commits,
        old.next_frame_id.saturating_sub(1),
    );

    let new = ManifestV2 {
        segments: old.segments,
        deleted_documents: old.deleted_documents,
        next_doc_id: old.next_doc_id,
        next_frame_id: old.next_frame_id,
        revision,
        schema: old.schema,
        settings: old.settings,
    };
    manifest::write_payload(layout, 2, &new, config.sync_on_commit)
}

fn migrate_v2_to_v3(layout: &StorageLayout, config: &Config) -> Result<()> {
    let old: ManifestV2 = manifest::read_payload(&layout.manifest_path(), 2)?;

    let mut rewritten: Vec<Segment> = Vec::with_capacity(old.segments.len());
    let result = (|| -> Result<()> {
        for legacy_id in &old.segments {
            let bytes = fs::read(layout.segment_path(legacy_id))?;
            let data: SegmentData = bincode::deserialize(&bytes)?;
            let segment = SegmentWriter::new(layout, SegmentId::new(), config.compression)
                .sync(config.sync_on_commit)
                .write(&data)?;
            rewritten.push(segment);
        }

        let new = ManifestV3 {
            segments: rewritten.clone(),
            deleted_documents: old.deleted_documents.clone(),
            next_doc_id: old.next_doc_id,
            next_frame_id: old.next_frame_id,
            revision: old.revision,
            schema: old.schema.clone(),
            settings: old.settings.clone(),
            committed_at: Utc::now(),
        };
        manifest::write_payload(layout, 3, &new, config.sync_on_commit)
    })();

    if let Err(err) = result {
        for segment in &rewritten {
            let _ = fs::remove_file(layout.segment_path(&segment.id));
        }
        return Err(err);
    }

    for legacy_id in &old.segments {
        if let Err(err) = fs::remove_file(layout.segment_path(legacy_id)) {
            warn!(segment = %legacy_id.0, error = %err, "could not remove migrated legacy segment");
        }
    }
    Ok(())
}

fn migrate_v3_to_v4(layout: &StorageLayout, config: &Config) -> Result<()> {
    let old: ManifestV3 = manifest::read_payload(&layout.manifest_path(), 3)?;

    let new = Manifest {
        segments: old.segments,
        deleted_documents: old.deleted_documents,
        next_doc_id: old.next_doc_id,
        next_frame_id: old.next_frame_id,
        revision: old.revision,
        schema: old.schema,
        settings: old.settings,
        plugins: PluginRegistry::new(),
        committed_at: old.committed_at,
    };
    new.save(layout, config.sync_on_commit)
}

/// Writes a version 1 index: one bare segment per entry of `commits_data`.
#[cfg(test)]
pub(crate) fn write_v1_fixture(
    layout: &StorageLayout,
    schema: Schema,
    commits_data: Vec<SegmentData>,
    deleted: &[DocId],
    delete_commits: u64,
) -> Vec<SegmentId> {
    layout.create_dirs().unwrap();

    let mut segments = Vec::new();
    let mut next_doc_id = 1;
    let mut next_frame_id = 1;
    for data in &commits_data {
        let id = SegmentId::new();
        fs::write(layout.segment_path(&id), bincode::serialize(data).unwrap()).unwrap();
        segments.push(id);
        for doc in &data.documents {
            next_doc_id = next_doc_id.max(doc.id.0 + 1);
        }
        for frame in &data.frames {
            next_frame_id = next_frame_id.max(frame.id.0 + 1);
        }
    }

    let v1 = ManifestV1 {
        segments: segments.clone(),
        deleted_documents: deleted.iter().copied().collect(),
        next_doc_id,
        next_frame_id,
        commits: commits_data.len() as u64 + delete_commits,
        schema,
        settings: Settings::new(),
    };
    manifest::write_payload(layout, 1, &v1, false).unwrap();
    segments
}
