use std::fs::{self, OpenOptions};
use std::io::Write;
use chrono::Utc;
use crc32fast::Hasher;
use tracing::debug;
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{Segment, SegmentData, SegmentHeader, SegmentId, SegmentMetadata};

pub struct SegmentWriter<'a> {
    pub layout: &'a StorageLayout,
    pub segment_id: SegmentId,
    pub compression: CompressionType,
    pub sync: bool,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(layout: &'a StorageLayout, segment_id: SegmentId, compression: CompressionType) -> Self {
        SegmentWriter {
            layout,
            segment_id,
            compression,
            sync: true,
        }
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    // [ MAGIC "FDXS" ]
    // [ HEADER LEN (u32 LE) ][ HEADER (bincode) ]
    // [ PAYLOAD (compressed bincode SegmentData) ]
    pub fn write(self, data: &SegmentData) -> Result<Segment> {
        let raw = bincode::serialize(data)?;
        let block = CompressedBlock::compress(&raw, self.compression)?;

        let mut hasher = Hasher::new();
        hasher.update(&block.data);

        let created_at = Utc::now();
        let header = SegmentHeader {
            version: SegmentHeader::VERSION,
            doc_count: data.documents.len() as u32,
            frame_count: data.frames.len() as u32,
            raw_size: raw.len() as u64,
            checksum: hasher.finalize(),
            compression: self.compression,
            created_at,
        };
        let header_data = bincode::serialize(&header)?;

        let path = self.layout.segment_path(&self.segment_id);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        let written = (|| -> Result<()> {
            file.write_all(SegmentHeader::MAGIC)?;
            file.write_all(&(header_data.len() as u32).to_le_bytes())?;
            file.write_all(&header_data)?;
            file.write_all(&block.data)?;
            if self.sync {
                file.sync_all()?;
            }
            Ok(())
        })();
        if let Err(err) = written {
            let _ = fs::remove_file(&path);
            return Err(err);
        }

        let size_bytes = file.metadata()?.len();
        debug!(
            segment = %self.segment_id.0,
            documents = header.doc_count,
            frames = header.frame_count,
            size_bytes,
            "segment written"
        );

        Ok(Segment {
            id: self.segment_id,
            doc_count: header.doc_count,
            frame_count: header.frame_count,
            metadata: SegmentMetadata {
                created_at,
                size_bytes,
                min_doc_id: data.documents.iter().map(|d| d.id).min().unwrap_or(DocId(0)),
                max_doc_id: data.documents.iter().map(|d| d.id).max().unwrap_or(DocId(0)),
            },
        })
    }
}
