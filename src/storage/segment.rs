use chrono::{DateTime, Utc};
use uuid::Uuid;
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressionType;
use crate::core::types::{DocId, Document};
use crate::index::frame::{Frame, FrameAttribute};

/// Unique segment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub Uuid);

impl SegmentId {
    pub fn new() -> Self {
        SegmentId(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        SegmentId::new()
    }
}

/// Committed segment as listed in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub doc_count: u32,
    pub frame_count: u32,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub min_doc_id: DocId,
    pub max_doc_id: DocId,
}

/// Everything one commit adds to the index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentData {
    pub documents: Vec<Document>,
    pub frames: Vec<Frame>,
    pub attributes: Vec<FrameAttribute>,
}

impl SegmentData {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.frames.is_empty() && self.attributes.is_empty()
    }
}

/// Segment file header, stored length-prefixed after the magic bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,     // Format version
    pub doc_count: u32,
    pub frame_count: u32,
    pub raw_size: u64,    // Payload size before compression
    pub checksum: u32,    // CRC32 of the stored payload
    pub compression: CompressionType,
    pub created_at: DateTime<Utc>,
}

impl SegmentHeader {
    pub const VERSION: u32 = 2;
    pub const MAGIC: &'static [u8; 4] = b"FDXS";
}
