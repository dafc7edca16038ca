use std::fs;
use crc32fast::Hasher;
use crate::compression::compress::CompressedBlock;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentData, SegmentHeader, SegmentId};

pub struct SegmentReader {
    pub segment_id: SegmentId,
    pub header: SegmentHeader,
    payload: Vec<u8>,
}

impl SegmentReader {
    pub fn open(storage: &StorageLayout, segment_id: SegmentId) -> Result<Self> {
        let path = storage.segment_path(&segment_id);
        let mut bytes = fs::read(&path)?;

        let corrupted = |what: &str| {
            Error::new(ErrorKind::Corrupted, format!("segment {}: {}", segment_id.0, what))
        };

        if bytes.len() < 8 || &bytes[..4] != SegmentHeader::MAGIC {
            return Err(corrupted("bad magic"));
        }
        let header_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if bytes.len() < 8 + header_len {
            return Err(corrupted("truncated header"));
        }
        let header: SegmentHeader = bincode::deserialize(&bytes[8..8 + header_len])?;

        // Verify version
        if header.version != SegmentHeader::VERSION {
            return Err(corrupted(&format!("incompatible segment version {}", header.version)));
        }

        let payload = bytes.split_off(8 + header_len);
        let mut hasher = Hasher::new();
        hasher.update(&payload);
        if hasher.finalize() != header.checksum {
            return Err(corrupted("checksum mismatch"));
        }

        Ok(SegmentReader {
            segment_id,
            header,
            payload,
        })
    }

    pub fn read_data(self) -> Result<SegmentData> {
        let block = CompressedBlock {
            data: self.payload,
            original_size: self.header.raw_size as usize,
            compression: self.header.compression,
        };
        let raw = block.decompress()?;
        Ok(bincode::deserialize(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::compression::compress::CompressionType;
    use crate::core::types::{DocId, Document, FieldValue, FrameId};
    use crate::index::frame::Frame;
    use crate::storage::segment_writer::SegmentWriter;

    fn sample() -> SegmentData {
        let mut doc = Document::new(DocId(7));
        doc.fields.insert("body".into(), FieldValue::Text("white rabbit".into()));
        SegmentData {
            documents: vec![doc],
            frames: vec![Frame {
                id: FrameId(11),
                doc_id: DocId(7),
                field: "body".into(),
                sequence: 0,
                terms: vec![("white".into(), 0), ("rabbit".into(), 1)],
                text: Some("white rabbit".into()),
                attributes: BTreeMap::new(),
            }],
            attributes: Vec::new(),
        }
    }

    #[test]
    fn written_segment_reads_back_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.create_dirs().unwrap();

        let id = SegmentId::new();
        let segment = SegmentWriter::new(&layout, id, CompressionType::Zstd).write(&sample()).unwrap();
        assert_eq!(segment.doc_count, 1);
        assert_eq!(segment.metadata.min_doc_id, DocId(7));

        let reader = SegmentReader::open(&layout, id).unwrap();
        assert_eq!(reader.header.frame_count, 1);
        assert_eq!(reader.read_data().unwrap(), sample());
    }

    #[test]
    fn flipped_payload_byte_fails_the_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        layout.create_dirs().unwrap();

        let id = SegmentId::new();
        SegmentWriter::new(&layout, id, CompressionType::None).write(&sample()).unwrap();

        let path = layout.segment_path(&id);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = SegmentReader::open(&layout, id).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Corrupted);
    }
}
