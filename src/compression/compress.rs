use crate::core::error::{Error, ErrorKind, Result};
use serde::{Serialize, Deserialize};

/// Compressed block storage for segment payloads
#[derive(Debug, Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,      // Fast, used for freshly committed segments
    Zstd,     // Better ratio, slower
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),
            CompressionType::Lz4 => lz4_flex::block::compress(data),
            CompressionType::Zstd => zstd::encode_all(data, 3)?,  // Level 3 is balanced
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let raw = match self.compression {
            CompressionType::None => self.data.clone(),

            CompressionType::Lz4 => {
                lz4_flex::block::decompress(&self.data, self.original_size)
                    .map_err(|e| Error::new(ErrorKind::Corrupted, e.to_string()))?
            }

            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::new(ErrorKind::Corrupted, e.to_string()))?
            }
        };

        if raw.len() != self.original_size {
            return Err(Error::new(
                ErrorKind::Corrupted,
                format!("expected {} bytes after decompression, got {}", self.original_size, raw.len()),
            ));
        }
        Ok(raw)
    }
}
