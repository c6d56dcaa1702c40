//! Index file format definitions
//!
//! ```text
//! offset  size  field
//!      0     4  magic ("DVX1", little-endian u32)
//!      4     4  version
//!      8     1  metric code
//!      9     1  scalar code
//!     10     2  reserved
//!     12     4  dimensions
//!     16     4  connectivity
//!     20     4  expansion_add
//!     24     4  expansion_search
//!     28     4  reserved
//!     32     8  size (live entries)
//!     40     8  slots (stored vectors, live or tombstoned)
//!     48     8  capacity (slots to allocate on load)
//!     56     8  graph image length
//!     64     4  CRC32 of the vector section
//!     68     4  CRC32 of the graph image
//!     72     4  CRC32 of bytes 0..72
//!     76    52  reserved (zero)
//! ```
//!
//! The vector section (`slots * bytes_per_vector`) and the bincode graph image
//! follow the header back to back.

use crate::defaults::{INDEX_FILE_MAGIC, INDEX_FILE_VERSION, INDEX_HEADER_SIZE};
use crate::error::{IndexError, Result};
use crate::metric::{MetricKind, ScalarKind};
use serde::{Deserialize, Serialize};

const HEADER_CRC_OFFSET: usize = 72;

/// What an index file describes, readable without loading it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub version: u32,
    pub metric: MetricKind,
    pub scalar: ScalarKind,
    pub dimensions: usize,
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
    /// Live entries
    pub size: usize,
    /// Stored vectors, one per graph node
    pub slots: usize,
    /// Reserved slots, restored when the file is loaded
    pub capacity: usize,
}

impl IndexMetadata {
    /// Bytes of one stored vector
    pub fn bytes_per_vector(&self) -> usize {
        self.scalar.bytes_per_vector(self.dimensions)
    }

    /// Bytes of the vector section
    pub fn vectors_len(&self) -> Result<usize> {
        self.slots
            .checked_mul(self.bytes_per_vector())
            .ok_or_else(|| IndexError::corrupt("vector section size overflows"))
    }
}

/// Fixed-size header at the start of every index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub metadata: IndexMetadata,
    pub graph_len: u64,
    pub vectors_crc: u32,
    pub graph_crc: u32,
}

impl IndexHeader {
    pub fn to_bytes(&self) -> [u8; INDEX_HEADER_SIZE] {
        let meta = &self.metadata;
        let mut bytes = [0u8; INDEX_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&INDEX_FILE_MAGIC.to_le_bytes());
        bytes[4..8].copy_from_slice(&INDEX_FILE_VERSION.to_le_bytes());
        bytes[8] = meta.metric.code();
        bytes[9] = meta.scalar.code();
        bytes[12..16].copy_from_slice(&(meta.dimensions as u32).to_le_bytes());
        bytes[16..20].copy_from_slice(&(meta.connectivity as u32).to_le_bytes());
        bytes[20..24].copy_from_slice(&(meta.expansion_add as u32).to_le_bytes());
        bytes[24..28].copy_from_slice(&(meta.expansion_search as u32).to_le_bytes());
        bytes[32..40].copy_from_slice(&(meta.size as u64).to_le_bytes());
        bytes[40..48].copy_from_slice(&(meta.slots as u64).to_le_bytes());
        bytes[48..56].copy_from_slice(&(meta.capacity as u64).to_le_bytes());
        bytes[56..64].copy_from_slice(&self.graph_len.to_le_bytes());
        bytes[64..68].copy_from_slice(&self.vectors_crc.to_le_bytes());
        bytes[68..72].copy_from_slice(&self.graph_crc.to_le_bytes());

        let crc = crc32fast::hash(&bytes[..HEADER_CRC_OFFSET]);
        bytes[HEADER_CRC_OFFSET..HEADER_CRC_OFFSET + 4].copy_from_slice(&crc.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INDEX_HEADER_SIZE {
            return Err(IndexError::corrupt(format!(
                "header needs {} bytes, got {}",
                INDEX_HEADER_SIZE,
                bytes.len()
            )));
        }

        let magic = read_u32(bytes, 0)?;
        if magic != INDEX_FILE_MAGIC {
            return Err(IndexError::corrupt(format!("bad magic {:#010x}", magic)));
        }
        let version = read_u32(bytes, 4)?;
        if version != INDEX_FILE_VERSION {
            return Err(IndexError::corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }

        let stored_crc = read_u32(bytes, HEADER_CRC_OFFSET)?;
        let actual_crc = crc32fast::hash(&bytes[..HEADER_CRC_OFFSET]);
        if stored_crc != actual_crc {
            return Err(IndexError::corrupt("header checksum mismatch"));
        }

        let metric = MetricKind::from_code(bytes[8])
            .ok_or_else(|| IndexError::corrupt(format!("unknown metric code {}", bytes[8])))?;
        let scalar = ScalarKind::from_code(bytes[9])
            .ok_or_else(|| IndexError::corrupt(format!("unknown scalar code {}", bytes[9])))?;

        let metadata = IndexMetadata {
            version,
            metric,
            scalar,
            dimensions: read_u32(bytes, 12)? as usize,
            connectivity: read_u32(bytes, 16)? as usize,
            expansion_add: read_u32(bytes, 20)? as usize,
            expansion_search: read_u32(bytes, 24)? as usize,
            size: read_len(bytes, 32)?,
            slots: read_len(bytes, 40)?,
            capacity: read_len(bytes, 48)?,
        };

        if metadata.dimensions == 0 {
            return Err(IndexError::corrupt("zero dimensions"));
        }
        if metadata.size > metadata.slots {
            return Err(IndexError::corrupt(format!(
                "size {} exceeds {} stored slots",
                metadata.size, metadata.slots
            )));
        }
        if metadata.slots > metadata.capacity {
            return Err(IndexError::corrupt(format!(
                "{} stored slots exceed capacity {}",
                metadata.slots, metadata.capacity
            )));
        }

        Ok(Self {
            metadata,
            graph_len: read_u64(bytes, 56)?,
            vectors_crc: read_u32(bytes, 64)?,
            graph_crc: read_u32(bytes, 68)?,
        })
    }

    /// Total file length this header implies
    pub fn file_len(&self) -> Result<usize> {
        let graph_len = usize::try_from(self.graph_len)
            .map_err(|_| IndexError::corrupt("graph image too large"))?;
        self.metadata
            .vectors_len()?
            .checked_add(INDEX_HEADER_SIZE)
            .and_then(|len| len.checked_add(graph_len))
            .ok_or_else(|| IndexError::corrupt("file size overflows"))
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| IndexError::corrupt(format!("truncated header at {}", offset)))
}

fn read_u64(bytes: &[u8], offset: usize) -> Result<u64> {
    bytes
        .get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .ok_or_else(|| IndexError::corrupt(format!("truncated header at {}", offset)))
}

fn read_len(bytes: &[u8], offset: usize) -> Result<usize> {
    usize::try_from(read_u64(bytes, offset)?)
        .map_err(|_| IndexError::corrupt(format!("length at {} does not fit in memory", offset)))
}
