//! Index file persistence
//!
//! Save writes a header, the vectors of every graph node and the graph image
//! into a temporary file next to the destination, then renames it into place.
//! Spare capacity is recorded in the header, not written. Load copies the file
//! into owned memory and re-reserves that capacity; view maps it and reads
//! vectors in place.

pub mod format;

pub use format::{IndexHeader, IndexMetadata};

use crate::defaults::INDEX_HEADER_SIZE;
use crate::error::{IndexError, Result};
use crate::hnsw::persistence::{decode_graph, encode_graph};
use crate::hnsw::HnswGraph;
use crate::storage::{HeapStorage, MappedStorage, VectorStorage};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Storage and graph decoded from an index file
pub struct IndexImage {
    pub metadata: IndexMetadata,
    pub storage: Box<dyn VectorStorage>,
    pub graph: HnswGraph,
}

/// Write an index file at `path`, returning the number of bytes written
pub fn save(
    path: &Path,
    metadata: IndexMetadata,
    storage: &dyn VectorStorage,
    graph: &HnswGraph,
) -> Result<u64> {
    let vectors = storage.as_bytes(metadata.slots);
    let graph_bytes = encode_graph(graph)?;

    let header = IndexHeader {
        metadata,
        graph_len: graph_bytes.len() as u64,
        vectors_crc: crc32fast::hash(vectors),
        graph_crc: crc32fast::hash(&graph_bytes),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        writer.write_all(&header.to_bytes())?;
        writer.write_all(vectors)?;
        writer.write_all(&graph_bytes)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    let written = header.file_len()? as u64;
    tracing::info!(
        path = %path.display(),
        size = metadata.size,
        bytes = written,
        "Saved index"
    );
    Ok(written)
}

/// Read only the header of the index file at `path`
pub fn read_metadata(path: &Path) -> Result<IndexMetadata> {
    let mut file = File::open(path)?;
    let mut bytes = [0u8; INDEX_HEADER_SIZE];
    file.read_exact(&mut bytes).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            IndexError::corrupt(format!("{} is shorter than a header", path.display()))
        }
        _ => IndexError::Io(e),
    })?;
    Ok(IndexHeader::from_bytes(&bytes)?.metadata)
}

/// Copy the whole index file at `path` into memory, verifying every checksum
pub fn load(path: &Path) -> Result<IndexImage> {
    let bytes = std::fs::read(path)?;
    let header = IndexHeader::from_bytes(&bytes)?;
    check_len(&header, bytes.len())?;

    let vectors_len = header.metadata.vectors_len()?;
    let vectors = &bytes[INDEX_HEADER_SIZE..INDEX_HEADER_SIZE + vectors_len];
    if crc32fast::hash(vectors) != header.vectors_crc {
        return Err(IndexError::corrupt("vector section checksum mismatch"));
    }

    let graph = read_graph(&header, &bytes[INDEX_HEADER_SIZE + vectors_len..])?;

    let metadata = header.metadata;
    let reserved_len = metadata
        .capacity
        .checked_mul(metadata.bytes_per_vector())
        .ok_or_else(|| IndexError::corrupt("capacity overflows"))?;
    let mut owned = Vec::new();
    owned
        .try_reserve_exact(reserved_len)
        .map_err(IndexError::out_of_memory(reserved_len))?;
    owned.extend_from_slice(vectors);
    let mut storage = HeapStorage::from_bytes(metadata.bytes_per_vector(), owned)?;
    storage.allocate(metadata.capacity)?;

    tracing::info!(
        path = %path.display(),
        size = header.metadata.size,
        bytes = bytes.len(),
        "Loaded index"
    );
    Ok(IndexImage {
        metadata: header.metadata,
        storage: Box::new(storage),
        graph,
    })
}

/// Map the index file at `path` read-only
///
/// The vector section is not checksummed here, since that would fault in
/// every page of it.
pub fn view(path: &Path) -> Result<IndexImage> {
    let mmap = MappedStorage::map_file(path)?;
    let header = IndexHeader::from_bytes(&mmap)?;
    check_len(&header, mmap.len())?;

    let vectors_len = header.metadata.vectors_len()?;
    let graph = read_graph(&header, &mmap[INDEX_HEADER_SIZE + vectors_len..])?;

    let mapped_len = mmap.len();
    let storage = MappedStorage::new(
        mmap,
        INDEX_HEADER_SIZE,
        header.metadata.bytes_per_vector(),
        header.metadata.slots,
    )?;

    tracing::info!(
        path = %path.display(),
        size = header.metadata.size,
        bytes = mapped_len,
        "Viewing index"
    );
    Ok(IndexImage {
        metadata: header.metadata,
        storage: Box::new(storage),
        graph,
    })
}

fn check_len(header: &IndexHeader, actual: usize) -> Result<()> {
    let expected = header.file_len()?;
    if expected != actual {
        return Err(IndexError::corrupt(format!(
            "expected {} bytes, file has {}",
            expected, actual
        )));
    }
    Ok(())
}

fn read_graph(header: &IndexHeader, bytes: &[u8]) -> Result<HnswGraph> {
    if crc32fast::hash(bytes) != header.graph_crc {
        return Err(IndexError::corrupt("graph checksum mismatch"));
    }
    // Every node owns a stored slot
    let graph = decode_graph(bytes, header.metadata.slots)?;
    if graph.len() != header.metadata.slots {
        return Err(IndexError::corrupt(format!(
            "graph holds {} nodes, header says {} slots",
            graph.len(),
            header.metadata.slots
        )));
    }
    let live = graph.len() - graph.tombstones();
    if live != header.metadata.size {
        return Err(IndexError::corrupt(format!(
            "graph holds {} live entries, header says {}",
            live, header.metadata.size
        )));
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{MetricKind, ScalarKind};

    fn metadata(size: usize, slots: usize, capacity: usize) -> IndexMetadata {
        IndexMetadata {
            version: crate::defaults::INDEX_FILE_VERSION,
            metric: MetricKind::L2sq,
            scalar: ScalarKind::F32,
            dimensions: 2,
            connectivity: 4,
            expansion_add: 16,
            expansion_search: 8,
            size,
            slots,
            capacity,
        }
    }

    #[test]
    fn test_empty_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.dvx");
        let storage = HeapStorage::new(8);

        let written = save(&path, metadata(0, 0, 0), &storage, &HnswGraph::new(4)).unwrap();
        assert_eq!(written, std::fs::metadata(&path).unwrap().len());

        let image = load(&path).unwrap();
        assert_eq!(image.metadata, metadata(0, 0, 0));
        assert!(image.graph.is_empty());

        let viewed = view(&path).unwrap();
        assert!(!viewed.storage.is_writable());
        assert_eq!(read_metadata(&path).unwrap(), metadata(0, 0, 0));
    }

    #[test]
    fn test_missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.dvx");
        assert!(matches!(load(&path), Err(IndexError::Io(_))));
        assert!(matches!(view(&path), Err(IndexError::Io(_))));
        assert!(matches!(read_metadata(&path), Err(IndexError::Io(_))));
    }

    #[test]
    fn test_short_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dvx");
        std::fs::write(&path, b"DVX1").unwrap();
        assert!(matches!(load(&path), Err(IndexError::CorruptFile(_))));
        assert!(matches!(read_metadata(&path), Err(IndexError::CorruptFile(_))));
    }
}
