//! Memory-mapped storage over the vector section of an index file
//!
//! Pages are faulted in lazily by the OS. The mapping stays valid only while the
//! backing file keeps its length: truncating or replacing the file in place from
//! another process is undefined behavior and is not detected here.

use super::VectorStorage;
use crate::error::{IndexError, Result};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::path::Path;

/// Read-only vector storage backed by a file mapping
pub struct MappedStorage {
    mmap: Mmap,
    offset: usize,
    slot_bytes: usize,
    slots: usize,
}

impl MappedStorage {
    /// Map the whole file at `path` read-only
    pub fn map_file(path: &Path) -> Result<Mmap> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(IndexError::corrupt(format!("{} is empty", path.display())));
        }
        // SAFETY: the mapping is read-only; external truncation is documented as
        // outside the supported contract.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(mmap)
    }

    /// Expose `slots` slots of `slot_bytes` each, starting `offset` bytes into `mmap`
    pub fn new(mmap: Mmap, offset: usize, slot_bytes: usize, slots: usize) -> Result<Self> {
        let end = slots
            .checked_mul(slot_bytes)
            .and_then(|len| len.checked_add(offset))
            .ok_or_else(|| IndexError::corrupt("vector section size overflows"))?;
        if end > mmap.len() {
            return Err(IndexError::corrupt(format!(
                "vector section needs {} bytes, file has {}",
                end,
                mmap.len()
            )));
        }

        Ok(Self {
            mmap,
            offset,
            slot_bytes,
            slots,
        })
    }
}

impl VectorStorage for MappedStorage {
    fn slot_bytes(&self) -> usize {
        self.slot_bytes
    }

    fn capacity(&self) -> usize {
        self.slots
    }

    fn allocate(&mut self, slots: usize) -> Result<()> {
        if slots <= self.slots {
            Ok(())
        } else {
            Err(IndexError::ReadOnlyView)
        }
    }

    fn read(&self, slot: usize) -> &[u8] {
        assert!(slot < self.slots, "slot {} out of {}", slot, self.slots);
        let start = self.offset + slot * self.slot_bytes;
        &self.mmap[start..start + self.slot_bytes]
    }

    fn write(&mut self, _slot: usize, _bytes: &[u8]) -> Result<()> {
        Err(IndexError::ReadOnlyView)
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn memory_usage(&self) -> usize {
        0
    }

    fn as_bytes(&self, slots: usize) -> &[u8] {
        let slots = slots.min(self.slots);
        &self.mmap[self.offset..self.offset + slots * self.slot_bytes]
    }
}
