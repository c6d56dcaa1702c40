//! Owned heap storage

use super::VectorStorage;
use crate::error::{IndexError, Result};

/// Growable in-memory vector storage
pub struct HeapStorage {
    data: Vec<u8>,
    slot_bytes: usize,
}

impl HeapStorage {
    /// Create empty storage for slots of `slot_bytes` bytes
    pub fn new(slot_bytes: usize) -> Self {
        Self {
            data: Vec::new(),
            slot_bytes,
        }
    }

    /// Create storage with `slots` zeroed slots
    pub fn with_capacity(slot_bytes: usize, slots: usize) -> Result<Self> {
        let mut storage = Self::new(slot_bytes);
        storage.allocate(slots)?;
        Ok(storage)
    }

    /// Take ownership of `bytes`, which must hold a whole number of slots
    pub fn from_bytes(slot_bytes: usize, bytes: Vec<u8>) -> Result<Self> {
        if slot_bytes == 0 || bytes.len() % slot_bytes != 0 {
            return Err(IndexError::invalid_argument(format!(
                "{} bytes do not divide into slots of {} bytes",
                bytes.len(),
                slot_bytes
            )));
        }
        Ok(Self {
            data: bytes,
            slot_bytes,
        })
    }

    /// Copy the first `slots` slots of another backend, reserving room for `capacity`
    pub fn copy_from(other: &dyn VectorStorage, slots: usize, capacity: usize) -> Result<Self> {
        let mut storage = Self::with_capacity(other.slot_bytes(), capacity.max(slots))?;
        let used = slots * other.slot_bytes();
        storage.data[..used].copy_from_slice(other.as_bytes(slots));
        Ok(storage)
    }

    fn range(&self, slot: usize) -> std::ops::Range<usize> {
        let start = slot * self.slot_bytes;
        start..start + self.slot_bytes
    }
}

impl VectorStorage for HeapStorage {
    fn slot_bytes(&self) -> usize {
        self.slot_bytes
    }

    fn capacity(&self) -> usize {
        if self.slot_bytes == 0 {
            0
        } else {
            self.data.len() / self.slot_bytes
        }
    }

    fn allocate(&mut self, slots: usize) -> Result<()> {
        if slots <= self.capacity() {
            return Ok(());
        }

        let new_len = slots
            .checked_mul(self.slot_bytes)
            .ok_or(IndexError::OutOfMemory {
                requested_bytes: usize::MAX,
            })?;
        let additional = new_len - self.data.len();
        self.data
            .try_reserve_exact(additional)
            .map_err(IndexError::out_of_memory(additional))?;
        self.data.resize(new_len, 0);
        Ok(())
    }

    fn read(&self, slot: usize) -> &[u8] {
        &self.data[self.range(slot)]
    }

    fn write(&mut self, slot: usize, bytes: &[u8]) -> Result<()> {
        if slot >= self.capacity() {
            return Err(IndexError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        if bytes.len() != self.slot_bytes {
            return Err(IndexError::invalid_argument(format!(
                "slot holds {} bytes, got {}",
                self.slot_bytes,
                bytes.len()
            )));
        }
        let range = self.range(slot);
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn memory_usage(&self) -> usize {
        self.data.capacity()
    }

    fn as_bytes(&self, slots: usize) -> &[u8] {
        &self.data[..slots * self.slot_bytes]
    }
}
