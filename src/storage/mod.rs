//! Vector storage abstraction
//!
//! The graph refers to vectors by slot number; a storage backend maps slots to
//! encoded vector bytes. Two backends exist:
//!
//! - [`HeapStorage`]: owned, growable buffer (constructed and loaded indexes)
//! - [`MappedStorage`]: read-only memory map of the vector section of an index
//!   file (viewed indexes)

pub mod heap;
pub mod mmap;

pub use heap::HeapStorage;
pub use mmap::MappedStorage;

use crate::error::Result;

/// Slot-addressed storage for encoded vectors
///
/// Slots are fixed size (`slot_bytes`) and contiguous, so the first `n` slots can
/// be exported as one byte run when persisting.
pub trait VectorStorage: Send + Sync {
    /// Size of one slot in bytes
    fn slot_bytes(&self) -> usize;

    /// Number of slots currently backed
    fn capacity(&self) -> usize;

    /// Grow to at least `slots` slots, preserving contents. Never shrinks.
    fn allocate(&mut self, slots: usize) -> Result<()>;

    /// Encoded vector at `slot`. Panics if `slot >= capacity()`.
    fn read(&self, slot: usize) -> &[u8];

    /// Overwrite the vector at `slot`
    fn write(&mut self, slot: usize, bytes: &[u8]) -> Result<()>;

    /// Whether `allocate` and `write` are supported
    fn is_writable(&self) -> bool;

    /// Bytes of process heap owned by this backend
    fn memory_usage(&self) -> usize;

    /// The first `slots` slots as one contiguous run
    fn as_bytes(&self, slots: usize) -> &[u8];
}
