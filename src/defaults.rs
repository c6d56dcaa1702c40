//! Centralized default values and constants
//!
//! This module consolidates the magic numbers used throughout the index,
//! making them easy to find, modify, and document.

// ============================================================================
// HNSW Graph Parameters
// ============================================================================

/// Default number of links per node on the upper graph levels (the "M" parameter).
/// Layer 0 allows twice as many.
pub const DEFAULT_CONNECTIVITY: usize = 16;

/// Default candidate list size while inserting (efConstruction).
/// Higher values improve graph quality but slow down inserts.
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// Default candidate list size while querying (ef).
/// Higher values improve recall but slow down queries.
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// Smallest connectivity that yields a usable level distribution (1/ln(M) must be finite)
pub const MIN_CONNECTIVITY: usize = 2;

/// Hard cap on the number of graph levels
pub const MAX_LEVELS: usize = 16;

// ============================================================================
// Index File Constants
// ============================================================================

/// Index file magic number ("DVX1" in big-endian ASCII)
pub const INDEX_FILE_MAGIC: u32 = 0x44565831;

/// Current index file format version
pub const INDEX_FILE_VERSION: u32 = 1;

/// Index file header size in bytes
pub const INDEX_HEADER_SIZE: usize = 128;

// ============================================================================
// Environment
// ============================================================================

/// Prefix for environment variables read by `IndexOptions::from_env`
pub const ENV_PREFIX: &str = "VORTEX_DENSE_";
