//! Result types returned by index operations

use crate::error::{IndexError, Result};

/// Search results, closest first
///
/// `keys` and `distances` are parallel; `count` equals their length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matches {
    pub keys: Vec<u64>,
    pub distances: Vec<f32>,
    pub count: usize,
}

impl Matches {
    pub(crate) fn with_capacity(k: usize) -> Self {
        Self {
            keys: Vec::with_capacity(k),
            distances: Vec::with_capacity(k),
            count: 0,
        }
    }

    pub(crate) fn push(&mut self, key: u64, distance: f32) {
        self.keys.push(key);
        self.distances.push(distance);
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `(key, distance)` pairs, closest first
    pub fn iter(&self) -> impl Iterator<Item = (u64, f32)> + '_ {
        self.keys.iter().copied().zip(self.distances.iter().copied())
    }
}

/// Outcome of a best-effort batch insert
///
/// A batch keeps going past failing elements; `last_error` holds the most
/// recent failure.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub added: usize,
    pub failed: usize,
    pub last_error: Option<IndexError>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }

    /// Number of added entries, or the last error if any element failed
    pub fn into_result(self) -> Result<usize> {
        match self.last_error {
            Some(err) => Err(err),
            None => Ok(self.added),
        }
    }
}
