//! Distance metrics
//!
//! A metric is selected by name and scalar encoding, and resolved once into a
//! plain function pointer so the search hot path never dispatches on strings.
//!
//! ```
//! use vortex_dense::metric::{Metric, MetricKind, ScalarKind};
//!
//! let metric = Metric::from_names("l2sq", "f32", 2).unwrap();
//! assert_eq!(metric.kind(), MetricKind::L2sq);
//! assert_eq!(metric.scalar(), ScalarKind::F32);
//! assert_eq!(metric.distance_f32(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
//! ```

mod kernels;
pub mod scalar;

pub use scalar::ScalarKind;

use crate::error::{IndexError, Result};
use kernels::Kernel;
use scalar::{B1Lanes, F16Lanes, F32Lanes, F64Lanes, I8Lanes};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance between two encoded vectors of `dims` components
pub type DistanceFn = fn(&[u8], &[u8], usize) -> f32;

/// Supported distance functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MetricKind {
    /// `1 - a·b`
    #[default]
    #[serde(rename = "ip")]
    InnerProduct,
    /// Squared Euclidean distance
    #[serde(rename = "l2sq")]
    L2sq,
    /// `1 - cos(a, b)`
    #[serde(rename = "cos")]
    Cosine,
    /// `1 - pearson(a, b)`
    #[serde(rename = "pearson")]
    Pearson,
    /// Great-circle angle between (lat, lon) pairs in radians
    #[serde(rename = "haversine")]
    Haversine,
    /// Number of differing bits
    #[serde(rename = "hamming")]
    Hamming,
    /// `1 - |a∧b| / |a∨b|`
    #[serde(rename = "tanimoto")]
    Tanimoto,
    /// `1 - 2|a∧b| / (|a| + |b|)`
    #[serde(rename = "sorensen")]
    Sorensen,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::InnerProduct,
        MetricKind::L2sq,
        MetricKind::Cosine,
        MetricKind::Pearson,
        MetricKind::Haversine,
        MetricKind::Hamming,
        MetricKind::Tanimoto,
        MetricKind::Sorensen,
    ];

    /// Canonical name, as accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::InnerProduct => "ip",
            MetricKind::L2sq => "l2sq",
            MetricKind::Cosine => "cos",
            MetricKind::Pearson => "pearson",
            MetricKind::Haversine => "haversine",
            MetricKind::Hamming => "hamming",
            MetricKind::Tanimoto => "tanimoto",
            MetricKind::Sorensen => "sorensen",
        }
    }

    /// Stable on-disk tag
    pub(crate) fn code(&self) -> u8 {
        match self {
            MetricKind::InnerProduct => 1,
            MetricKind::L2sq => 2,
            MetricKind::Cosine => 3,
            MetricKind::Pearson => 4,
            MetricKind::Haversine => 5,
            MetricKind::Hamming => 6,
            MetricKind::Tanimoto => 7,
            MetricKind::Sorensen => 8,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = IndexError;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| IndexError::UnknownMetric(name.to_string()))
    }
}

/// A metric resolved for one dimensionality and scalar encoding
#[derive(Clone, Copy)]
pub struct Metric {
    kind: MetricKind,
    scalar: ScalarKind,
    dimensions: usize,
    bytes_per_vector: usize,
    distance: DistanceFn,
}

impl Metric {
    /// Resolve the distance function for `kind` over `scalar`-encoded vectors
    pub fn new(kind: MetricKind, scalar: ScalarKind, dimensions: usize) -> Self {
        Self {
            kind,
            scalar,
            dimensions,
            bytes_per_vector: scalar.bytes_per_vector(dimensions),
            distance: resolve(kind, scalar),
        }
    }

    /// Resolve from names; fails with `UnknownMetric` / `UnknownScalarKind`
    pub fn from_names(metric: &str, scalar: &str, dimensions: usize) -> Result<Self> {
        Ok(Self::new(metric.parse()?, scalar.parse()?, dimensions))
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn scalar(&self) -> ScalarKind {
        self.scalar
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Size of one encoded vector
    pub fn bytes_per_vector(&self) -> usize {
        self.bytes_per_vector
    }

    /// Distance between two encoded vectors
    #[inline]
    pub fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        (self.distance)(a, b, self.dimensions)
    }

    /// Quantize an `f32` vector into the configured encoding
    pub fn encode(&self, vector: &[f32]) -> Vec<u8> {
        let mut out = vec![0u8; self.bytes_per_vector];
        self.scalar.encode(vector, &mut out);
        out
    }

    /// Decode a stored vector back into `f32` components
    pub fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        self.scalar.decode(bytes, self.dimensions)
    }

    /// Distance between two raw `f32` vectors, as the index would see them
    pub fn distance_f32(&self, a: &[f32], b: &[f32]) -> f32 {
        self.distance(&self.encode(a), &self.encode(b))
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("kind", &self.kind)
            .field("scalar", &self.scalar)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

fn resolve(kind: MetricKind, scalar: ScalarKind) -> DistanceFn {
    use kernels::*;

    match (kind, scalar) {
        (MetricKind::Hamming, ScalarKind::B1) => hamming_b1 as DistanceFn,
        (MetricKind::Tanimoto, ScalarKind::B1) => tanimoto_b1 as DistanceFn,
        (MetricKind::Sorensen, ScalarKind::B1) => sorensen_b1 as DistanceFn,
        (MetricKind::InnerProduct, _) => over_lanes::<InnerProduct>(scalar),
        (MetricKind::L2sq, _) => over_lanes::<L2sq>(scalar),
        (MetricKind::Cosine, _) => over_lanes::<Cosine>(scalar),
        (MetricKind::Pearson, _) => over_lanes::<Pearson>(scalar),
        (MetricKind::Haversine, _) => over_lanes::<Haversine>(scalar),
        (MetricKind::Hamming, _) => over_lanes::<Hamming>(scalar),
        (MetricKind::Tanimoto, _) => over_lanes::<Tanimoto>(scalar),
        (MetricKind::Sorensen, _) => over_lanes::<Sorensen>(scalar),
    }
}

fn over_lanes<K: Kernel>(scalar: ScalarKind) -> DistanceFn {
    match scalar {
        ScalarKind::I8 => K::distance::<I8Lanes> as DistanceFn,
        ScalarKind::F16 => K::distance::<F16Lanes> as DistanceFn,
        ScalarKind::F32 => K::distance::<F32Lanes> as DistanceFn,
        ScalarKind::F64 => K::distance::<F64Lanes> as DistanceFn,
        ScalarKind::B1 => K::distance::<B1Lanes> as DistanceFn,
    }
}
