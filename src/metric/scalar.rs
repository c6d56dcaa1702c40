//! Scalar encodings for stored vectors
//!
//! Callers always hand the index `f32` components. They are quantized into the
//! configured encoding once, on the way in, and every distance is computed over
//! the encoded bytes.
//!
//! | kind   | bytes per vector | encoding                                  |
//! |--------|------------------|-------------------------------------------|
//! | `f64`  | `8 × d`          | little-endian IEEE 754                    |
//! | `f32`  | `4 × d`          | little-endian IEEE 754                    |
//! | `f16`  | `2 × d`          | little-endian IEEE 754 half               |
//! | `i8`   | `d`              | `round(clamp(x, -1, 1) × 127)`            |
//! | `b1x8` | `ceil(d / 8)`    | bit `i` set when `x[i] > 0`, LSB first    |

use crate::error::IndexError;
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale used by the `i8` encoding
const I8_SCALE: f32 = 127.0;

/// Numeric representation of stored vector components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScalarKind {
    #[serde(rename = "i8")]
    I8,
    #[serde(rename = "f16")]
    F16,
    #[default]
    #[serde(rename = "f32")]
    F32,
    #[serde(rename = "f64")]
    F64,
    /// One bit per component, packed eight to a byte
    #[serde(rename = "b1x8", alias = "b1")]
    B1,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 5] = [
        ScalarKind::I8,
        ScalarKind::F16,
        ScalarKind::F32,
        ScalarKind::F64,
        ScalarKind::B1,
    ];

    /// Canonical name, as accepted by `FromStr`
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::F16 => "f16",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::B1 => "b1x8",
        }
    }

    /// Stable on-disk tag
    pub(crate) fn code(&self) -> u8 {
        match self {
            ScalarKind::I8 => 1,
            ScalarKind::F16 => 2,
            ScalarKind::F32 => 3,
            ScalarKind::F64 => 4,
            ScalarKind::B1 => 5,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Number of bytes one encoded vector of `dimensions` components occupies
    pub fn bytes_per_vector(&self, dimensions: usize) -> usize {
        match self {
            ScalarKind::I8 => dimensions,
            ScalarKind::F16 => dimensions * 2,
            ScalarKind::F32 => dimensions * 4,
            ScalarKind::F64 => dimensions * 8,
            ScalarKind::B1 => dimensions.div_ceil(8),
        }
    }

    /// Encode `src` into `dst`, which must be exactly `bytes_per_vector(src.len())` long
    pub fn encode(&self, src: &[f32], dst: &mut [u8]) {
        debug_assert_eq!(dst.len(), self.bytes_per_vector(src.len()));

        match self {
            ScalarKind::I8 => {
                for (out, &x) in dst.iter_mut().zip(src) {
                    *out = (x.clamp(-1.0, 1.0) * I8_SCALE).round() as i8 as u8;
                }
            }
            ScalarKind::F16 => {
                for (out, &x) in dst.chunks_exact_mut(2).zip(src) {
                    out.copy_from_slice(&f16::from_f32(x).to_le_bytes());
                }
            }
            ScalarKind::F32 => {
                for (out, &x) in dst.chunks_exact_mut(4).zip(src) {
                    out.copy_from_slice(&x.to_le_bytes());
                }
            }
            ScalarKind::F64 => {
                for (out, &x) in dst.chunks_exact_mut(8).zip(src) {
                    out.copy_from_slice(&(x as f64).to_le_bytes());
                }
            }
            ScalarKind::B1 => {
                dst.fill(0);
                for (i, &x) in src.iter().enumerate() {
                    if x > 0.0 {
                        dst[i / 8] |= 1 << (i % 8);
                    }
                }
            }
        }
    }

    /// Decode an encoded vector back into `f32` components
    pub fn decode(&self, src: &[u8], dimensions: usize) -> Vec<f32> {
        match self {
            ScalarKind::I8 => decode_with::<I8Lanes>(src, dimensions),
            ScalarKind::F16 => decode_with::<F16Lanes>(src, dimensions),
            ScalarKind::F32 => decode_with::<F32Lanes>(src, dimensions),
            ScalarKind::F64 => decode_with::<F64Lanes>(src, dimensions),
            ScalarKind::B1 => decode_with::<B1Lanes>(src, dimensions),
        }
    }
}

fn decode_with<L: Lanes>(src: &[u8], dimensions: usize) -> Vec<f32> {
    (0..dimensions).map(|i| L::lane(src, i)).collect()
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = IndexError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "i8" => Ok(ScalarKind::I8),
            "f16" => Ok(ScalarKind::F16),
            "f32" => Ok(ScalarKind::F32),
            "f64" => Ok(ScalarKind::F64),
            "b1x8" | "b1" => Ok(ScalarKind::B1),
            other => Err(IndexError::UnknownScalarKind(other.to_string())),
        }
    }
}

/// Random access to component `i` of an encoded vector
pub(crate) trait Lanes {
    fn lane(bytes: &[u8], i: usize) -> f32;
}

pub(crate) struct I8Lanes;
pub(crate) struct F16Lanes;
pub(crate) struct F32Lanes;
pub(crate) struct F64Lanes;
pub(crate) struct B1Lanes;

impl Lanes for I8Lanes {
    #[inline]
    fn lane(bytes: &[u8], i: usize) -> f32 {
        (bytes[i] as i8) as f32 / I8_SCALE
    }
}

impl Lanes for F16Lanes {
    #[inline]
    fn lane(bytes: &[u8], i: usize) -> f32 {
        let at = i * 2;
        f16::from_le_bytes([bytes[at], bytes[at + 1]]).to_f32()
    }
}

impl Lanes for F32Lanes {
    #[inline]
    fn lane(bytes: &[u8], i: usize) -> f32 {
        let at = i * 4;
        f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }
}

impl Lanes for F64Lanes {
    #[inline]
    fn lane(bytes: &[u8], i: usize) -> f32 {
        let at = i * 8;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[at..at + 8]);
        f64::from_le_bytes(raw) as f32
    }
}

impl Lanes for B1Lanes {
    #[inline]
    fn lane(bytes: &[u8], i: usize) -> f32 {
        ((bytes[i / 8] >> (i % 8)) & 1) as f32
    }
}
