//! Distance kernels over encoded vectors
//!
//! Each kernel is generic over the lane decoder, so one implementation serves
//! every scalar kind. All kernels return a distance: lower means closer.

use super::scalar::Lanes;

pub(crate) trait Kernel {
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32;
}

pub(crate) struct InnerProduct;
pub(crate) struct L2sq;
pub(crate) struct Cosine;
pub(crate) struct Pearson;
pub(crate) struct Haversine;
pub(crate) struct Hamming;
pub(crate) struct Tanimoto;
pub(crate) struct Sorensen;

impl Kernel for InnerProduct {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        let dot: f32 = (0..dims).map(|i| L::lane(a, i) * L::lane(b, i)).sum();
        1.0 - dot
    }
}

impl Kernel for L2sq {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        (0..dims)
            .map(|i| {
                let d = L::lane(a, i) - L::lane(b, i);
                d * d
            })
            .sum()
    }
}

impl Kernel for Cosine {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        let (mut ab, mut aa, mut bb) = (0.0f32, 0.0f32, 0.0f32);
        for i in 0..dims {
            let (x, y) = (L::lane(a, i), L::lane(b, i));
            ab += x * y;
            aa += x * x;
            bb += y * y;
        }
        match (aa == 0.0, bb == 0.0) {
            (true, true) => 0.0,
            (true, false) | (false, true) => 1.0,
            _ => 1.0 - ab / (aa.sqrt() * bb.sqrt()),
        }
    }
}

impl Kernel for Pearson {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        let (mut sa, mut sb, mut sab, mut saa, mut sbb) = (0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for i in 0..dims {
            let (x, y) = (L::lane(a, i), L::lane(b, i));
            sa += x;
            sb += y;
            sab += x * y;
            saa += x * x;
            sbb += y * y;
        }
        let n = dims as f32;
        let numerator = n * sab - sa * sb;
        let denominator = ((n * saa - sa * sa) * (n * sbb - sb * sb)).sqrt();
        if denominator > 0.0 && denominator.is_finite() {
            1.0 - numerator / denominator
        } else {
            // Zero variance: correlation is undefined, treat it as uncorrelated
            1.0
        }
    }
}

impl Kernel for Haversine {
    /// Components are `(latitude, longitude)` in radians; result is the central angle.
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        if dims < 2 {
            return 0.0;
        }
        let (lat1, lon1) = (L::lane(a, 0), L::lane(a, 1));
        let (lat2, lon2) = (L::lane(b, 0), L::lane(b, 1));

        let half_dlat = ((lat2 - lat1) * 0.5).sin();
        let half_dlon = ((lon2 - lon1) * 0.5).sin();
        let x = half_dlat * half_dlat + lat1.cos() * lat2.cos() * half_dlon * half_dlon;
        2.0 * x.clamp(0.0, 1.0).sqrt().asin()
    }
}

#[inline]
fn bit<L: Lanes>(bytes: &[u8], i: usize) -> bool {
    L::lane(bytes, i) > 0.0
}

impl Kernel for Hamming {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        (0..dims).filter(|&i| bit::<L>(a, i) != bit::<L>(b, i)).count() as f32
    }
}

impl Kernel for Tanimoto {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        let (mut and, mut or) = (0u32, 0u32);
        for i in 0..dims {
            let (x, y) = (bit::<L>(a, i), bit::<L>(b, i));
            and += (x && y) as u32;
            or += (x || y) as u32;
        }
        tanimoto(and, or)
    }
}

impl Kernel for Sorensen {
    #[inline]
    fn distance<L: Lanes>(a: &[u8], b: &[u8], dims: usize) -> f32 {
        let (mut and, mut total) = (0u32, 0u32);
        for i in 0..dims {
            let (x, y) = (bit::<L>(a, i), bit::<L>(b, i));
            and += (x && y) as u32;
            total += x as u32 + y as u32;
        }
        sorensen(and, total)
    }
}

#[inline]
fn tanimoto(and: u32, or: u32) -> f32 {
    if or == 0 {
        0.0
    } else {
        1.0 - and as f32 / or as f32
    }
}

#[inline]
fn sorensen(and: u32, total: u32) -> f32 {
    if total == 0 {
        0.0
    } else {
        1.0 - 2.0 * and as f32 / total as f32
    }
}

// Popcount paths for packed `b1x8` storage. Padding bits are always zero.

pub(crate) fn hamming_b1(a: &[u8], b: &[u8], _dims: usize) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x ^ y).count_ones())
        .sum::<u32>() as f32
}

pub(crate) fn tanimoto_b1(a: &[u8], b: &[u8], _dims: usize) -> f32 {
    let (and, or) = a.iter().zip(b).fold((0u32, 0u32), |(and, or), (x, y)| {
        (and + (x & y).count_ones(), or + (x | y).count_ones())
    });
    tanimoto(and, or)
}

pub(crate) fn sorensen_b1(a: &[u8], b: &[u8], _dims: usize) -> f32 {
    let (and, total) = a.iter().zip(b).fold((0u32, 0u32), |(and, total), (x, y)| {
        (and + (x & y).count_ones(), total + x.count_ones() + y.count_ones())
    });
    sorensen(and, total)
}
