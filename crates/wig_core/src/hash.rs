//! Stateless per-strand hashing.
//!
//! Strand variation is derived from `(seed, strand index)` on demand instead
//! of being stored, so a strand's target length stays put for as long as the
//! seed and profile do. Two encodings are provided: the fractional product
//! used by the reference rig and an integer avalanche mix with a better
//! spread for large seeds.

use serde::{Deserialize, Serialize};

const INDEX_SCALE: f64 = 0.012_817;
const PRODUCT_SCALE: f64 = 632.813_3;

/// Largest `f32` strictly below one.
const UNIT_CEILING: f32 = 1.0 - f32::EPSILON / 2.0;

/// Which hash family a simulation draws strand variation from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashKind {
    #[default]
    Fractional,
    Mixed,
}

impl HashKind {
    /// Sample the selected family for `(seed, index)`.
    pub fn sample(self, seed: u32, index: u32) -> f32 {
        match self {
            HashKind::Fractional => unit_float(seed, index),
            HashKind::Mixed => mixed_unit_float(seed, index),
        }
    }
}

/// `frac((seed + index * k1) * k2)`, folded into `[0, 1)`.
pub fn unit_float(seed: u32, index: u32) -> f32 {
    let product = (f64::from(seed) + f64::from(index) * INDEX_SCALE) * PRODUCT_SCALE;
    let frac = product - product.floor();
    (frac as f32).min(UNIT_CEILING)
}

/// Integer avalanche hash of `(seed, index)` mapped to `[0, 1)`.
pub fn mixed_unit_float(seed: u32, index: u32) -> f32 {
    const SCALE: f32 = (1u32 << 24) as f32;
    let key = (u64::from(seed) << 32) | u64::from(index);
    let mixed = mix64(key ^ 0x9E37_79B9_7F4A_7C15);
    ((mixed >> 40) as f32) / SCALE
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
