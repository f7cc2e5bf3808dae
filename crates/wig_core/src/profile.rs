use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Dynamics parameters shared by every strand of a wig.
///
/// Profiles may be swapped between ticks; nothing in the buffers depends on
/// them except the per-strand segment length, which is recomputed each tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StrandProfile {
    /// Rest length of a whole strand.
    pub length: f32,
    /// Fraction of `length` a strand may lose to per-strand variation.
    pub length_randomness: f32,
    pub spring: f32,
    /// Exponential velocity decay rate (per second).
    pub damping: f32,
    /// World-space acceleration.
    pub gravity: Vec3,
    pub noise_amplitude: f32,
    pub noise_frequency: f32,
    /// Scroll rate of the noise field; the sign picks the direction.
    pub noise_speed: f32,
}

impl Default for StrandProfile {
    fn default() -> Self {
        Self {
            length: 1.0,
            length_randomness: 0.5,
            spring: 600.0,
            damping: 30.0,
            gravity: Vec3::new(0.0, -8.0, 2.0),
            noise_amplitude: 5.0,
            noise_frequency: 1.0,
            noise_speed: 0.1,
        }
    }
}

/// A profile value outside its documented domain.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileIssue {
    pub field: &'static str,
    pub value: f32,
    pub expected: &'static str,
}

impl fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} (expected {})", self.field, self.value, self.expected)
    }
}

impl StrandProfile {
    /// A profile with every force switched off: strands keep whatever shape
    /// the length constraint gives them.
    pub fn still(length: f32) -> Self {
        Self {
            length,
            length_randomness: 0.0,
            spring: 0.0,
            damping: 0.0,
            gravity: Vec3::ZERO,
            noise_amplitude: 0.0,
            noise_frequency: 1.0,
            noise_speed: 0.0,
        }
    }

    /// Load a profile JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("failed to open profile file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize a profile document from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("invalid profile json")
    }

    /// Report every field outside its documented domain.
    ///
    /// The kernel never calls this; out-of-domain values are allowed to
    /// degrade the simulation numerically.
    pub fn validate(&self) -> Vec<ProfileIssue> {
        let mut issues = Vec::new();
        let mut check = |field, value: f32, ok: bool, expected| {
            if !ok {
                issues.push(ProfileIssue {
                    field,
                    value,
                    expected,
                });
            }
        };

        check("length", self.length, self.length > 0.0, "> 0");
        check(
            "lengthRandomness",
            self.length_randomness,
            (0.0..=1.0).contains(&self.length_randomness),
            "within [0, 1]",
        );
        check("spring", self.spring, self.spring >= 0.0, ">= 0");
        check("damping", self.damping, self.damping >= 0.0, ">= 0");
        check(
            "noiseAmplitude",
            self.noise_amplitude,
            self.noise_amplitude >= 0.0,
            ">= 0",
        );
        check(
            "noiseFrequency",
            self.noise_frequency,
            self.noise_frequency > 0.0,
            "> 0",
        );
        check(
            "noiseSpeed",
            self.noise_speed,
            self.noise_speed.is_finite(),
            "finite",
        );
        for (field, value) in [
            ("gravity.x", self.gravity.x),
            ("gravity.y", self.gravity.y),
            ("gravity.z", self.gravity.z),
        ] {
            check(field, value, value.is_finite(), "finite");
        }

        issues
    }
}

/// Strategy over profiles inside their documented domains.
#[cfg(any(test, feature = "proptest-support"))]
pub fn arb_profile() -> impl proptest::strategy::Strategy<Value = StrandProfile> {
    use proptest::prelude::*;

    (
        (0.05f32..4.0, 0.0f32..=1.0, 0.0f32..1_000.0, 0.0f32..60.0),
        (
            (-20.0f32..20.0, -20.0f32..20.0, -20.0f32..20.0),
            0.0f32..10.0,
            0.1f32..4.0,
            -2.0f32..2.0,
        ),
    )
        .prop_map(
            |((length, length_randomness, spring, damping), ((gx, gy, gz), amp, freq, speed))| {
                StrandProfile {
                    length,
                    length_randomness,
                    spring,
                    damping,
                    gravity: Vec3::new(gx, gy, gz),
                    noise_amplitude: amp,
                    noise_frequency: freq,
                    noise_speed: speed,
                }
            },
        )
}
