//! Per-strand dynamics.
//!
//! A strand is a chain of `segment_count` points hanging off a root point.
//! The first point follows the root through the world transform, the second
//! sits one segment length out along the root normal, and every point after
//! that is integrated from its own velocity and then projected back onto
//! the sphere of radius `segment length` around its already-resolved
//! predecessor. Position and velocity are updated in the same root-to-tip
//! pass.

use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::hash::HashKind;
use crate::noise::curl_field;
use crate::profile::StrandProfile;

/// Attachment point of one strand, in object space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RootPoint {
    pub position: Vec3,
    /// Initial growth direction.
    pub normal: Vec3,
}

impl RootPoint {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// Everything shared by all strands during one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickContext<'a> {
    pub profile: &'a StrandProfile,
    pub seed: u32,
    pub hash: HashKind,
    pub history_window: usize,
    /// Object-to-world transform of the source mesh.
    pub transform: Mat4,
    /// Elapsed time in seconds; scrolls the noise field.
    pub time: f32,
    /// Step length in seconds, `>= 0`.
    pub dt: f32,
}

impl<'a> TickContext<'a> {
    pub fn new(
        profile: &'a StrandProfile,
        config: &SimulationConfig,
        transform: Mat4,
        time: f32,
        dt: f32,
    ) -> Self {
        Self {
            profile,
            seed: config.seed,
            hash: config.hash,
            history_window: config.history_window,
            transform,
            time,
            dt,
        }
    }

    pub fn segment_length(&self, strand_index: usize, segment_count: usize) -> f32 {
        segment_length(
            self.profile,
            self.hash,
            self.seed,
            strand_index as u32,
            segment_count,
        )
    }
}

/// Target distance between consecutive points of strand `strand_index`.
pub fn segment_length(
    profile: &StrandProfile,
    hash: HashKind,
    seed: u32,
    strand_index: u32,
    segment_count: usize,
) -> f32 {
    let jitter = hash.sample(seed, strand_index);
    (1.0 - jitter * profile.length_randomness) * profile.length / segment_count as f32
}

/// Unit vector along `v`, or zero when `v` has no usable length.
pub fn normalize_safe(v: Vec3) -> Vec3 {
    v.normalize_or_zero()
}

/// Rest pose: a straight strand along the object-space root normal, at rest.
pub fn lay_out(root: &RootPoint, segment_length: f32, positions: &mut [Vec4], velocities: &mut [Vec3]) {
    assert_eq!(
        positions.len(),
        velocities.len(),
        "position and velocity slices differ in length"
    );
    let step = normalize_safe(root.normal) * segment_length;
    let mut p = root.position;
    for (position, velocity) in positions.iter_mut().zip(velocities.iter_mut()) {
        *position = p.extend(1.0);
        *velocity = Vec3::ZERO;
        p += step;
    }
}

/// Advance one strand by `ctx.dt`, in place.
///
/// # Panics
///
/// If `positions` and `velocities` differ in length.
pub fn advance(
    ctx: &TickContext<'_>,
    strand_index: usize,
    root: &RootPoint,
    positions: &mut [Vec4],
    velocities: &mut [Vec3],
) {
    assert_eq!(
        positions.len(),
        velocities.len(),
        "strand {}: position and velocity slices differ in length",
        strand_index
    );
    let count = positions.len();
    if count == 0 {
        return;
    }

    let profile = ctx.profile;
    let dt = ctx.dt;
    let seg = ctx.segment_length(strand_index, count);

    // Root: transform only.
    let mut p = ctx.transform.transform_point3(root.position);
    positions[0] = p.extend(1.0);
    if count == 1 {
        return;
    }

    // Anchor: fixed offset along the world-space normal.
    let anchor_dir = ctx
        .transform
        .transform_vector3(root.normal)
        .try_normalize()
        .unwrap_or(Vec3::Y);
    p += anchor_dir * seg;
    positions[1] = p.extend(1.0);

    if dt == 0.0 {
        return;
    }

    let decay = (-profile.damping * dt).exp();
    let window = ctx.history_window.max(2);

    for si in 2..count {
        // Bend direction from a point up to `window` segments back.
        let p_hist = positions[si - si.min(window)].xyz();
        let bend = p - p_hist;
        let target = p + normalize_safe(bend) * seg;

        // Newtonian motion, then the length constraint.
        let moved = positions[si].xyz() + velocities[si] * dt;
        let dir = (moved - p)
            .try_normalize()
            .or_else(|| bend.try_normalize())
            .unwrap_or(anchor_dir);
        p += dir * seg;

        let mut v = velocities[si] * decay;
        v += (target - p) * dt * profile.spring;
        v += profile.gravity * dt;
        v += curl_field(p, ctx.time, profile) * dt;

        positions[si] = p.extend(1.0);
        velocities[si] = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(profile: &StrandProfile, dt: f32) -> TickContext<'_> {
        TickContext::new(
            profile,
            &SimulationConfig::with_segments(4),
            Mat4::IDENTITY,
            0.0,
            dt,
        )
    }

    fn upright() -> RootPoint {
        RootPoint::new(Vec3::ZERO, Vec3::Y)
    }

    #[test]
    fn normalize_safe_maps_zero_to_zero() {
        assert_eq!(normalize_safe(Vec3::ZERO), Vec3::ZERO);
        assert_eq!(normalize_safe(Vec3::new(0.0, 3.0, 0.0)), Vec3::Y);
    }

    #[test]
    fn segment_length_without_randomness_splits_evenly() {
        let profile = StrandProfile::still(2.0);
        let seg = segment_length(&profile, HashKind::Fractional, 77, 12, 8);
        assert_eq!(seg, 0.25);
    }

    #[test]
    fn segment_length_shrinks_by_at_most_randomness() {
        let profile = StrandProfile {
            length_randomness: 0.5,
            ..StrandProfile::still(1.0)
        };
        for index in 0..64 {
            let seg = segment_length(&profile, HashKind::Fractional, 3, index, 10);
            assert!(seg > 0.05 - 1e-6 && seg <= 0.1, "segment {} out of range", seg);
        }
    }

    #[test]
    fn lay_out_builds_straight_resting_strand() {
        let mut positions = vec![Vec4::ZERO; 3];
        let mut velocities = vec![Vec3::ONE; 3];
        let root = RootPoint::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0));
        lay_out(&root, 0.5, &mut positions, &mut velocities);
        assert_eq!(positions[2], Vec4::new(1.0, 0.0, 1.0, 1.0));
        assert!(velocities.iter().all(|v| *v == Vec3::ZERO));
    }

    #[test]
    fn two_segment_strand_is_root_and_anchor_only() {
        let profile = StrandProfile::default();
        let ctx = context(&profile, 1.0 / 60.0);
        let mut positions = vec![Vec4::ZERO; 2];
        let mut velocities = vec![Vec3::ZERO; 2];
        let root = RootPoint::new(Vec3::new(0.0, 1.0, 0.0), Vec3::X);
        advance(&ctx, 0, &root, &mut positions, &mut velocities);
        let seg = ctx.segment_length(0, 2);
        assert_eq!(positions[0], Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert!((positions[1].xyz() - Vec3::new(seg, 1.0, 0.0)).length() < 1e-6);
        assert_eq!(velocities, vec![Vec3::ZERO; 2]);
    }

    #[test]
    fn coincident_points_do_not_produce_nan() {
        let profile = StrandProfile {
            length_randomness: 0.0,
            ..StrandProfile::default()
        };
        let ctx = context(&profile, 1.0 / 60.0);
        let mut positions = vec![Vec4::new(0.0, 0.0, 0.0, 1.0); 4];
        positions[3] = Vec4::new(0.0, 0.25, 0.0, 1.0);
        let mut velocities = vec![Vec3::ZERO; 4];
        advance(&ctx, 0, &upright(), &mut positions, &mut velocities);
        assert!(positions.iter().all(|p| p.is_finite()));
        assert!(velocities.iter().all(|v| v.is_finite()));
        for pair in positions.windows(2) {
            let gap = (pair[1] - pair[0]).length();
            assert!((gap - 0.25).abs() < 1e-5, "gap {}", gap);
        }
    }

    #[test]
    fn zero_dt_only_moves_root_and_anchor() {
        let profile = StrandProfile::default();
        let ctx = context(&profile, 0.0);
        let mut positions = vec![
            Vec4::new(9.0, 9.0, 9.0, 1.0),
            Vec4::new(9.0, 9.0, 9.0, 1.0),
            Vec4::new(1.0, 2.0, 3.0, 1.0),
            Vec4::new(4.0, 5.0, 6.0, 1.0),
        ];
        let mut velocities = vec![Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Z];
        advance(&ctx, 0, &upright(), &mut positions, &mut velocities);
        assert_eq!(positions[0], Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(positions[2], Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert_eq!(positions[3], Vec4::new(4.0, 5.0, 6.0, 1.0));
        assert_eq!(velocities, vec![Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Z]);
    }

    #[test]
    fn anchor_follows_rotated_normal() {
        let profile = StrandProfile::still(1.0);
        let mut ctx = context(&profile, 1.0 / 60.0);
        ctx.transform = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mut positions = vec![Vec4::ZERO; 4];
        let mut velocities = vec![Vec3::ZERO; 4];
        advance(&ctx, 0, &upright(), &mut positions, &mut velocities);
        assert!((positions[1].xyz() - Vec3::new(-0.25, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "differ in length")]
    fn mismatched_slices_fail_fast() {
        let profile = StrandProfile::default();
        let ctx = context(&profile, 1.0 / 60.0);
        let mut positions = vec![Vec4::ZERO; 4];
        let mut velocities = vec![Vec3::ZERO; 3];
        advance(&ctx, 0, &upright(), &mut positions, &mut velocities);
    }
}
