//! Divergence-free noise force.
//!
//! The force is the cross product of the gradients of two independent
//! scalar simplex fields. `curl(a ∇b)` expands to `∇a × ∇b`, so the field is
//! the curl of something and carries no sources or sinks: strands get
//! swirled around without bunching up or spreading apart.

use std::f32::consts::PI;

use glam::{Vec3, Vec3Swizzles};

use crate::profile::StrandProfile;

const SKEW: f32 = 1.0 / 3.0;
const UNSKEW: f32 = 1.0 / 6.0;

/// Squared kernel radius. Anything above 0.5 lets kernels reach past the
/// four simplex corners and the field becomes discontinuous.
const FALLOFF: f32 = 0.5;
const OUTPUT_SCALE: f32 = 64.0;

const GRADIENTS: [Vec3; 12] = [
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, 0.0, 1.0),
    Vec3::new(-1.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, -1.0),
    Vec3::new(0.0, 1.0, 1.0),
    Vec3::new(0.0, -1.0, 1.0),
    Vec3::new(0.0, 1.0, -1.0),
    Vec3::new(0.0, -1.0, -1.0),
];

/// Curl-noise force at a world-space `position`.
///
/// The first field is sampled at the scaled position scrolled along +Y by
/// `noise_speed * time`; the second at the axis-rotated position with a
/// fixed phase shift minus the reversed scroll offset.
pub fn curl_field(position: Vec3, time: f32, profile: &StrandProfile) -> Vec3 {
    let scroll = Vec3::Y * (profile.noise_speed * time);
    let phase = Vec3::new(3.0, 1.0, 7.0) * PI - scroll.zyx();

    let p = position * profile.noise_frequency;
    let (_, grad_a) = simplex_grad(p + scroll);
    let (_, grad_b) = simplex_grad(p.yzx() + phase);

    // grad_b is taken with respect to the rotated coordinates; rotate it
    // back so both gradients live in the same frame.
    grad_a.cross(grad_b.zxy()) * profile.noise_amplitude
}

/// 3-D simplex noise value and its analytic gradient.
///
/// Values fall roughly within `[-1, 1]`.
pub fn simplex_grad(p: Vec3) -> (f32, Vec3) {
    let skew = (p.x + p.y + p.z) * SKEW;
    let cell = (p + Vec3::splat(skew)).floor();
    let unskew = (cell.x + cell.y + cell.z) * UNSKEW;
    let d0 = p - (cell - Vec3::splat(unskew));

    let (o1, o2) = corner_offsets(d0);
    let d1 = d0 - o1 + Vec3::splat(UNSKEW);
    let d2 = d0 - o2 + Vec3::splat(2.0 * UNSKEW);
    let d3 = d0 - Vec3::ONE + Vec3::splat(3.0 * UNSKEW);

    let (i, j, k) = (cell.x as i32, cell.y as i32, cell.z as i32);
    let mut value = 0.0;
    let mut gradient = Vec3::ZERO;
    for (d, o) in [(d0, Vec3::ZERO), (d1, o1), (d2, o2), (d3, Vec3::ONE)] {
        let g = lattice_gradient(i + o.x as i32, j + o.y as i32, k + o.z as i32);
        let (v, dv) = corner(d, g);
        value += v;
        gradient += dv;
    }

    (value * OUTPUT_SCALE, gradient * OUTPUT_SCALE)
}

/// Second and third corner of the simplex containing `d` (offsets from the
/// cell origin), picked by the ordering of its components.
fn corner_offsets(d: Vec3) -> (Vec3, Vec3) {
    const X: Vec3 = Vec3::X;
    const Y: Vec3 = Vec3::Y;
    const Z: Vec3 = Vec3::Z;
    if d.x >= d.y {
        if d.y >= d.z {
            (X, X + Y)
        } else if d.x >= d.z {
            (X, X + Z)
        } else {
            (Z, X + Z)
        }
    } else if d.y < d.z {
        (Z, Y + Z)
    } else if d.x < d.z {
        (Y, Y + Z)
    } else {
        (Y, X + Y)
    }
}

fn corner(d: Vec3, g: Vec3) -> (f32, Vec3) {
    let t = FALLOFF - d.length_squared();
    if t <= 0.0 {
        return (0.0, Vec3::ZERO);
    }
    let t2 = t * t;
    let t4 = t2 * t2;
    let gd = g.dot(d);
    // d/dd [t^4 (g·d)] with t = r² - |d|²
    (t4 * gd, g * t4 - d * (8.0 * t2 * t * gd))
}

fn lattice_gradient(i: i32, j: i32, k: i32) -> Vec3 {
    let mut h = (i as u32).wrapping_mul(0x8DA6_B343)
        ^ (j as u32).wrapping_mul(0xD816_3841)
        ^ (k as u32).wrapping_mul(0xCB1A_B31F);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7FEB_352D);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846C_A68B);
    h ^= h >> 16;
    GRADIENTS[(h % 12) as usize]
}
