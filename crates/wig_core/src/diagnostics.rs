use glam::Vec4Swizzles;
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::profile::StrandProfile;
use crate::store::StrandBufferStore;
use crate::strand::segment_length;

/// Whole-wig summary used by the batch runner's metrics stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Largest `| |p[i] - p[i-1]| - segment length |` over all strands.
    pub max_length_error: f32,
    /// Mean world-space height of the strand tips.
    pub mean_tip_height: f32,
    pub max_speed: f32,
}

pub fn measure(
    store: &StrandBufferStore,
    profile: &StrandProfile,
    config: &SimulationConfig,
) -> Diagnostics {
    let vertex_count = store.vertex_count();
    if vertex_count == 0 {
        return Diagnostics::default();
    }
    let segment_count = store.segment_count();

    let mut max_length_error = 0.0f32;
    let mut tip_height_sum = 0.0f64;
    for index in 0..vertex_count {
        let seg = segment_length(profile, config.hash, config.seed, index as u32, segment_count);
        let strand = store.strand(index);
        for pair in strand.windows(2) {
            let gap = (pair[1].xyz() - pair[0].xyz()).length();
            max_length_error = max_length_error.max((gap - seg).abs());
        }
        if let Some(tip) = strand.last() {
            tip_height_sum += f64::from(tip.y);
        }
    }

    let max_speed = store
        .velocities()
        .iter()
        .map(|v| v.length())
        .fold(0.0f32, f32::max);

    Diagnostics {
        max_length_error,
        mean_tip_height: (tip_height_sum / vertex_count as f64) as f32,
        max_speed,
    }
}
