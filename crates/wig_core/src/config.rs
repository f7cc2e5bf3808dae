use serde::{Deserialize, Serialize};

use crate::error::WigError;
use crate::hash::HashKind;

pub const SEGMENT_COUNT_MIN: usize = 2;
pub const SEGMENT_COUNT_MAX: usize = 256;
pub const SEGMENT_COUNT_DEFAULT: usize = 64;

/// How far back along the strand the bend direction is estimated from.
pub const HISTORY_WINDOW_DEFAULT: usize = 4;
pub const HISTORY_WINDOW_MIN: usize = 2;

/// Per-instance settings fixed for the lifetime of a buffer set
/// (except `seed` and `hash`, which only steer segment lengths).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub segment_count: usize,
    pub seed: u32,
    pub history_window: usize,
    pub hash: HashKind,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            segment_count: SEGMENT_COUNT_DEFAULT,
            seed: 0,
            history_window: HISTORY_WINDOW_DEFAULT,
            hash: HashKind::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_segments(segment_count: usize) -> Self {
        Self {
            segment_count,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), WigError> {
        if !(SEGMENT_COUNT_MIN..=SEGMENT_COUNT_MAX).contains(&self.segment_count) {
            return Err(WigError::SegmentCountOutOfRange {
                count: self.segment_count,
                min: SEGMENT_COUNT_MIN,
                max: SEGMENT_COUNT_MAX,
            });
        }
        if self.history_window < HISTORY_WINDOW_MIN {
            return Err(WigError::HistoryWindowTooShort(self.history_window));
        }
        Ok(())
    }
}
