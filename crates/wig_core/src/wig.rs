use anyhow::Result;

use crate::config::SimulationConfig;
use crate::profile::StrandProfile;
use crate::store::StrandBufferStore;
use crate::strand::RootPoint;

/// A simulated wig: strand buffers plus the settings and clock that drive
/// them between ticks.
#[derive(Clone, Debug)]
pub struct Wig {
    pub tick: u64,
    /// Elapsed simulated time in seconds.
    pub time: f32,
    pub config: SimulationConfig,
    pub profile: StrandProfile,
    pub store: StrandBufferStore,
}

impl Wig {
    pub fn new(roots: Vec<RootPoint>, config: SimulationConfig, profile: StrandProfile) -> Result<Self> {
        let store = StrandBufferStore::new(roots, &config, &profile)?;
        Ok(Self {
            tick: 0,
            time: 0.0,
            config,
            profile,
            store,
        })
    }

    /// Swap the dynamics profile; takes effect on the next tick.
    pub fn set_profile(&mut self, profile: StrandProfile) {
        self.profile = profile;
    }

    /// Change the segment count. Buffers are reallocated and every strand
    /// goes back to its rest pose.
    pub fn set_segment_count(&mut self, segment_count: usize) -> Result<()> {
        let config = SimulationConfig {
            segment_count,
            ..self.config
        };
        let roots = self.store.roots().to_vec();
        self.store = StrandBufferStore::new(roots, &config, &self.profile)?;
        self.config = config;
        Ok(())
    }

    /// Rest pose, zero velocity, clock back to zero.
    pub fn reset(&mut self) {
        self.store.reset(&self.config, &self.profile);
        self.tick = 0;
        self.time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WigError;
    use glam::Vec3;

    fn wig() -> Wig {
        let roots = vec![RootPoint::new(Vec3::ZERO, Vec3::Y)];
        Wig::new(roots, SimulationConfig::with_segments(8), StrandProfile::default())
            .expect("wig builds")
    }

    #[test]
    fn segment_count_change_reallocates() {
        let mut wig = wig();
        wig.set_segment_count(16).expect("resize succeeds");
        assert_eq!(wig.store.segment_count(), 16);
        assert_eq!(wig.store.positions().len(), 16);
        assert_eq!(wig.config.segment_count, 16);
    }

    #[test]
    fn rejected_segment_count_keeps_old_buffers() {
        let mut wig = wig();
        let err = wig.set_segment_count(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WigError>(),
            Some(WigError::SegmentCountOutOfRange { .. })
        ));
        assert_eq!(wig.store.segment_count(), 8);
        assert_eq!(wig.config.segment_count, 8);
    }
}
