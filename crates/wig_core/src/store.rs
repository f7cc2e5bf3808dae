use anyhow::{ensure, Result};
use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::config::SimulationConfig;
use crate::error::WigError;
use crate::profile::StrandProfile;
use crate::strand::{lay_out, segment_length, RootPoint};

/// Flattened strand buffers for one wig.
///
/// Positions and velocities are indexed `[vertex * segment_count + segment]`.
/// Positions carry a homogeneous `1` so the buffer can be handed to a float
/// RGBA image as-is.
#[derive(Clone, Debug)]
pub struct StrandBufferStore {
    roots: Vec<RootPoint>,
    positions: Vec<Vec4>,
    velocities: Vec<Vec3>,
    segment_count: usize,
}

impl StrandBufferStore {
    /// Allocate buffers for `roots` and lay every strand out at rest.
    pub fn new(
        roots: Vec<RootPoint>,
        config: &SimulationConfig,
        profile: &StrandProfile,
    ) -> Result<Self> {
        config.validate()?;
        ensure!(!roots.is_empty(), WigError::EmptyRoots);

        let len = roots.len() * config.segment_count;
        let mut store = Self {
            roots,
            positions: vec![Vec4::ZERO; len],
            velocities: vec![Vec3::ZERO; len],
            segment_count: config.segment_count,
        };
        store.reset(config, profile);
        Ok(store)
    }

    /// Build roots from parallel mesh attribute arrays.
    pub fn from_mesh(
        positions: &[Vec3],
        normals: &[Vec3],
        config: &SimulationConfig,
        profile: &StrandProfile,
    ) -> Result<Self> {
        ensure!(
            positions.len() == normals.len(),
            WigError::MeshAttributeMismatch {
                positions: positions.len(),
                normals: normals.len(),
            }
        );
        let roots = positions
            .iter()
            .zip(normals)
            .map(|(&position, &normal)| RootPoint::new(position, normal))
            .collect();
        Self::new(roots, config, profile)
    }

    /// Put every strand back into its rest pose and zero all velocities.
    pub fn reset(&mut self, config: &SimulationConfig, profile: &StrandProfile) {
        let segment_count = self.segment_count;
        for (index, ((root, positions), velocities)) in self
            .roots
            .iter()
            .zip(self.positions.chunks_exact_mut(segment_count))
            .zip(self.velocities.chunks_exact_mut(segment_count))
            .enumerate()
        {
            let seg = segment_length(profile, config.hash, config.seed, index as u32, segment_count);
            lay_out(root, seg, positions, velocities);
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.roots.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn roots(&self) -> &[RootPoint] {
        &self.roots
    }

    pub fn positions(&self) -> &[Vec4] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Positions of strand `index`, root first.
    pub fn strand(&self, index: usize) -> &[Vec4] {
        let start = index * self.segment_count;
        &self.positions[start..start + self.segment_count]
    }

    pub fn strand_velocities(&self, index: usize) -> &[Vec3] {
        let start = index * self.segment_count;
        &self.velocities[start..start + self.segment_count]
    }

    /// Position buffer as RGBA float texels, one row per vertex and one
    /// column per segment.
    pub fn position_map(&self) -> &[[f32; 4]] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn position_map_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Confirm both buffers still match `vertex_count * segment_count`.
    pub fn check_shape(&self) -> Result<(), WigError> {
        let expected = self.roots.len() * self.segment_count;
        if self.positions.len() != expected {
            return Err(WigError::BufferLengthMismatch {
                buffer: "position",
                expected,
                actual: self.positions.len(),
            });
        }
        if self.velocities.len() != expected {
            return Err(WigError::BufferLengthMismatch {
                buffer: "velocity",
                expected,
                actual: self.velocities.len(),
            });
        }
        Ok(())
    }

    /// Disjoint per-strand views: root, positions and velocities.
    pub fn strands_mut(
        &mut self,
    ) -> impl Iterator<Item = (&RootPoint, &mut [Vec4], &mut [Vec3])> + '_ {
        let segment_count = self.segment_count;
        self.roots
            .iter()
            .zip(self.positions.chunks_exact_mut(segment_count))
            .zip(self.velocities.chunks_exact_mut(segment_count))
            .map(|((root, positions), velocities)| (root, positions, velocities))
    }

    /// Parallel counterpart of [`Self::strands_mut`].
    pub fn par_strands_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = (&RootPoint, &mut [Vec4], &mut [Vec3])> + '_ {
        let segment_count = self.segment_count;
        self.roots
            .par_iter()
            .zip(self.positions.par_chunks_exact_mut(segment_count))
            .zip(self.velocities.par_chunks_exact_mut(segment_count))
            .map(|((root, positions), velocities)| (root, positions, velocities))
    }

    #[cfg(test)]
    pub(crate) fn truncate_velocities(&mut self, len: usize) {
        self.velocities.truncate(len);
    }
}
