use anyhow::Result;
use rayon::prelude::*;
use tracing::debug;

use crate::store::StrandBufferStore;
use crate::strand::{advance, TickContext};

/// Advance every strand in `store` by one step, in parallel.
///
/// Strands only touch their own slices, so the result does not depend on
/// how rayon schedules them. A store whose buffers no longer match its
/// shape fails the whole tick before any strand is touched.
pub fn tick(store: &mut StrandBufferStore, ctx: &TickContext<'_>) -> Result<()> {
    store.check_shape()?;
    debug!(
        strands = store.vertex_count(),
        segments = store.segment_count(),
        time = ctx.time,
        dt = ctx.dt,
        "tick"
    );
    store
        .par_strands_mut()
        .enumerate()
        .for_each(|(index, (root, positions, velocities))| {
            advance(ctx, index, root, positions, velocities);
        });
    Ok(())
}

/// Single-threaded [`tick`]; produces identical buffers.
pub fn tick_serial(store: &mut StrandBufferStore, ctx: &TickContext<'_>) -> Result<()> {
    store.check_shape()?;
    for (index, (root, positions, velocities)) in store.strands_mut().enumerate() {
        advance(ctx, index, root, positions, velocities);
    }
    Ok(())
}
