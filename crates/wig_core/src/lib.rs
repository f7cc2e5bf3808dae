pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod hash;
pub mod io;
pub mod noise;
pub mod profile;
pub mod store;
pub mod strand;
pub mod wig;

use anyhow::{ensure, Result};
use glam::Mat4;

use strand::TickContext;
use wig::Wig;

pub use config::SimulationConfig;
pub use error::WigError;
pub use profile::StrandProfile;
pub use store::StrandBufferStore;
pub use strand::RootPoint;

/// Execute a single simulation tick.
///
/// Advances the wig's clock by `dt` and steps every strand with the wig's
/// current profile under the given object-to-world `transform`. A zero `dt`
/// only re-anchors the roots to the transform.
pub fn tick_once(wig: &mut Wig, transform: Mat4, dt: f32) -> Result<()> {
    ensure!(
        dt.is_finite() && dt >= 0.0,
        "tick_once called with invalid dt={} at tick {}",
        dt,
        wig.tick
    );

    let time = wig.time + dt;
    let ctx = TickContext::new(&wig.profile, &wig.config, transform, time, dt);
    driver::tick(&mut wig.store, &ctx)?;

    wig.time = time;
    wig.tick += 1;
    Ok(())
}
