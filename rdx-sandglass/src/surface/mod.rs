//! Visual slots the engine renders into.
//!
//! The engine does not know about markup, pixels or terminals. It pushes
//! numbers into a handful of addressable slots that the presentation layer
//! implements. Every slot in a `HourglassView` is optional: an absent slot
//! turns the operations that would touch it into no-ops, so a partially
//! built presentation never stops the clock.

mod memory;

pub use memory::{MemorySurface, SurfaceState};

use crate::common::ParticleId;
use crate::dial::DialMarker;
use crate::particle::ParticleSprite;
use std::fmt;
use std::sync::Arc;

/// Width and height of the region the dial is laid out in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerGeometry {
    pub width: f64,
    pub height: f64,
}

impl ContainerGeometry {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A sand-fill region whose height is driven as a percentage.
pub trait FillRegion: Send + Sync {
    fn set_height_percent(&self, percent: f64);
}

/// The layer transient grain elements live in.
///
/// Every particle is `attach`ed once, `place`d on each frame it is alive,
/// and `detach`ed exactly once when it retires. `clear` drops every element
/// at once and is used on start and stop.
pub trait ParticleLayer: Send + Sync {
    fn attach(&self, id: ParticleId, sprite: &ParticleSprite);
    fn place(&self, id: ParticleId, sprite: &ParticleSprite);
    fn detach(&self, id: ParticleId);
    fn clear(&self);
}

/// The container hosting the 60 dial markers.
pub trait DialHost: Send + Sync {
    /// Read once when the dial is initialised.
    fn geometry(&self) -> ContainerGeometry;
    fn render(&self, markers: &[DialMarker]);
    fn clear(&self);
}

/// The set of slots one hourglass widget renders into.
#[derive(Clone, Default)]
pub struct HourglassView {
    pub top_sand: Option<Arc<dyn FillRegion>>,
    pub bottom_sand: Option<Arc<dyn FillRegion>>,
    pub particles: Option<Arc<dyn ParticleLayer>>,
    pub dial: Option<Arc<dyn DialHost>>,
}

impl HourglassView {
    /// A view with no slots at all. Every hourglass operation is a no-op.
    pub fn detached() -> Self {
        Self::default()
    }
}

impl fmt::Debug for HourglassView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HourglassView")
            .field("top_sand", &self.top_sand.is_some())
            .field("bottom_sand", &self.bottom_sand.is_some())
            .field("particles", &self.particles.is_some())
            .field("dial", &self.dial.is_some())
            .finish()
    }
}
