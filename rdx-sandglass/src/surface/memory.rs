//! A surface that records what it is told, for tests and text front-ends.

use super::{ContainerGeometry, DialHost, FillRegion, HourglassView, ParticleLayer};
use crate::common::ParticleId;
use crate::dial::DialMarker;
use crate::particle::ParticleSprite;
use parking_lot::Mutex;
use slotmap::SecondaryMap;
use std::sync::Arc;

/// Everything a `MemorySurface` has been told so far.
#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub top_percent: Option<f64>,
    pub bottom_percent: Option<f64>,
    pub particles: SecondaryMap<ParticleId, ParticleSprite>,
    pub markers: Vec<DialMarker>,
    pub attached_total: u64,
    pub detached_total: u64,
}

impl SurfaceState {
    pub fn active_minute(&self) -> Option<usize> {
        self.markers.iter().find(|m| m.minute_active).map(|m| m.index)
    }

    pub fn active_hour(&self) -> Option<usize> {
        self.markers.iter().find(|m| m.hour_active).map(|m| m.index)
    }
}

#[derive(Debug, Clone, Copy)]
enum Chamber {
    Top,
    Bottom,
}

struct MemoryFillRegion {
    state: Arc<Mutex<SurfaceState>>,
    chamber: Chamber,
}

impl FillRegion for MemoryFillRegion {
    fn set_height_percent(&self, percent: f64) {
        let mut state = self.state.lock();
        match self.chamber {
            Chamber::Top => state.top_percent = Some(percent),
            Chamber::Bottom => state.bottom_percent = Some(percent),
        }
    }
}

/// An in-memory implementation of every hourglass slot.
#[derive(Clone)]
pub struct MemorySurface {
    state: Arc<Mutex<SurfaceState>>,
    geometry: ContainerGeometry,
}

impl MemorySurface {
    pub fn new(geometry: ContainerGeometry) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState::default())),
            geometry,
        }
    }

    /// A view wired to every slot of this surface.
    pub fn view(&self) -> HourglassView {
        HourglassView {
            top_sand: Some(Arc::new(MemoryFillRegion {
                state: self.state.clone(),
                chamber: Chamber::Top,
            })),
            bottom_sand: Some(Arc::new(MemoryFillRegion {
                state: self.state.clone(),
                chamber: Chamber::Bottom,
            })),
            particles: Some(Arc::new(self.clone())),
            dial: Some(Arc::new(self.clone())),
        }
    }

    pub fn snapshot(&self) -> SurfaceState {
        self.state.lock().clone()
    }

    pub fn live_particles(&self) -> usize {
        self.state.lock().particles.len()
    }

    pub fn marker_count(&self) -> usize {
        self.state.lock().markers.len()
    }
}

impl ParticleLayer for MemorySurface {
    fn attach(&self, id: ParticleId, sprite: &ParticleSprite) {
        let mut state = self.state.lock();
        state.particles.insert(id, *sprite);
        state.attached_total += 1;
    }

    fn place(&self, id: ParticleId, sprite: &ParticleSprite) {
        if let Some(slot) = self.state.lock().particles.get_mut(id) {
            *slot = *sprite;
        }
    }

    fn detach(&self, id: ParticleId) {
        let mut state = self.state.lock();
        if state.particles.remove(id).is_some() {
            state.detached_total += 1;
        }
    }

    fn clear(&self) {
        self.state.lock().particles.clear();
    }
}

impl DialHost for MemorySurface {
    fn geometry(&self) -> ContainerGeometry {
        self.geometry
    }

    fn render(&self, markers: &[DialMarker]) {
        self.state.lock().markers = markers.to_vec();
    }

    fn clear(&self) {
        self.state.lock().markers.clear();
    }
}
