//! Falling sand grains.
//!
//! A grain is a value, not a task: it knows when it was born, how long it
//! lives and where it starts and ends. Its position at any instant is a
//! closed-form function of elapsed time, so a single per-frame pass over
//! the `ParticleField` animates every live grain and prunes the finished ones.

use crate::common::{PercentPos, ParticleId};
use crate::config::ParticleConfig;
use crate::fill::FillState;
use crate::surface::ParticleLayer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use slotmap::SlotMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Progress after which a grain starts fading out.
const FADE_START: f64 = 0.8;

/// What the particle layer draws for one grain on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleSprite {
    pub position: PercentPos,
    pub opacity: f64,
}

/// Quadratic ease-out: fast at the neck, settling at the bottom.
pub fn ease_out_quad(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv
}

/// Fully opaque until `FADE_START`, then a linear fade to zero at `t = 1`.
pub fn fade_opacity(t: f64) -> f64 {
    if t <= FADE_START {
        1.0
    } else {
        (1.0 - (t - FADE_START) / (1.0 - FADE_START)).clamp(0.0, 1.0)
    }
}

/// One sand grain.
#[derive(Debug, Clone)]
pub struct Particle {
    pub spawn_time: Instant,
    pub duration: Duration,
    pub start: PercentPos,
    pub end: PercentPos,
}

impl Particle {
    /// Normalised age in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.spawn_time);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn sprite_at(&self, t: f64) -> ParticleSprite {
        ParticleSprite {
            position: self.start.lerp(self.end, ease_out_quad(t)),
            opacity: fade_opacity(t),
        }
    }
}

/// Counters for one animation frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub placed: usize,
    pub retired: usize,
}

/// The collection of live grains plus the randomness used to spawn them.
pub struct ParticleField {
    config: ParticleConfig,
    particles: SlotMap<ParticleId, Particle>,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(config: ParticleConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            particles: SlotMap::with_key(),
            rng,
        }
    }

    /// Whether the top chamber still holds enough sand to drop a grain.
    pub fn spawn_gate(&self, fill: &FillState) -> bool {
        fill.is_flowing(self.config.spawn_epsilon)
    }

    /// Spawns one grain if the gate is open and a layer exists to show it.
    pub fn try_spawn(
        &mut self,
        fill: &FillState,
        now: Instant,
        layer: Option<&dyn ParticleLayer>,
    ) -> Option<ParticleId> {
        let layer = layer?;
        if !self.spawn_gate(fill) {
            return None;
        }
        let particle = self.roll_particle(now);
        let sprite = particle.sprite_at(0.0);
        let id = self.particles.insert(particle);
        layer.attach(id, &sprite);
        trace!("Spawned particle {:?}.", id);
        Some(id)
    }

    /// Moves every live grain to its position at `now` and retires the
    /// ones whose lifetime has run out.
    pub fn advance(&mut self, now: Instant, layer: Option<&dyn ParticleLayer>) -> FrameStats {
        let mut stats = FrameStats::default();
        let mut finished = Vec::new();
        for (id, particle) in self.particles.iter() {
            let t = particle.progress(now);
            if t >= 1.0 {
                finished.push(id);
            } else if let Some(layer) = layer {
                layer.place(id, &particle.sprite_at(t));
                stats.placed += 1;
            }
        }
        for id in finished {
            self.particles.remove(id);
            if let Some(layer) = layer {
                layer.detach(id);
            }
            stats.retired += 1;
        }
        stats
    }

    /// Drops every grain without animating it further. Returns how many were live.
    pub fn clear(&mut self) -> usize {
        let count = self.particles.len();
        self.particles.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id)
    }

    fn roll_particle(&mut self, now: Instant) -> Particle {
        let cfg = &self.config;
        let start_x = cfg.neck_x + symmetric(&mut self.rng, cfg.start_jitter);
        let start_y = cfg.neck_y - cfg.start_offset;
        let (min_x, max_x) = if cfg.chamber_min_x <= cfg.chamber_max_x {
            (cfg.chamber_min_x, cfg.chamber_max_x)
        } else {
            (cfg.chamber_max_x, cfg.chamber_min_x)
        };
        let end_x = (start_x + symmetric(&mut self.rng, cfg.end_drift)).clamp(min_x, max_x);
        let max_ms = cfg.min_duration_ms.saturating_add(cfg.duration_spread_ms);
        let duration_ms = self.rng.gen_range(cfg.min_duration_ms..=max_ms);
        Particle {
            spawn_time: now,
            duration: Duration::from_millis(duration_ms),
            start: PercentPos::new(start_x, start_y),
            end: PercentPos::new(end_x, cfg.rest_y),
        }
    }
}

/// Uniform sample from `[-half, half]`.
fn symmetric(rng: &mut StdRng, half: f64) -> f64 {
    if half > 0.0 {
        rng.gen_range(-half..=half)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ContainerGeometry, MemorySurface};

    fn seeded() -> ParticleField {
        ParticleField::new(ParticleConfig {
            seed: Some(42),
            ..ParticleConfig::default()
        })
    }

    fn grain(now: Instant) -> Particle {
        Particle {
            spawn_time: now,
            duration: Duration::from_millis(2000),
            start: PercentPos::new(50.0, 48.0),
            end: PercentPos::new(54.0, 90.0),
        }
    }

    #[test]
    fn easing_is_fast_then_slow() {
        assert_eq!(ease_out_quad(0.0), 0.0);
        assert_eq!(ease_out_quad(1.0), 1.0);
        assert!((ease_out_quad(0.5) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn opacity_fades_over_the_last_fifth() {
        assert_eq!(fade_opacity(0.0), 1.0);
        assert_eq!(fade_opacity(0.8), 1.0);
        assert!((fade_opacity(0.9) - 0.5).abs() < 1e-9);
        assert!(fade_opacity(1.0).abs() < 1e-9);
    }

    #[test]
    fn path_runs_from_neck_to_rest() {
        let now = Instant::now();
        let particle = grain(now);
        assert_eq!(particle.progress(now), 0.0);
        assert_eq!(particle.sprite_at(0.0).position, PercentPos::new(50.0, 48.0));
        let mid = particle.sprite_at(0.5);
        assert!((mid.position.x - 53.0).abs() < 1e-9);
        assert!((mid.position.y - (48.0 + 42.0 * 0.75)).abs() < 1e-9);
        assert_eq!(particle.progress(now + Duration::from_millis(1000)), 0.5);
        assert_eq!(particle.progress(now + Duration::from_secs(10)), 1.0);
    }

    #[test]
    fn spawned_grains_respect_configured_bounds() {
        let mut field = seeded();
        let surface = MemorySurface::new(ContainerGeometry::new(100.0, 100.0));
        let now = Instant::now();
        for _ in 0..200 {
            field.try_spawn(&FillState::FULL, now, Some(&surface));
        }
        assert_eq!(field.len(), 200);
        assert_eq!(surface.live_particles(), 200);
        for (_, p) in field.particles.iter() {
            assert!((46.0..=54.0).contains(&p.start.x));
            assert_eq!(p.start.y, 48.0);
            assert!((25.0..=75.0).contains(&p.end.x));
            assert!((p.end.x - p.start.x).abs() <= 5.0 + 1e-9);
            assert_eq!(p.end.y, 90.0);
            assert!(p.duration >= Duration::from_millis(1500));
            assert!(p.duration <= Duration::from_millis(2500));
        }
    }

    #[test]
    fn huge_lifetime_settings_do_not_overflow() {
        let mut field = ParticleField::new(ParticleConfig {
            seed: Some(9),
            min_duration_ms: u64::MAX - 5,
            duration_spread_ms: u64::MAX,
            ..ParticleConfig::default()
        });
        let surface = MemorySurface::new(ContainerGeometry::new(100.0, 100.0));
        let id = field
            .try_spawn(&FillState::FULL, Instant::now(), Some(&surface))
            .unwrap();
        assert!(field.get(id).unwrap().duration >= Duration::from_millis(u64::MAX - 5));
    }

    #[test]
    fn empty_top_chamber_closes_the_gate() {
        let mut field = seeded();
        let surface = MemorySurface::new(ContainerGeometry::new(100.0, 100.0));
        let nearly_empty = FillState {
            top_fraction: 0.01,
            bottom_fraction: 0.99,
        };
        assert!(field
            .try_spawn(&nearly_empty, Instant::now(), Some(&surface))
            .is_none());
        assert!(field.is_empty());
    }

    #[test]
    fn missing_layer_makes_spawning_a_no_op() {
        let mut field = seeded();
        assert!(field
            .try_spawn(&FillState::FULL, Instant::now(), None)
            .is_none());
        assert!(field.is_empty());
    }

    #[test]
    fn grains_retire_only_when_their_lifetime_ends() {
        let mut field = seeded();
        let surface = MemorySurface::new(ContainerGeometry::new(100.0, 100.0));
        let now = Instant::now();
        let id = field
            .try_spawn(&FillState::FULL, now, Some(&surface))
            .unwrap();
        let lifetime = field.get(id).unwrap().duration;

        let stats = field.advance(now + lifetime / 2, Some(&surface));
        assert_eq!(stats, FrameStats { placed: 1, retired: 0 });
        assert_eq!(surface.live_particles(), 1);

        let stats = field.advance(now + lifetime, Some(&surface));
        assert_eq!(stats, FrameStats { placed: 0, retired: 1 });
        assert!(field.is_empty());
        let snapshot = surface.snapshot();
        assert!(snapshot.particles.is_empty());
        assert_eq!(snapshot.attached_total, 1);
        assert_eq!(snapshot.detached_total, 1);
    }
}
