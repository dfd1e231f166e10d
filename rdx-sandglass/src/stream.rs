//! The particle stream: a Stopped/Running animation loop.
//!
//! While running, a driver task owns two timers on the runtime: a spawn timer
//! that evaluates the spawn gate against the latest fill reading, and a frame
//! timer that advances every live grain. Both only ever touch the shared
//! `ParticleField` under its lock and only while their run's epoch is current,
//! so `stop` takes effect synchronously: once it returns, no callback from the
//! old run can create, move or resurrect a grain.

use crate::config::ParticleConfig;
use crate::fill::FillState;
use crate::particle::ParticleField;
use crate::surface::ParticleLayer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

/// Lifetime counters for a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub live: usize,
    pub spawned: u64,
    pub retired: u64,
}

struct StreamShared {
    epoch: u64,
    field: ParticleField,
    spawned: u64,
    retired: u64,
}

/// Spawns, animates and retires falling grains for one hourglass.
pub struct ParticleStream {
    spawn_period: Duration,
    frame_period: Duration,
    layer: Option<Arc<dyn ParticleLayer>>,
    fill: watch::Receiver<FillState>,
    shared: Arc<Mutex<StreamShared>>,
    driver: Option<JoinHandle<()>>,
}

impl ParticleStream {
    pub fn new(
        config: ParticleConfig,
        frame_period: Duration,
        layer: Option<Arc<dyn ParticleLayer>>,
        fill: watch::Receiver<FillState>,
    ) -> Self {
        Self {
            spawn_period: config.spawn_period(),
            frame_period,
            layer,
            fill,
            shared: Arc::new(Mutex::new(StreamShared {
                epoch: 0,
                field: ParticleField::new(config),
                spawned: 0,
                retired: 0,
            })),
            driver: None,
        }
    }

    /// Starts spawning grains. A no-op while already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        if self.driver.is_some() {
            debug!("ParticleStream already running; start ignored.");
            return;
        }
        let epoch = {
            let mut shared = self.shared.lock();
            shared.epoch += 1;
            shared.field.clear();
            if let Some(layer) = &self.layer {
                layer.clear();
            }
            shared.epoch
        };
        let driver = StreamDriver {
            shared: self.shared.clone(),
            layer: self.layer.clone(),
            fill: self.fill.clone(),
            epoch,
            spawn_period: self.spawn_period,
            frame_period: self.frame_period,
        };
        self.driver = Some(tokio::spawn(driver.run()));
        info!(
            "ParticleStream started (spawn every {:?}, frame every {:?}).",
            self.spawn_period, self.frame_period
        );
    }

    /// Cancels both timers and removes every grain. Safe to call in any state.
    pub fn stop(&mut self) {
        let was_running = match self.driver.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        };
        let cleared = {
            let mut shared = self.shared.lock();
            shared.epoch += 1;
            shared.field.clear()
        };
        self.cleanup();
        if was_running {
            info!("ParticleStream stopped; {} grains discarded.", cleared);
        }
    }

    /// Removes any grain elements still present in the layer.
    pub fn cleanup(&self) {
        let _shared = self.shared.lock();
        if let Some(layer) = &self.layer {
            layer.clear();
        }
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }

    pub fn live_count(&self) -> usize {
        self.shared.lock().field.len()
    }

    pub fn stats(&self) -> StreamStats {
        let shared = self.shared.lock();
        StreamStats {
            live: shared.field.len(),
            spawned: shared.spawned,
            retired: shared.retired,
        }
    }
}

impl Drop for ParticleStream {
    fn drop(&mut self) {
        if let Some(handle) = self.driver.take() {
            handle.abort();
        }
    }
}

/// The task body of one run.
struct StreamDriver {
    shared: Arc<Mutex<StreamShared>>,
    layer: Option<Arc<dyn ParticleLayer>>,
    fill: watch::Receiver<FillState>,
    epoch: u64,
    spawn_period: Duration,
    frame_period: Duration,
}

impl StreamDriver {
    async fn run(self) {
        let mut spawn_ticker = interval(self.spawn_period);
        spawn_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frame_ticker = interval(self.frame_period);
        frame_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            let current = tokio::select! {
                _ = spawn_ticker.tick() => self.spawn(),
                _ = frame_ticker.tick() => self.frame(),
            };
            if !current {
                trace!("ParticleStream run #{} superseded; driver exiting.", self.epoch);
                break;
            }
        }
    }

    /// Returns `false` once this run has been superseded.
    fn spawn(&self) -> bool {
        let fill = *self.fill.borrow();
        let mut shared = self.shared.lock();
        if shared.epoch != self.epoch {
            return false;
        }
        if shared
            .field
            .try_spawn(&fill, Instant::now(), self.layer.as_deref())
            .is_some()
        {
            shared.spawned += 1;
        }
        true
    }

    fn frame(&self) -> bool {
        let mut shared = self.shared.lock();
        if shared.epoch != self.epoch {
            return false;
        }
        let stats = shared.field.advance(Instant::now(), self.layer.as_deref());
        shared.retired += stats.retired as u64;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClockResolution;
    use crate::surface::{ContainerGeometry, MemorySurface};

    fn stream(fill: FillState) -> (ParticleStream, MemorySurface, watch::Sender<FillState>) {
        let surface = MemorySurface::new(ContainerGeometry::new(100.0, 100.0));
        let (fill_tx, fill_rx) = watch::channel(fill);
        let config = ParticleConfig {
            seed: Some(3),
            ..ParticleConfig::default()
        };
        let layer: Arc<dyn ParticleLayer> = Arc::new(surface.clone());
        let stream = ParticleStream::new(
            config,
            ClockResolution::High.frame_period(),
            Some(layer),
            fill_rx,
        );
        (stream, surface, fill_tx)
    }

    async fn run_for(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn starting_twice_keeps_a_single_spawn_timer() {
        let (mut stream, _surface, _fill) = stream(FillState::FULL);
        stream.start();
        stream.start();
        assert!(stream.is_running());

        // Spawn ticks at 0, 150, ..., 1050 ms: eight with one timer, sixteen with two.
        run_for(1100).await;
        let stats = stream.stats();
        assert!((7..=9).contains(&stats.spawned), "spawned {}", stats.spawned);
        assert_eq!(stats.retired, 0);
        stream.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn restart_leaves_no_residual_particles() {
        let (mut stream, surface, _fill) = stream(FillState::FULL);
        stream.start();
        run_for(600).await;
        assert!(stream.live_count() > 0);
        assert!(surface.live_particles() > 0);

        stream.stop();
        assert!(!stream.is_running());
        assert_eq!(stream.live_count(), 0);
        assert_eq!(surface.live_particles(), 0);

        stream.start();
        assert_eq!(stream.live_count(), 0);
        assert_eq!(surface.live_particles(), 0);
        stream.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_ghost_particles() {
        let (mut stream, surface, _fill) = stream(FillState::FULL);
        stream.start();
        run_for(400).await;
        stream.stop();
        let attached = surface.snapshot().attached_total;

        run_for(5000).await;
        let snapshot = surface.snapshot();
        assert!(snapshot.particles.is_empty());
        assert_eq!(snapshot.attached_total, attached);
        assert_eq!(stream.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_safe_in_any_state() {
        let (mut stream, surface, _fill) = stream(FillState::FULL);
        stream.stop();
        stream.stop();
        stream.start();
        stream.stop();
        stream.stop();
        assert!(!stream.is_running());
        assert_eq!(surface.live_particles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_top_chamber_halts_the_flow() {
        let empty = FillState {
            top_fraction: 0.005,
            bottom_fraction: 0.995,
        };
        let (mut stream, surface, fill_tx) = stream(empty);
        stream.start();
        run_for(1000).await;
        assert_eq!(stream.stats().spawned, 0);
        assert_eq!(surface.snapshot().attached_total, 0);

        fill_tx.send_replace(FillState::FULL);
        run_for(400).await;
        assert!(stream.stats().spawned > 0);
        stream.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn grains_fall_and_retire_on_their_own() {
        let (mut stream, surface, fill_tx) = stream(FillState::FULL);
        stream.start();
        run_for(300).await;
        fill_tx.send_replace(FillState {
            top_fraction: 0.0,
            bottom_fraction: 1.0,
        });
        // Longest lifetime is 2500 ms.
        run_for(3000).await;

        let stats = stream.stats();
        assert!(stats.spawned > 0);
        assert_eq!(stats.live, 0);
        assert_eq!(stats.retired, stats.spawned);
        let snapshot = surface.snapshot();
        assert!(snapshot.particles.is_empty());
        assert_eq!(snapshot.detached_total, snapshot.attached_total);
        stream.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn missing_layer_runs_without_spawning() {
        let (_fill_tx, fill_rx) = watch::channel(FillState::FULL);
        let mut stream = ParticleStream::new(
            ParticleConfig::default(),
            ClockResolution::High.frame_period(),
            None,
            fill_rx,
        );
        stream.start();
        run_for(500).await;
        assert_eq!(stream.live_count(), 0);
        stream.stop();
    }
}
