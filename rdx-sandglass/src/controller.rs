//! Binds the fill model, the dial and the particle stream to the style
//! lifecycle of one hourglass widget.

use crate::config::{DialConfig, ParticleConfig, SandglassConfig};
use crate::dial::{DialMarker, DialMarkerSet};
use crate::faces::ClockStyle;
use crate::fill::FillState;
use crate::stream::{ParticleStream, StreamStats};
use crate::surface::HourglassView;
use crate::time::TimeSample;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// What a style-selection event did to the hourglass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated(StreamStats),
    Unchanged,
}

/// One hourglass widget: `activate`, `tick` while shown, `deactivate`.
///
/// Activation and deactivation are idempotent, so the controller can be fed
/// every style-selection event without tracking transitions itself.
pub struct HourglassController {
    particle_config: ParticleConfig,
    frame_period: Duration,
    view: HourglassView,
    dial: DialMarkerSet,
    stream: Option<ParticleStream>,
    fill_tx: watch::Sender<FillState>,
}

impl HourglassController {
    pub fn new(config: &SandglassConfig, view: HourglassView) -> Self {
        Self::with_parts(
            config.particles.clone(),
            &config.dial,
            config.resolution.frame_period(),
            view,
        )
    }

    pub fn with_parts(
        particle_config: ParticleConfig,
        dial_config: &DialConfig,
        frame_period: Duration,
        view: HourglassView,
    ) -> Self {
        let (fill_tx, _) = watch::channel(FillState::FULL);
        Self {
            particle_config,
            frame_period,
            view,
            dial: DialMarkerSet::new(dial_config),
            stream: None,
            fill_tx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Lays out the dial and starts the particle stream. A no-op while active.
    ///
    /// The fill for `sample` is published before the stream starts, so its
    /// first spawn tick already sees the real sand level.
    /// Must be called from within a Tokio runtime.
    pub fn activate(&mut self, sample: &TimeSample) -> bool {
        if self.is_active() {
            debug!("Hourglass already active; activation ignored.");
            return false;
        }
        match &self.view.dial {
            Some(host) => {
                self.dial.init(host.geometry());
                host.render(self.dial.markers());
            }
            None => debug!("No dial host; dial markers skipped."),
        }
        self.fill_tx.send_replace(FillState::compute(sample));
        let mut stream = ParticleStream::new(
            self.particle_config.clone(),
            self.frame_period,
            self.view.particles.clone(),
            self.fill_tx.subscribe(),
        );
        stream.start();
        self.stream = Some(stream);
        info!("Hourglass activated.");
        true
    }

    /// Stops the stream and clears the dial. A no-op while inactive.
    pub fn deactivate(&mut self) -> Option<StreamStats> {
        let mut stream = self.stream.take()?;
        stream.stop();
        let stats = stream.stats();
        self.dial.clear();
        if let Some(host) = &self.view.dial {
            host.clear();
        }
        info!(
            "Hourglass deactivated after {} grains ({} retired).",
            stats.spawned, stats.retired
        );
        Some(stats)
    }

    /// Applies a new time sample. Returns the fill that was applied, or
    /// `None` while inactive.
    pub fn tick(&mut self, sample: &TimeSample) -> Option<FillState> {
        if !self.is_active() {
            return None;
        }
        let fill = FillState::compute(sample);
        self.fill_tx.send_replace(fill);

        if let Some(top) = &self.view.top_sand {
            top.set_height_percent(fill.top_percent());
        }
        if let Some(bottom) = &self.view.bottom_sand {
            bottom.set_height_percent(fill.bottom_percent());
        }

        self.dial.update(sample);
        if let Some(host) = &self.view.dial {
            if self.dial.is_initialized() {
                host.render(self.dial.markers());
            }
        }
        trace!(
            "Hourglass tick: top {:.2}%, bottom {:.2}%.",
            fill.top_percent(),
            fill.bottom_percent()
        );
        Some(fill)
    }

    /// Reacts to a style-selection event.
    pub fn on_style_change(&mut self, style: ClockStyle, sample: &TimeSample) -> Transition {
        if style == ClockStyle::Hourglass {
            if self.activate(sample) {
                Transition::Activated
            } else {
                Transition::Unchanged
            }
        } else {
            match self.deactivate() {
                Some(stats) => Transition::Deactivated(stats),
                None => Transition::Unchanged,
            }
        }
    }

    /// The most recent fill reading handed to the particle stream.
    pub fn fill(&self) -> FillState {
        *self.fill_tx.borrow()
    }

    pub fn markers(&self) -> &[DialMarker] {
        self.dial.markers()
    }

    pub fn stream_stats(&self) -> StreamStats {
        self.stream
            .as_ref()
            .map(ParticleStream::stats)
            .unwrap_or_default()
    }
}

impl Drop for HourglassController {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{ContainerGeometry, MemorySurface};
    use chrono::Weekday;

    fn controller() -> (HourglassController, MemorySurface) {
        let surface = MemorySurface::new(ContainerGeometry::new(240.0, 320.0));
        let mut config = SandglassConfig::default();
        config.particles.seed = Some(11);
        (HourglassController::new(&config, surface.view()), surface)
    }

    fn sample(hours: u8, minutes: u8, seconds: u8) -> TimeSample {
        TimeSample::new(hours, minutes, seconds, Weekday::Tue)
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_activation_builds_one_dial_and_one_stream() {
        let (mut hourglass, surface) = controller();
        let now = sample(8, 0, 0);
        assert!(hourglass.activate(&now));
        assert!(!hourglass.activate(&now));
        assert_eq!(surface.marker_count(), 60);
        assert_eq!(hourglass.markers().len(), 60);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let spawned = hourglass.stream_stats().spawned;
        assert!((7..=9).contains(&spawned), "spawned {}", spawned);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_applies_fill_and_dial() {
        let (mut hourglass, surface) = controller();
        assert_eq!(hourglass.tick(&sample(14, 37, 0)), None);
        assert_eq!(surface.snapshot().top_percent, None);

        hourglass.activate(&sample(14, 30, 0));
        let fill = hourglass.tick(&sample(14, 30, 0)).unwrap();
        assert!((fill.top_fraction - 0.5).abs() < 1e-12);
        assert_eq!(hourglass.fill(), fill);

        hourglass.tick(&sample(14, 37, 0));
        let state = surface.snapshot();
        let top = state.top_percent.unwrap();
        let bottom = state.bottom_percent.unwrap();
        assert!((top + bottom - 100.0).abs() < 1e-9);
        assert_eq!(state.active_minute(), Some(37));
        assert_eq!(state.active_hour(), Some(10));
        assert_eq!(state.markers.iter().filter(|m| m.minute_active).count(), 1);
        assert_eq!(state.markers.iter().filter(|m| m.hour_active).count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deactivation_clears_everything_and_is_idempotent() {
        let (mut hourglass, surface) = controller();
        hourglass.activate(&sample(8, 5, 0));
        hourglass.tick(&sample(8, 5, 0));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(surface.live_particles() > 0);

        assert!(hourglass.deactivate().is_some());
        assert!(hourglass.deactivate().is_none());
        assert!(!hourglass.is_active());
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.live_particles(), 0);
        assert!(hourglass.markers().is_empty());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(surface.live_particles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn style_events_drive_transitions() {
        let (mut hourglass, surface) = controller();
        let now = sample(6, 0, 0);
        assert_eq!(
            hourglass.on_style_change(ClockStyle::Digital, &now),
            Transition::Unchanged
        );
        assert_eq!(
            hourglass.on_style_change(ClockStyle::Hourglass, &now),
            Transition::Activated
        );
        assert_eq!(
            hourglass.on_style_change(ClockStyle::Hourglass, &now),
            Transition::Unchanged
        );
        assert!(matches!(
            hourglass.on_style_change(ClockStyle::Analog, &now),
            Transition::Deactivated(_)
        ));
        hourglass.on_style_change(ClockStyle::Hourglass, &now);
        assert_eq!(surface.marker_count(), 60);
        assert_eq!(surface.live_particles(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_chamber_stops_the_trickle() {
        let (mut hourglass, surface) = controller();
        hourglass.activate(&sample(1, 59, 59));
        hourglass.tick(&sample(1, 59, 59));
        tokio::time::sleep(Duration::from_secs(3)).await;
        let before = surface.snapshot().attached_total;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(surface.snapshot().attached_total, before);
        assert_eq!(surface.live_particles(), 0);

        hourglass.tick(&sample(2, 0, 0));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(surface.snapshot().attached_total > before);
    }

    #[tokio::test(start_paused = true)]
    async fn activating_with_an_empty_top_spawns_nothing() {
        let (mut hourglass, surface) = controller();
        assert!(hourglass.activate(&sample(1, 59, 59)));
        assert!(!hourglass.fill().is_flowing(0.01));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(surface.snapshot().attached_total, 0);
        assert_eq!(hourglass.stream_stats().spawned, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn empty_top_stays_empty_across_repeated_activations() {
        let (mut hourglass, surface) = controller();
        let empty = sample(1, 59, 59);
        for _ in 0..50 {
            hourglass.activate(&empty);
            tokio::time::sleep(Duration::from_millis(5)).await;
            hourglass.deactivate();
        }
        assert_eq!(surface.snapshot().attached_total, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_slots_turn_into_no_ops() {
        let mut hourglass = HourglassController::new(
            &SandglassConfig::default(),
            HourglassView::detached(),
        );
        assert!(hourglass.activate(&sample(3, 15, 0)));
        assert!(hourglass.markers().is_empty());
        let fill = hourglass.tick(&sample(3, 15, 0)).unwrap();
        assert!((fill.bottom_fraction - 0.25).abs() < 1e-12);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hourglass.stream_stats().spawned, 0);
        assert!(hourglass.deactivate().is_some());
    }
}
