//! Defines all public event types broadcast by the Sandglass engine.
//!
//! Listeners subscribe to these strongly-typed streams to observe the clock;
//! the visual slots receive the actual drawing calls.

use crate::faces::{ClockStyle, FaceReadout};
use crate::fill::FillState;
use crate::stream::StreamStats;
use crate::time::TimeSample;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine's `run` loop is about to exit.
    EngineShutdown,
    /// Fired when the selected style actually changes.
    StyleChanged { from: ClockStyle, to: ClockStyle },
}

/// Events describing the hourglass widget.
#[derive(Debug, Clone)]
pub enum HourglassEvent {
    /// The dial was laid out and the particle stream started.
    Activated,
    /// The particle stream was stopped and the dial cleared.
    Deactivated { particles: StreamStats },
    /// Fired on every tick while the hourglass is active.
    Updated {
        sample: TimeSample,
        fill: FillState,
        particles: StreamStats,
    },
}

/// A face readout for the active non-hourglass style.
#[derive(Debug, Clone)]
pub struct FaceEvent {
    pub style: ClockStyle,
    pub sample: TimeSample,
    pub readout: FaceReadout,
}
