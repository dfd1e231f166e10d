//! # Sandglass
//!
//! An animated hourglass clock engine for Rust.
//!
//! Sandglass turns wall-clock time into the state of an hourglass: how much
//! sand remains in the top chamber, a continuous trickle of falling grains
//! while sand remains, and a 60-position dial of minute and hour markers
//! around the waist. The presentation layer is pluggable; the engine only
//! talks to a set of visual slots.
//!
//! ## Core Concepts
//!
//! - **SystemClock**: A 1-second ticker that samples a `TimeSource` and is the
//!   single driver of fill and dial updates.
//! - **ParticleStream**: A higher-frequency animation loop that spawns grains at
//!   the neck and moves them along a closed-form falling path. It is gated only by
//!   the most recent fill reading.
//! - **HourglassController**: Binds the fill model, the dial and the particle
//!   stream to style-selection events (`activate` / `deactivate` / `tick`).
//! - **Visual slots**: `FillRegion`, `ParticleLayer` and `DialHost` are traits the
//!   presentation layer implements. Any slot may be absent, in which case the
//!   operations touching it quietly do nothing.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sandglass::prelude::*;
//! use sandglass::surface::MemorySurface;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load configuration (defaults, optional file, environment).
//!     let config = SandglassConfig::load(None)?;
//!
//!     // 2. Build the visual slots. `MemorySurface` just records what it is told.
//!     let surface = MemorySurface::new(ContainerGeometry::new(200.0, 300.0));
//!     let engine = SandglassEngine::new(config, surface.view());
//!
//!     // 3. Subscribe before running.
//!     let mut hourglass_events = engine.subscribe_hourglass_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = hourglass_events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//!
//!     // 4. Switch to the hourglass and run until Ctrl+C.
//!     engine.select_style(ClockStyle::Hourglass);
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Sandglass Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod common;
pub mod config;
pub mod controller;
pub mod dial;
pub mod engine;
pub mod events;
pub mod faces;
pub mod fill;
pub mod particle;
pub mod stream;
pub mod surface;
pub mod time;

/// A prelude module for easy importing of the most common Sandglass types.
pub mod prelude {
    pub use crate::common::ParticleId;
    pub use crate::config::{ClockResolution, DialConfig, ParticleConfig, SandglassConfig};
    pub use crate::controller::HourglassController;
    pub use crate::dial::{DialMarker, DialMarkerSet, MarkerKind};
    pub use crate::engine::SandglassEngine;
    pub use crate::events::{FaceEvent, HourglassEvent, SystemEvent};
    pub use crate::faces::{ClockStyle, FaceReadout};
    pub use crate::fill::FillState;
    pub use crate::stream::ParticleStream;
    pub use crate::surface::{ContainerGeometry, HourglassView};
    pub use crate::time::{LocalTimeSource, TimeSample, TimeSource};
}
