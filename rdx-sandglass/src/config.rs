//! Defines all configuration structures for the Sandglass engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`. Every field has a default, so an empty
//! document yields a working engine, and individual settings can be overridden
//! from the environment with a `SANDGLASS__` prefix
//! (e.g. `SANDGLASS__PARTICLES__SPAWN_PERIOD_MS=100`).

use crate::faces::ClockStyle;
use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// The top-level configuration for the `SandglassEngine`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandglassConfig {
    /// Period of the wall-clock tick that drives fill and dial updates.
    pub tick_interval_ms: u64,

    /// Frame cadence of the particle animation.
    pub resolution: ClockResolution,

    /// The style shown before the first selection event arrives.
    pub initial_style: ClockStyle,

    /// Spawn, path and timing settings for falling grains.
    pub particles: ParticleConfig,

    /// Dial layout settings.
    pub dial: DialConfig,
}

/// Defines the frame rate of the particle animation loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// ~60 frames per second, the display refresh target.
    High,
    /// ~30 frames per second.
    Medium,
    /// ~10 frames per second. Useful for terminals and slow hosts.
    Low,
    /// A user-defined frame rate.
    Custom { frames_per_second: u64 },
}

impl ClockResolution {
    pub fn frames_per_second(&self) -> u64 {
        match self {
            ClockResolution::High => 60,
            ClockResolution::Medium => 30,
            ClockResolution::Low => 10,
            ClockResolution::Custom { frames_per_second } => (*frames_per_second).max(1),
        }
    }

    /// Time between two animation frames.
    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.frames_per_second())
    }
}

/// Settings for the particle stream.
///
/// Positions are percentages of the hourglass box: `x` from the left edge,
/// `y` from the top edge.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    /// How often the spawn gate is evaluated.
    pub spawn_period_ms: u64,
    /// Shortest particle lifetime.
    pub min_duration_ms: u64,
    /// Lifetimes are drawn uniformly from `[min, min + spread]`.
    pub duration_spread_ms: u64,
    /// Particles spawn only while the top fraction is above this value.
    pub spawn_epsilon: f64,
    pub neck_x: f64,
    pub neck_y: f64,
    /// Grains start this far above the neck.
    pub start_offset: f64,
    /// Half-width of the random horizontal start jitter around `neck_x`.
    pub start_jitter: f64,
    /// Half-width of the random horizontal drift applied on the way down.
    pub end_drift: f64,
    pub chamber_min_x: f64,
    pub chamber_max_x: f64,
    /// Where grains come to rest in the bottom chamber.
    pub rest_y: f64,
    /// Fixed RNG seed. Leave unset for entropy-seeded randomness.
    pub seed: Option<u64>,
}

impl ParticleConfig {
    pub fn spawn_period(&self) -> Duration {
        Duration::from_millis(self.spawn_period_ms.max(1))
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration_ms.saturating_add(self.duration_spread_ms))
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            spawn_period_ms: 150,
            min_duration_ms: 1500,
            duration_spread_ms: 1000,
            spawn_epsilon: 0.01,
            neck_x: 50.0,
            neck_y: 50.0,
            start_offset: 2.0,
            start_jitter: 4.0,
            end_drift: 5.0,
            chamber_min_x: 25.0,
            chamber_max_x: 75.0,
            rest_y: 90.0,
            seed: None,
        }
    }
}

/// Settings for the 60-position dial.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DialConfig {
    /// Marker circle radius as a fraction of half the container's shorter side.
    pub radius_ratio: f64,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self { radius_ratio: 0.9 }
    }
}

impl Default for SandglassConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            resolution: ClockResolution::High,
            initial_style: ClockStyle::Analog,
            particles: ParticleConfig::default(),
            dial: DialConfig::default(),
        }
    }
}

impl SandglassConfig {
    /// Loads the configuration from defaults, an optional TOML file and the
    /// environment, in that order of precedence (later wins).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(
            Environment::with_prefix("SANDGLASS")
                .separator("__")
                .try_parsing(true),
        );
        let config = builder
            .build()
            .context("failed to assemble sandglass configuration")?;
        config
            .try_deserialize()
            .context("invalid sandglass configuration")
    }

    /// Parses a TOML document on top of the defaults.
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .context("failed to parse sandglass configuration")?
            .try_deserialize()
            .context("invalid sandglass configuration")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}
