//! The hourglass fill model: wall-clock time to sand levels.
//!
//! The top chamber empties linearly over one hour and refills at the top of
//! the next one. The model is a pure function of the sample's minutes and
//! seconds.

use crate::common::clamp_unit;
use crate::time::TimeSample;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Proportion of sand in each chamber.
///
/// `top_fraction + bottom_fraction == 1.0` within floating tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillState {
    pub top_fraction: f64,
    pub bottom_fraction: f64,
}

impl FillState {
    /// All sand in the top chamber, as at the top of the hour.
    pub const FULL: FillState = FillState {
        top_fraction: 1.0,
        bottom_fraction: 0.0,
    };

    /// Derives the fill levels from a time sample.
    pub fn compute(sample: &TimeSample) -> Self {
        let elapsed = sample.seconds_into_hour().min(3599);
        let ratio = f64::from(elapsed) / SECONDS_PER_HOUR;
        Self {
            top_fraction: clamp_unit(1.0 - ratio),
            bottom_fraction: clamp_unit(ratio),
        }
    }

    /// Height of the top sand region, `0..=100`.
    pub fn top_percent(&self) -> f64 {
        clamp_unit(self.top_fraction) * 100.0
    }

    /// Height of the bottom sand region, `0..=100`.
    pub fn bottom_percent(&self) -> f64 {
        clamp_unit(self.bottom_fraction) * 100.0
    }

    /// Whether grains should still be falling.
    pub fn is_flowing(&self, epsilon: f64) -> bool {
        self.top_fraction > epsilon
    }
}

impl Default for FillState {
    fn default() -> Self {
        Self::FULL
    }
}
