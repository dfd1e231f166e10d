//! Contains common, primitive types shared across the engine.
//!
//! Positions inside the hourglass are expressed in percent of the hourglass
//! box (x from the left edge, y from the top edge), while dial geometry is in
//! the container's own units.

use slotmap::new_key_type;

new_key_type! {
    /// Uniquely identifies a live sand particle.
    ///
    /// Keys are handed to the `ParticleLayer` when a particle's visual element
    /// is created and are never reused for a different particle, so a layer
    /// cannot confuse a retired grain with a new one.
    pub struct ParticleId;
}

/// A position in percent of the hourglass box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentPos {
    pub x: f64,
    pub y: f64,
}

impl PercentPos {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Linear interpolation towards `to` by factor `t`.
    pub fn lerp(self, to: PercentPos, t: f64) -> PercentPos {
        PercentPos {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Clamps a fraction into `[0, 1]`, mapping NaN to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
