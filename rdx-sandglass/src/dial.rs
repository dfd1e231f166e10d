//! The 60-position dial drawn around the hourglass waist.
//!
//! Every fifth slot is an hour marker; all 60 slots double as minute markers.
//! Markers carry separate hour and minute activation flags so that a slot can
//! be the current hour and the current minute at the same time (e.g. 03:15).

use crate::config::DialConfig;
use crate::surface::ContainerGeometry;
use crate::time::TimeSample;
use tracing::debug;

pub const MARKER_COUNT: usize = 60;
pub const HOUR_MARKER_COUNT: usize = 12;
const HOUR_STRIDE: usize = MARKER_COUNT / HOUR_MARKER_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    HourMark,
    MinuteMark,
}

/// A point in container units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialMarker {
    pub index: usize,
    pub kind: MarkerKind,
    pub position: Point,
    pub hour_active: bool,
    pub minute_active: bool,
}

impl DialMarker {
    pub fn is_active(&self) -> bool {
        self.hour_active || self.minute_active
    }
}

/// Owns the 60 dial markers between `init` and `clear`.
#[derive(Debug, Default)]
pub struct DialMarkerSet {
    radius_ratio: f64,
    markers: Vec<DialMarker>,
    /// Indices into `markers`, ordered by hour (0..12).
    hour_markers: Vec<usize>,
    /// Indices into `markers`, ordered by minute (0..60).
    minute_markers: Vec<usize>,
}

impl DialMarkerSet {
    pub fn new(config: &DialConfig) -> Self {
        Self {
            radius_ratio: config.radius_ratio,
            ..Self::default()
        }
    }

    /// Lays out 60 markers on a circle centred in the container, index 0 at
    /// the top and proceeding clockwise. Replaces any previous markers.
    pub fn init(&mut self, geometry: ContainerGeometry) {
        self.clear();
        let cx = geometry.width / 2.0;
        let cy = geometry.height / 2.0;
        let radius = self.radius_ratio * geometry.width.min(geometry.height) / 2.0;

        for index in 0..MARKER_COUNT {
            let degrees = (index as f64 / MARKER_COUNT as f64) * 360.0 - 90.0;
            let radians = degrees.to_radians();
            let kind = if index % HOUR_STRIDE == 0 {
                MarkerKind::HourMark
            } else {
                MarkerKind::MinuteMark
            };
            if kind == MarkerKind::HourMark {
                self.hour_markers.push(index);
            }
            self.minute_markers.push(index);
            self.markers.push(DialMarker {
                index,
                kind,
                position: Point {
                    x: cx + radius * radians.cos(),
                    y: cy + radius * radians.sin(),
                },
                hour_active: false,
                minute_active: false,
            });
        }
        debug!(
            "Dial initialised: {} markers, radius {:.1}.",
            self.markers.len(),
            radius
        );
    }

    /// Marks the current minute and hour. Does nothing before `init`.
    pub fn update(&mut self, sample: &TimeSample) {
        if self.markers.is_empty() {
            return;
        }
        let minute = usize::from(sample.minutes);
        for (ordinal, &slot) in self.minute_markers.iter().enumerate() {
            self.markers[slot].minute_active = ordinal == minute;
        }
        let hour = usize::from(sample.hours) % HOUR_MARKER_COUNT;
        for (ordinal, &slot) in self.hour_markers.iter().enumerate() {
            self.markers[slot].hour_active = ordinal == hour;
        }
    }

    pub fn clear(&mut self) {
        self.markers.clear();
        self.hour_markers.clear();
        self.minute_markers.clear();
    }

    pub fn markers(&self) -> &[DialMarker] {
        &self.markers
    }

    pub fn is_initialized(&self) -> bool {
        !self.markers.is_empty()
    }
}
