//! Clock styles and the stateless faces.
//!
//! Only the hourglass carries state. The other four styles are plain
//! projections of a `TimeSample` that a presentation layer copies onto its
//! elements once per tick.

use crate::time::TimeSample;
use chrono::Weekday;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Circumference used for the circular face's progress arcs.
pub const CIRCLE_CIRCUMFERENCE: f64 = 283.0;

/// The selectable clock styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockStyle {
    Digital,
    #[default]
    Analog,
    Circular,
    Flip,
    Hourglass,
}

impl ClockStyle {
    pub const ALL: [ClockStyle; 5] = [
        ClockStyle::Digital,
        ClockStyle::Analog,
        ClockStyle::Circular,
        ClockStyle::Flip,
        ClockStyle::Hourglass,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClockStyle::Digital => "digital",
            ClockStyle::Analog => "analog",
            ClockStyle::Circular => "circular",
            ClockStyle::Flip => "flip",
            ClockStyle::Hourglass => "hourglass",
        }
    }
}

impl fmt::Display for ClockStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a style name matches none of the known styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStyle(pub String);

impl fmt::Display for UnknownStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown clock style '{}'", self.0)
    }
}

impl std::error::Error for UnknownStyle {}

impl FromStr for ClockStyle {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "digital" => Ok(ClockStyle::Digital),
            "analog" => Ok(ClockStyle::Analog),
            "circular" => Ok(ClockStyle::Circular),
            "flip" | "flip-card" | "flipcard" => Ok(ClockStyle::Flip),
            "hourglass" => Ok(ClockStyle::Hourglass),
            _ => Err(UnknownStyle(s.to_string())),
        }
    }
}

/// What a non-hourglass face shows for one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceReadout {
    Digital {
        day: &'static str,
        hours: String,
        minutes: String,
        seconds: String,
    },
    Analog {
        hour_degrees: f64,
        minute_degrees: f64,
        second_degrees: f64,
    },
    Circular {
        hours: String,
        minutes: String,
        seconds: String,
        hour_arc: f64,
        minute_arc: f64,
        second_arc: f64,
    },
    Flip {
        cards: [FlipCard; 3],
    },
}

/// One card of the flip face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipCard {
    pub value: String,
    /// Whether this card shows a different value than on the previous readout.
    pub flipped: bool,
}

pub fn two_digits(value: u8) -> String {
    format!("{:02}", value)
}

pub fn day_abbreviation(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SUN",
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
    }
}

fn degrees(value: f64, max: f64) -> f64 {
    value / max * 360.0
}

fn arc(value: f64, max: f64) -> f64 {
    value / max * CIRCLE_CIRCUMFERENCE
}

/// Projects a sample onto a face. `previous` is the last sample the flip face
/// was shown, used to decide which cards flip. Returns `None` for the hourglass.
pub fn project(
    style: ClockStyle,
    sample: &TimeSample,
    previous: Option<&TimeSample>,
) -> Option<FaceReadout> {
    let h = f64::from(sample.hours);
    let m = f64::from(sample.minutes);
    let s = f64::from(sample.seconds);
    let readout = match style {
        ClockStyle::Digital => FaceReadout::Digital {
            day: day_abbreviation(sample.weekday),
            hours: two_digits(sample.hours),
            minutes: two_digits(sample.minutes),
            seconds: two_digits(sample.seconds),
        },
        ClockStyle::Analog => FaceReadout::Analog {
            hour_degrees: degrees(h + m / 60.0, 12.0),
            minute_degrees: degrees(m + s / 60.0, 60.0),
            second_degrees: degrees(s, 60.0),
        },
        ClockStyle::Circular => FaceReadout::Circular {
            hours: two_digits(sample.hours),
            minutes: two_digits(sample.minutes),
            seconds: two_digits(sample.seconds),
            hour_arc: arc(f64::from(sample.hours % 12), 12.0),
            minute_arc: arc(m, 60.0),
            second_arc: arc(s, 60.0),
        },
        ClockStyle::Flip => {
            let card = |now: u8, before: Option<u8>| FlipCard {
                value: two_digits(now),
                flipped: before.map_or(true, |b| b != now),
            };
            FaceReadout::Flip {
                cards: [
                    card(sample.hours, previous.map(|p| p.hours)),
                    card(sample.minutes, previous.map(|p| p.minutes)),
                    card(sample.seconds, previous.map(|p| p.seconds)),
                ],
            }
        }
        ClockStyle::Hourglass => return None,
    };
    Some(readout)
}
