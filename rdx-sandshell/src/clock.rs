//! The shell's time source: the host clock, unless pinned with `time set`.

use chrono::{Datelike, Local};
use parking_lot::Mutex;
use sandglass::time::{LocalTimeSource, TimeSample, TimeSource};

#[derive(Default)]
pub struct ShellClock {
    pinned: Mutex<Option<TimeSample>>,
}

impl ShellClock {
    pub fn pin(&self, sample: TimeSample) {
        *self.pinned.lock() = Some(sample);
    }

    pub fn unpin(&self) {
        *self.pinned.lock() = None;
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned.lock().is_some()
    }
}

impl TimeSource for ShellClock {
    fn sample(&self) -> TimeSample {
        match *self.pinned.lock() {
            Some(sample) => sample,
            None => LocalTimeSource.sample(),
        }
    }
}

/// Parses `HH:MM` or `HH:MM:SS` into a sample on today's weekday.
pub fn parse_clock_time(text: &str) -> Option<TimeSample> {
    let mut parts = text.trim().split(':');
    let hours: u8 = parts.next()?.parse().ok()?;
    let minutes: u8 = parts.next()?.parse().ok()?;
    let seconds: u8 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some() || hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }
    Some(TimeSample::new(
        hours,
        minutes,
        seconds,
        Local::now().weekday(),
    ))
}
