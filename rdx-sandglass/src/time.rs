//! Wall-clock sampling and the 1-second `SystemClock`.
//!
//! The engine never reads ambient time directly. A `TimeSource` is injected
//! and sampled once per tick; the resulting `TimeSample` is the only notion of
//! "now" the fill model, the dial and the faces ever see.

use chrono::{Datelike, Local, Timelike, Weekday};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// One reading of the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    /// 0..=23
    pub hours: u8,
    /// 0..=59
    pub minutes: u8,
    /// 0..=59
    pub seconds: u8,
    pub weekday: Weekday,
}

impl TimeSample {
    /// Builds a sample, wrapping out-of-range fields into their valid ranges.
    pub fn new(hours: u8, minutes: u8, seconds: u8, weekday: Weekday) -> Self {
        Self {
            hours: hours % 24,
            minutes: minutes % 60,
            seconds: seconds % 60,
            weekday,
        }
    }

    /// Samples any chrono date-time.
    pub fn from_datetime<T: Datelike + Timelike>(now: &T) -> Self {
        Self::new(
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
            now.weekday(),
        )
    }

    /// Seconds elapsed since the top of the current hour, `0..3600`.
    pub fn seconds_into_hour(&self) -> u32 {
        u32::from(self.minutes) * 60 + u32::from(self.seconds)
    }

    /// Returns the sample `secs` seconds later, rolling over hours, days and weekdays.
    pub fn advanced_by(&self, secs: u32) -> Self {
        let day_secs = u32::from(self.hours) * 3600 + self.seconds_into_hour();
        let total = day_secs + secs;
        let mut weekday = self.weekday;
        for _ in 0..(total / 86_400) % 7 {
            weekday = weekday.succ();
        }
        let rem = total % 86_400;
        Self {
            hours: (rem / 3600) as u8,
            minutes: ((rem % 3600) / 60) as u8,
            seconds: (rem % 60) as u8,
            weekday,
        }
    }
}

/// Supplies the current wall-clock time.
pub trait TimeSource: Send + Sync {
    fn sample(&self) -> TimeSample;
}

/// Reads the host clock in the host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTimeSource;

impl TimeSource for LocalTimeSource {
    fn sample(&self) -> TimeSample {
        TimeSample::from_datetime(&Local::now())
    }
}

/// A manually driven clock, used by tests and the shell's `time` command.
#[derive(Debug)]
pub struct FixedTimeSource {
    current: Mutex<TimeSample>,
}

impl FixedTimeSource {
    pub fn new(sample: TimeSample) -> Self {
        Self {
            current: Mutex::new(sample),
        }
    }

    pub fn set(&self, sample: TimeSample) {
        *self.current.lock() = sample;
    }

    pub fn advance(&self, secs: u32) {
        let mut current = self.current.lock();
        *current = current.advanced_by(secs);
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&self) -> TimeSample {
        *self.current.lock()
    }
}

/// A single beat of the `SystemClock`.
#[derive(Debug, Clone)]
pub struct TickEvent {
    pub tick_count: u64,
    pub timestamp: Instant,
    pub sample: TimeSample,
}

/// The 1-second ticker. Samples the time source on every beat and
/// broadcasts the result.
pub(crate) struct SystemClock {
    period: Duration,
    source: Arc<dyn TimeSource>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SystemClock {
    pub(crate) fn new(
        period: Duration,
        source: Arc<dyn TimeSource>,
        tick_sender: broadcast::Sender<Arc<TickEvent>>,
    ) -> Self {
        Self {
            period,
            source,
            tick_sender,
        }
    }

    pub(crate) async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick_count: u64 = 0;
        debug!("SystemClock started with a {:?} period.", self.period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                timestamp = ticker.tick() => {
                    tick_count += 1;
                    let sample = self.source.sample();
                    trace!("Tick #{} at {:02}:{:02}:{:02}.", tick_count, sample.hours, sample.minutes, sample.seconds);
                    self.tick_sender
                        .send(Arc::new(TickEvent { tick_count, timestamp, sample }))
                        .ok();
                }
            }
        }
        debug!("SystemClock stopped after {} ticks.", tick_count);
    }
}
