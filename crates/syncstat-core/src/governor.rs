//! Throughput governor pacing outbound dispatches

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Interval a throughput cap applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    #[default]
    Second,
    Minute,
    Hour,
    Day,
}

impl Window {
    pub fn duration(self) -> Duration {
        match self {
            Self::Second => Duration::from_secs(1),
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(60 * 60),
            Self::Day => Duration::from_secs(24 * 60 * 60),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Second => "second",
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "second" => Ok(Self::Second),
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(format!(
                "unknown window {other:?}, expected one of second/minute/hour/day"
            )),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most `files` dispatches per `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub files: u32,
    #[serde(default)]
    pub per: Window,
}

impl Throughput {
    pub fn new(files: u32, per: Window) -> Self {
        Self { files, per }
    }
}

/// Time source for the governor.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Burst-then-pause rate limiter.
///
/// Counts dispatches in the current window. Once the count reaches the
/// cap, [`tick`](Self::tick) blocks until a full window has passed since
/// the window opened, then opens a new one. Spacing inside a window is
/// not smoothed.
#[derive(Debug)]
pub struct Throttle<C: Clock = SystemClock> {
    rate: Option<Throughput>,
    count: u32,
    window_start: Instant,
    clock: C,
}

impl Throttle<SystemClock> {
    pub fn new(rate: Option<Throughput>) -> Self {
        Self::with_clock(rate, SystemClock)
    }

    /// A throttle that never waits.
    pub fn unlimited() -> Self {
        Self::new(None)
    }
}

impl<C: Clock> Throttle<C> {
    pub fn with_clock(rate: Option<Throughput>, clock: C) -> Self {
        let window_start = clock.now();
        Self {
            rate,
            count: 0,
            window_start,
            clock,
        }
    }

    /// Account for one completed dispatch.
    ///
    /// Returns how long the call blocked.
    pub fn tick(&mut self) -> Duration {
        let Some(rate) = self.rate else {
            return Duration::ZERO;
        };
        self.count += 1;
        if self.count < rate.files {
            return Duration::ZERO;
        }

        let elapsed = self.clock.now().saturating_duration_since(self.window_start);
        let wait = rate.per.duration().saturating_sub(elapsed);
        if !wait.is_zero() {
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                files = rate.files,
                per = %rate.per,
                "Throughput cap reached, pausing"
            );
            self.clock.sleep(wait);
        }
        self.count = 0;
        self.window_start = self.clock.now();
        wait
    }

    pub fn rate(&self) -> Option<Throughput> {
        self.rate
    }
}
