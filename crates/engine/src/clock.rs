//! Wall and fixed clocks.
//!
//! Deterministic mode threads a fixed clock through every component so two
//! runs with identical inputs serialize to byte-identical reports.

use chrono::{DateTime, TimeZone, Utc};
use std::time::Instant;

/// Epoch used by the fixed clock: 2023-11-14T22:13:20Z.
const FIXED_EPOCH_MS: i64 = 1_700_000_000_000;

/// Duration reported by every fixed-clock stopwatch.
const FIXED_TICK_MS: u64 = 1;

/// Time source for timestamps and step durations.
#[derive(Debug)]
pub enum Clock {
    /// Real wall-clock time.
    Wall,
    /// Frozen time for regression and golden-file testing.
    Fixed { epoch_ms: i64 },
}

impl Clock {
    /// Fixed clock at the default epoch.
    pub fn fixed() -> Self {
        Clock::Fixed {
            epoch_ms: FIXED_EPOCH_MS,
        }
    }

    /// Select a clock for the given determinism setting.
    pub fn for_mode(deterministic: bool) -> Self {
        if deterministic {
            Clock::fixed()
        } else {
            Clock::Wall
        }
    }

    /// Current time.
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Wall => Utc::now(),
            Clock::Fixed { epoch_ms } => Utc
                .timestamp_millis_opt(*epoch_ms)
                .single()
                .unwrap_or_else(Utc::now),
        }
    }

    /// Start measuring a duration.
    pub fn stopwatch(&self) -> Stopwatch {
        match self {
            Clock::Wall => Stopwatch::Wall(Instant::now()),
            Clock::Fixed { .. } => Stopwatch::Fixed,
        }
    }
}

/// In-flight duration measurement from [`Clock::stopwatch`].
#[derive(Debug)]
pub enum Stopwatch {
    Wall(Instant),
    Fixed,
}

impl Stopwatch {
    /// Elapsed milliseconds since the stopwatch was started.
    pub fn elapsed_ms(&self) -> u64 {
        match self {
            Stopwatch::Wall(start) => start.elapsed().as_millis() as u64,
            Stopwatch::Fixed => FIXED_TICK_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let clock = Clock::fixed();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.stopwatch().elapsed_ms(), 1);
    }

    #[test]
    fn fixed_epoch_renders_rfc3339() {
        let clock = Clock::fixed();
        assert_eq!(clock.now().to_rfc3339(), "2023-11-14T22:13:20+00:00");
    }
}
