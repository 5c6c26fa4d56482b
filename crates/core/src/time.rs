use chrono::{DateTime, Duration, Utc};

/// Default exam length in seconds (five minutes).
pub const DEFAULT_EXAM_SECONDS: u32 = 300;

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }

    /// Returns true if this clock is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Clock::Fixed(_))
    }
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// How close the countdown is to running out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerUrgency {
    Normal,
    /// Two minutes or less left.
    Warning,
    /// One minute or less left.
    Critical,
}

impl TimerUrgency {
    #[must_use]
    pub fn from_remaining(remaining_secs: u32) -> Self {
        if remaining_secs <= 60 {
            TimerUrgency::Critical
        } else if remaining_secs <= 120 {
            TimerUrgency::Warning
        } else {
            TimerUrgency::Normal
        }
    }
}

/// Formats a countdown as `MM:SS`; minutes are not wrapped at 60.
#[must_use]
pub fn format_countdown(remaining_secs: u32) -> String {
    format!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60)
}

//
// ─── TEST HELPERS ──────────────────────────────────────────────────────────────
//

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_is_zero_padded() {
        assert_eq!(format_countdown(300), "05:00");
        assert_eq!(format_countdown(61), "01:01");
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(3_600), "60:00");
    }

    #[test]
    fn urgency_thresholds() {
        assert_eq!(TimerUrgency::from_remaining(121), TimerUrgency::Normal);
        assert_eq!(TimerUrgency::from_remaining(120), TimerUrgency::Warning);
        assert_eq!(TimerUrgency::from_remaining(60), TimerUrgency::Critical);
        assert_eq!(TimerUrgency::from_remaining(0), TimerUrgency::Critical);
    }

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(5));
        assert!(clock.is_fixed());
    }
}
