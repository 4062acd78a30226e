use time::{OffsetDateTime, Time, UtcOffset};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> OffsetDateTime;

    /// The current instant in the fixed civil-time offset.
    fn now_local(&self, offset: UtcOffset) -> OffsetDateTime {
        self.now_utc().to_offset(offset)
    }
}

/// Wall-clock time of `now` truncated to whole seconds.
pub fn wall_time(now: OffsetDateTime) -> Time {
    let (h, m, s) = now.to_hms();
    Time::from_hms(h, m, s).unwrap_or(Time::MIDNIGHT)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
pub use fixed::FixedClock;
