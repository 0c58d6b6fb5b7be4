use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session time in milliseconds since the map view was created.
///
/// The UI loop supplies it; nothing in the core reads a wall clock, so tests
/// advance it by hand.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time(pub u64);

impl Time {
    pub const ZERO: Time = Time(0);

    pub fn from_millis(ms: u64) -> Self {
        Time(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    pub fn after(self, delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Time(self.0.saturating_add(ms))
    }

    /// Elapsed time since `earlier`, zero if `earlier` is in the future.
    pub fn since(self, earlier: Time) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

#[cfg(test)]
mod tests {
    use super::Time;
    use std::time::Duration;

    #[test]
    fn after_and_since_are_inverse() {
        let t0 = Time::from_millis(1_000);
        let t1 = t0.after(Duration::from_millis(150));
        assert_eq!(t1, Time(1_150));
        assert_eq!(t1.since(t0), Duration::from_millis(150));
        assert_eq!(t0.since(t1), Duration::ZERO);
    }

    #[test]
    fn after_saturates() {
        assert_eq!(Time(u64::MAX - 1).after(Duration::from_secs(10)), Time(u64::MAX));
    }
}
