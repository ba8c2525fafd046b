// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Logical clock for stamping submissions.
//!
//! The engine stamps every accepted operation with a Lamport time. Clients
//! that already carry a timestamp push the clock forward; clients that don't
//! simply get the next tick. Either way the stamps of accepted operations are
//! strictly increasing, which gives the history a total order that does not
//! depend on wall time.
//!
//! Complexity:
//! - tick: O(1)
//! - update: O(1)

/// A Lamport clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LamportClock {
    time: u64,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Create a clock with a specific starting time.
    pub fn with_time(time: u64) -> LamportClock {
        return LamportClock { time };
    }

    /// Get the current time.
    #[inline]
    pub fn time(&self) -> u64 {
        return self.time;
    }

    /// Increment the clock for a local event. Saturates at `u64::MAX`.
    /// Returns the new time.
    #[inline]
    pub fn tick(&mut self) -> u64 {
        self.time = self.time.saturating_add(1);
        return self.time;
    }

    /// Sets local time to max(local, remote) + 1.
    /// Returns the new time.
    #[inline]
    pub fn update(&mut self, remote_time: u64) -> u64 {
        self.time = self.time.max(remote_time).saturating_add(1);
        return self.time;
    }

    /// Stamp an incoming event. A zero remote time means "unstamped".
    #[inline]
    pub fn stamp(&mut self, remote_time: u64) -> u64 {
        if remote_time == 0 {
            return self.tick();
        }
        return self.update(remote_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lamport_tick() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.time(), 0);

        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
        assert_eq!(clock.time(), 2);
    }

    #[test]
    fn lamport_update() {
        let mut clock = LamportClock::new();
        clock.tick();

        assert_eq!(clock.update(5), 6);
        assert_eq!(clock.update(3), 7);
        assert_eq!(clock.time(), 7);
    }

    #[test]
    fn stamp_unstamped_ticks() {
        let mut clock = LamportClock::with_time(4);
        assert_eq!(clock.stamp(0), 5);
        assert_eq!(clock.stamp(20), 21);
        assert_eq!(clock.stamp(0), 22);
    }

    #[test]
    fn saturates_at_max() {
        let mut clock = LamportClock::new();
        assert_eq!(clock.stamp(u64::MAX), u64::MAX);
        assert_eq!(clock.tick(), u64::MAX);
        assert_eq!(clock.update(3), u64::MAX);
    }
}
