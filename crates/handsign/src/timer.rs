//! Performance measurement tools.

use std::{
    fmt,
    time::{Duration, Instant},
};

/// A timer that can measure and average the time an operation takes.
///
/// The detector creates a fresh set of timers for every image it processes and logs them at
/// *trace* level when done.
pub struct Timer {
    name: &'static str,
    total: Duration,
    count: u32,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Duration::ZERO,
            count: 0,
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&mut self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    /// Returns the number of recorded measurements.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Returns the average duration of all recorded measurements.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total / self.count
        }
    }

    fn stop(&mut self, start: Instant) {
        self.total += start.elapsed();
        self.count += 1;
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let avg_ms = self.average().as_secs_f32() * 1000.0;
        write!(f, "{}: {}x{avg_ms:.01}ms", self.name, self.count)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a mut Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_measurements() {
        let mut timer = Timer::new("work");
        assert_eq!(timer.to_string(), "work: 0x0.0ms");

        let value = timer.time(|| 7);
        assert_eq!(value, 7);
        timer.time(|| ());
        assert_eq!(timer.count(), 2);
        assert!(timer.to_string().starts_with("work: 2x"));
    }
}
