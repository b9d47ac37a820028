//! Injected time source and the auto-sync timer.
//!
//! The timer never fires on its own: the host event loop calls
//! `Repository::tick()`, which asks the timer whether a period elapsed.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-clock backed `Clock`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.elapsed.get()
    }
}

/// Fixed-period timer polled by its owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoSyncTimer {
    period: Duration,
    next_due: Option<Duration>,
}

impl AutoSyncTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer; restarting re-bases the next deadline on `now`.
    pub fn start(&mut self, now: Duration, period: Duration) {
        self.period = period;
        self.next_due = Some(now + period);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns `true` once per elapsed period. Missed periods collapse into
    /// a single firing.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoSyncTimer, Clock, ManualClock};
    use std::time::Duration;

    #[test]
    fn fires_once_per_period_and_collapses_missed_periods() {
        let clock = ManualClock::new();
        let mut timer = AutoSyncTimer::new();
        timer.start(clock.now(), Duration::from_secs(30));

        clock.advance(Duration::from_secs(29));
        assert!(!timer.poll(clock.now()));

        clock.advance(Duration::from_secs(1));
        assert!(timer.poll(clock.now()));
        assert!(!timer.poll(clock.now()));

        clock.advance(Duration::from_secs(95));
        assert!(timer.poll(clock.now()));
        assert!(!timer.poll(clock.now()));
    }

    #[test]
    fn stopped_timer_never_fires() {
        let clock = ManualClock::new();
        let mut timer = AutoSyncTimer::new();
        timer.start(clock.now(), Duration::from_secs(1));
        timer.stop();

        clock.advance(Duration::from_secs(10));
        assert!(!timer.is_running());
        assert!(!timer.poll(clock.now()));
    }

    #[test]
    fn cloned_manual_clocks_share_time() {
        let clock = ManualClock::new();
        let observer = clock.clone();
        clock.advance(Duration::from_millis(250));
        assert_eq!(observer.now(), Duration::from_millis(250));
    }
}
