//! Clock abstraction for deterministic tests of timeout and debounce logic.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source used by every component that waits, debounces or times out.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

#[derive(Default)]
pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock for tests: `sleep` just advances the recorded time instead
/// of blocking the thread.
pub struct TestClock {
    current: Mutex<Instant>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut t = self.current.lock().unwrap();
        *t += duration;
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

pub type SharedClock = std::sync::Arc<dyn Clock>;

pub fn real_clock() -> SharedClock {
    std::sync::Arc::new(RealClock)
}

pub fn test_clock() -> SharedClock {
    std::sync::Arc::new(TestClock::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_on_sleep() {
        let clock = TestClock::new();
        let t0 = clock.now();
        clock.sleep(Duration::from_millis(250));
        assert_eq!(clock.now(), t0 + Duration::from_millis(250));
    }
}
