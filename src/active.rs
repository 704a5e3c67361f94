//! Shared count of vehicles still racing in the current leg.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::types::LegId;

struct ActiveState {
    remaining: usize,
    leg: LegId,
}

/// Injected into every vehicle task; the only state written by more than one
/// vehicle.
pub struct ActiveCount {
    state: Mutex<ActiveState>,
    settled: Condvar,
}

impl ActiveCount {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ActiveState {
                remaining: 0,
                leg: 0,
            }),
            settled: Condvar::new(),
        }
    }

    /// Open a new leg with `vehicles` racers and return its id.
    pub fn reset(&self, vehicles: usize) -> LegId {
        let mut guard = self.state.lock().expect("active count mutex poisoned");
        guard.leg += 1;
        guard.remaining = vehicles;
        self.settled.notify_all();
        guard.leg
    }

    /// Record that one vehicle finished `leg`.
    ///
    /// Finishes reported against a superseded leg are ignored and return false.
    pub fn finish(&self, leg: LegId) -> bool {
        let mut guard = self.state.lock().expect("active count mutex poisoned");
        if guard.leg != leg || guard.remaining == 0 {
            return false;
        }
        guard.remaining -= 1;
        if guard.remaining == 0 {
            self.settled.notify_all();
        }
        true
    }

    pub fn remaining(&self) -> usize {
        self.state
            .lock()
            .expect("active count mutex poisoned")
            .remaining
    }

    /// Block until no vehicle is racing or `timeout` elapses.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.lock().expect("active count mutex poisoned");
        loop {
            if guard.remaining == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .settled
                .wait_timeout(guard, deadline - now)
                .expect("condvar wait failed")
                .0;
        }
    }
}

impl Default for ActiveCount {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn concurrent_finishes_each_count_once() {
        let active = Arc::new(ActiveCount::new());
        let racers = 8;
        let leg = active.reset(racers);
        let barrier = Arc::new(Barrier::new(racers));

        let mut handles = Vec::new();
        for _ in 0..racers {
            let active = Arc::clone(&active);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                assert!(active.finish(leg));
            }));
        }
        for handle in handles {
            handle.join().expect("racer thread panicked");
        }
        assert_eq!(active.remaining(), 0);
        // Extra finishes never underflow.
        assert!(!active.finish(leg));
        assert_eq!(active.remaining(), 0);
    }

    #[test]
    fn stale_leg_finish_is_ignored() {
        let active = ActiveCount::new();
        let first = active.reset(2);
        let second = active.reset(2);
        assert_ne!(first, second);
        assert!(!active.finish(first));
        assert_eq!(active.remaining(), 2);
        assert!(active.finish(second));
        assert_eq!(active.remaining(), 1);
    }

    #[test]
    fn wait_until_settled_wakes_on_last_finish() {
        let active = Arc::new(ActiveCount::new());
        let leg = active.reset(1);
        let finisher = {
            let active = Arc::clone(&active);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                active.finish(leg);
            })
        };
        assert!(active.wait_until_settled(Duration::from_secs(2)));
        finisher.join().expect("finisher panicked");
    }

    #[test]
    fn wait_until_settled_times_out() {
        let active = ActiveCount::new();
        active.reset(1);
        assert!(!active.wait_until_settled(Duration::from_millis(20)));
    }
}
