use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// One-way flag telling a periodic thread its work is no longer needed.
///
/// The thread sleeps on the flag between cycles, so raising it wakes the
/// thread right away instead of after the rest of its period.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Sleeps for `timeout` or until stopped. Returns whether the signal was
    /// raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        match Instant::now().checked_add(timeout) {
            Some(deadline) => {
                while !*stopped {
                    if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
            }
            None => {
                while !*stopped {
                    self.wake.wait(&mut stopped);
                }
            }
        }
        *stopped
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn times_out_when_not_stopped() {
        let signal = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn stop_wakes_a_long_sleep() {
        let signal = Arc::new(StopSignal::new());
        let sleeper = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait_timeout(Duration::from_secs(3600)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.stop();
        assert!(sleeper.join().unwrap());
        // stays raised for later cycles
        assert!(signal.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn already_stopped_returns_immediately() {
        let signal = StopSignal::new();
        signal.stop();
        assert!(signal.wait_timeout(Duration::MAX));
    }
}
