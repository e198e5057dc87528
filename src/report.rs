//! Background progress reporting
//!
//! A single reporter thread wakes on a fixed interval and prints either a
//! "still listing" notice or the latest counter line. It reads the shared
//! counters without exclusivity; they are monotonic integers, so a slightly
//! stale line is fine for a progress display.

use crate::process::RunCounters;
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Timestamp format used on every progress line
const DT_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Default wake interval of the reporter
pub const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Single-use flag telling the reporter that enumeration is complete
///
/// Settable once; further calls to `set` are no-ops. Single writer, the
/// reporter only ever reads.
#[derive(Debug, Default)]
pub struct ReadySignal {
    set: AtomicBool,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark enumeration as complete. Idempotent, never unset.
    pub fn set(&self) {
        self.set.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }
}

/// Handle of the spawned reporter thread
pub struct StatusReporter {
    stop: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl StatusReporter {
    /// Spawn the reporter, printing a line every `interval`
    pub fn spawn(
        counters: Arc<RunCounters>,
        ready: Arc<ReadySignal>,
        interval: Duration,
    ) -> Self {
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let stop_inner = stop.clone();

        let handle = thread::spawn(move || {
            let (lock, condvar) = &*stop_inner;
            let mut stopped = lock.lock().unwrap();
            loop {
                // Condvar timeout instead of sleep so stop() is prompt
                let (guard, _) = condvar.wait_timeout(stopped, interval).unwrap();
                stopped = guard;
                if *stopped {
                    break;
                }

                let now = Local::now().format(DT_FORMAT);
                if ready.is_set() {
                    println!("{} {}", now, counters.summary());
                } else {
                    println!("{} Listing files, this might take a while...", now);
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the reporter and wait for its thread to finish
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn signal_stop(&self) {
        let (lock, condvar) = &*self.stop;
        if let Ok(mut stopped) = lock.lock() {
            *stopped = true;
        }
        condvar.notify_all();
    }
}

impl Drop for StatusReporter {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_ready_signal_transitions_once() {
        let signal = ReadySignal::new();
        assert!(!signal.is_set());
        signal.set();
        assert!(signal.is_set());
        // Setting again keeps it set
        signal.set();
        assert!(signal.is_set());
    }

    #[test]
    fn test_reporter_stops_promptly() {
        let counters = Arc::new(RunCounters::new());
        let ready = Arc::new(ReadySignal::new());
        let reporter = StatusReporter::spawn(counters, ready, Duration::from_secs(60));

        let started = Instant::now();
        reporter.stop();
        // Must not wait out the 60 s interval
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
