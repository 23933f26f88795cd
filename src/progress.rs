//! # Progress — Atomic Sieve Progress Counters
//!
//! Thread-safe progress tracking shared between worker threads and the
//! background status reporter. Counters use atomics for lock-free updates
//! from parallel CPU/GPU workers; only the watermark snapshot needs a
//! cross-thread read of the supervisor's reconciled state.
//!
//! ## Background Reporter
//!
//! A dedicated thread logs progress every 30 seconds: primes tested,
//! factors found, sieve rate, and terms remaining. Shuts down cleanly via
//! the `shutdown` atomic flag.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct Progress {
    pub primes_tested: AtomicU64,
    pub factors_found: AtomicU64,
    pub watermark: AtomicU64,
    pub terms_remaining: AtomicU64,
    start: Instant,
    shutdown: AtomicBool,
}

impl Progress {
    pub fn new(initial_terms: u64) -> Arc<Self> {
        Arc::new(Progress {
            primes_tested: AtomicU64::new(0),
            factors_found: AtomicU64::new(0),
            watermark: AtomicU64::new(0),
            terms_remaining: AtomicU64::new(initial_terms),
            start: Instant::now(),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn start_reporter(self: &Arc<Self>) -> thread::JoinHandle<()> {
        let progress = Arc::clone(self);
        thread::spawn(move || loop {
            thread::sleep(Duration::from_secs(30));
            if progress.shutdown.load(Ordering::Relaxed) {
                break;
            }
            progress.log_status();
        })
    }

    pub fn log_status(&self) {
        let elapsed = self.start.elapsed();
        let tested = self.primes_tested.load(Ordering::Relaxed);
        let found = self.factors_found.load(Ordering::Relaxed);
        let remaining = self.terms_remaining.load(Ordering::Relaxed);
        let watermark = self.watermark.load(Ordering::Relaxed);
        let rate = if elapsed.as_secs() > 0 { tested as f64 / elapsed.as_secs_f64() } else { 0.0 };
        tracing::info!(
            watermark,
            primes_tested = tested,
            factors_found = found,
            terms_remaining = remaining,
            rate_per_sec = rate,
            "sieve progress"
        );
    }

    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_expected_values() {
        let p = Progress::new(1000);
        assert_eq!(p.primes_tested.load(Ordering::Relaxed), 0);
        assert_eq!(p.factors_found.load(Ordering::Relaxed), 0);
        assert_eq!(p.terms_remaining.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn increment_updates_value() {
        let p = Progress::new(1000);
        p.primes_tested.fetch_add(10, Ordering::Relaxed);
        p.factors_found.fetch_add(3, Ordering::Relaxed);
        p.terms_remaining.fetch_sub(3, Ordering::Relaxed);
        assert_eq!(p.primes_tested.load(Ordering::Relaxed), 10);
        assert_eq!(p.factors_found.load(Ordering::Relaxed), 3);
        assert_eq!(p.terms_remaining.load(Ordering::Relaxed), 997);
    }

    #[test]
    fn concurrent_increments_are_accurate() {
        let p = Progress::new(0);
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let p = Arc::clone(&p);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        p.primes_tested.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(p.primes_tested.load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn stop_sets_shutdown_flag() {
        let p = Progress::new(0);
        assert!(!p.shutdown.load(Ordering::Relaxed));
        p.stop();
        assert!(p.shutdown.load(Ordering::Relaxed));
    }

    #[test]
    fn log_status_does_not_panic() {
        let p = Progress::new(500);
        p.primes_tested.fetch_add(100, Ordering::Relaxed);
        p.factors_found.fetch_add(5, Ordering::Relaxed);
        p.watermark.store(997, Ordering::Relaxed);
        p.log_status();
    }
}
