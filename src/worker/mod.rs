//! # Worker — CPU and GPU Sieve Execution Units
//!
//! A worker repeatedly pulls [`PrimeChunk`](crate::prime_source::PrimeChunk)s
//! from a shared [`PrimeSource`](crate::prime_source::PrimeSource), hands
//! groups of primes to a [`SieveKernel`](crate::kernel::SieveKernel), and
//! reports hits through a shared [`FactorSink`](crate::factor_sink::FactorSink).
//! Every worker publishes the largest prime it has fully acknowledged so the
//! [`Supervisor`](crate::supervisor::Supervisor) can compute a safe
//! checkpoint watermark as the minimum across all workers (spec §5).

pub mod cpu;
pub mod gpu;

use std::sync::atomic::{AtomicU64, Ordering};

/// Acknowledged-prime publication point, one per worker. `0` means "has
/// not yet acknowledged any prime" and must never contribute a watermark
/// floor above the true minimum.
#[derive(Debug, Default)]
pub struct Watermark {
    acknowledged: AtomicU64,
}

impl Watermark {
    pub fn new() -> Self {
        Watermark { acknowledged: AtomicU64::new(0) }
    }

    pub fn advance_to(&self, prime: u64) {
        self.acknowledged.fetch_max(prime, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.acknowledged.load(Ordering::Relaxed)
    }
}

/// Outcome of a single worker's run loop, reported back to the supervisor
/// when the worker thread exits.
#[derive(Debug)]
pub enum WorkerOutcome {
    /// The prime stream reached `max_prime`, or the term table emptied.
    Completed,
    /// The worker stopped because `Supervisor` raised the interrupt flag.
    Interrupted,
    /// The worker hit an unrecoverable device or I/O error.
    Failed(crate::error::SieveError),
}
