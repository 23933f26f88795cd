//! # Error — Sieve Error Kinds
//!
//! One enum covering the error kinds named in the spec's error-handling
//! design: invalid family parameters, stream exhaustion, GPU factor-buffer
//! overflow, device failures, checkpoint/log I/O failures, and user
//! cancellation. Kernels never return `Result` (they signal through the
//! factor sink); this type is surfaced at worker and supervisor boundaries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SieveError {
    /// Invalid family parameter (non-positive n, base=0, even/too-small prime, etc).
    /// Surfaced pre-start; the caller should abort rather than retry.
    #[error("invalid family parameter: {0}")]
    Domain(String),

    /// `PrimeSource` reached `max_prime`. Normal termination, not a failure.
    #[error("prime stream exhausted past {max_prime}")]
    PrimeExhausted { max_prime: u64 },

    /// A GPU worker's factor buffer filled before a dispatch drained. Fatal;
    /// the operator must raise `maxGpuFactors` (`-M`) and restart.
    #[error("GPU factor buffer overflow: {count} factors exceeds ceiling {ceiling}; raise -M and retry")]
    FactorOverflow { count: u32, ceiling: u32 },

    /// Kernel launch or device buffer copy failed. The owning worker marks
    /// itself failed; the supervisor may continue with remaining workers.
    #[error("device error on worker {worker_id}: {message}")]
    Device { worker_id: u32, message: String },

    /// Checkpoint or factor-log write failed. Logged; the sieve continues
    /// and a retry is attempted on the next checkpoint tick.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// User requested cancellation (SIGINT or equivalent). Clean drain,
    /// final checkpoint, exit code 2.
    #[error("interrupted by user request")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, SieveError>;
