//! # darkreach-sieve
//!
//! A distributed, resumable prime sieve over parameterized integer-sequence
//! families (multi-factorial, alternating factorial, fixed-kbn, fixed-bnc,
//! double-Mersenne cofactor divisors, generalized Sierpinski/Riesel,
//! concatenated-decimal Smarandache terms). Arithmetic runs entirely in
//! 64-bit Montgomery form; a [`supervisor::Supervisor`] owns a
//! [`term_table::TermTable`] of surviving terms, a [`prime_source::PrimeSource`]
//! streaming ascending primes, and a pool of CPU and optional GPU workers
//! that eliminate terms as factors are found.
//!
//! ## Module organization
//!
//! - [`montgomery`] — scalar and 4-wide Montgomery modular arithmetic.
//! - [`family`] — target-family parameters and factor records.
//! - [`kernel`] — one arithmetic kernel per family.
//! - [`term_table`] — concurrent-safe surviving-term set.
//! - [`factor_sink`] — deduplicated factor collection.
//! - [`prime_source`] — chunked ascending prime stream.
//! - [`worker`] — CPU and GPU sieve execution units.
//! - [`supervisor`] — worker pool ownership, watermark reconciliation, checkpointing.
//! - [`checkpoint`] — resumable watermark and term-table persistence.
//! - [`io`] — term-list and factor-log file interfaces.
//! - [`progress`] — atomic progress counters and background status reporting.
//! - [`cli`] — command-line surface.
//! - [`error`] — shared error type.

pub mod checkpoint;
pub mod cli;
pub mod error;
pub mod factor_sink;
pub mod family;
pub mod io;
pub mod kernel;
pub mod montgomery;
pub mod prime_source;
pub mod progress;
pub mod supervisor;
pub mod term_table;
pub mod worker;
