//! # Kernel — Per-Family Sieve Arithmetic
//!
//! A [`SieveKernel`] turns a group of [`LANES`](crate::montgomery::LANES)
//! primes into zero or more [`FactorRecord`](crate::family::FactorRecord)s,
//! reported through a [`FactorSink`] and reflected against a [`TermTable`].
//! Kernels never return `Result` — a kernel cannot fail on a valid prime;
//! malformed parameters are rejected earlier by
//! [`FamilyParameters::validate`](crate::family::FamilyParameters::validate).
//!
//! Each module here is grounded on one family worker from the originating
//! sieve project: `dm_divisor`, `fixed_bnc`, `fixed_kbn`,
//! `multi_factorial`, `alternating_factorial`, `sierpinski_riesel`,
//! `smarandache`.

pub mod alternating_factorial;
pub mod dm_divisor;
pub mod fixed_bnc;
pub mod fixed_kbn;
pub mod multi_factorial;
pub mod sierpinski_riesel;
pub mod smarandache;

use crate::error::SieveError;
use crate::family::FamilyParameters;
use crate::factor_sink::FactorSink;
use crate::montgomery::LANES;
use crate::term_table::TermTable;

/// Implemented by every family's arithmetic kernel. `process_group` is
/// called once per 4-wide prime group pulled from the `PrimeSource`
/// (spec §4.1, §5); a worker calls it repeatedly until the prime stream is
/// exhausted or the family's `TermTable` empties.
pub trait SieveKernel: Send + Sync {
    /// Test the given primes against every surviving term, reporting any
    /// hits to `sink` and reflecting removals into `table`.
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink);

    fn family_name(&self) -> &'static str;
}

/// Build the concrete kernel and initial `TermTable` for a validated
/// parameter set. Called once at startup (or on resume, with a term table
/// rebuilt from the checkpoint).
pub fn build(params: &FamilyParameters) -> Result<(Box<dyn SieveKernel>, TermTable), SieveError> {
    params.validate()?;
    match params {
        FamilyParameters::MultiFactorial { multi, min_n, max_n, bases } => {
            let kernel = multi_factorial::MultiFactorialKernel::new(*multi, *min_n, *max_n, bases.clone());
            let table = kernel.initial_table();
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::AlternatingFactorial { max_n, max_steps } => {
            let kernel = alternating_factorial::AlternatingFactorialKernel::new(*max_n, *max_steps);
            let table = kernel.initial_table();
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::FixedKBN { k, base, n, min_c, max_c } => {
            let kernel = fixed_kbn::FixedKBNKernel::new(*k, *base, *n, *min_c, *max_c);
            let table = kernel.initial_table();
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::FixedBNC { base, n, c, min_k, max_k } => {
            let kernel = fixed_bnc::FixedBNCKernel::new(*base, *n, *c, *min_k, *max_k);
            let table = TermTable::new_range(*min_k, *max_k);
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::DMDivisor { n, min_k, max_k } => {
            let kernel = dm_divisor::DMDivisorKernel::new(*n, *min_k, *max_k);
            let table = TermTable::new_range(*min_k, *max_k);
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::SierpinskiRiesel { sequences, q, subsequences, legendre, residue_powers, sieve_low } => {
            let kernel = sierpinski_riesel::SierpinskiRieselKernel::new(
                sequences.clone(),
                *q,
                subsequences.clone(),
                legendre.clone(),
                residue_powers.clone(),
                *sieve_low,
            );
            let table = kernel.initial_table();
            Ok((Box::new(kernel), table))
        }
        FamilyParameters::Smarandache { terms, max_digits } => {
            let kernel = smarandache::SmarandacheKernel::new(terms.clone(), *max_digits);
            let table = kernel.initial_table();
            Ok((Box::new(kernel), table))
        }
    }
}
