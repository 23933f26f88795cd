//! Multi-factorial: `n!ₘ = n·(n−m)·(n−2m)·…` down to the smallest positive
//! factor. Find `n` in `[min_n, max_n]` such that `p | n!ₘ ± 1`.
//!
//! Grounded on `MultiFactorialGpuWorker`: the walk is partitioned into
//! `multi` independent residue classes `mf = n mod multi` (each its own
//! arithmetic progression with step `multi`), skipped entirely when
//! `multi` is even and `mf` is odd — `n!ₘ ± 1` is then always even and can
//! never be prime. Each class keeps a running product residual `resFn`
//! that is multiplied by the next term in the progression and compared
//! against `±1`; `(n, resFn)` is persisted per `(prime, mf)` so a bounded
//! step budget per call still covers the full range across repeated
//! invocations (spec §B.3), mirroring the GPU kernel's per-class
//! `remainders` buffer.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, MultiFactorialBasis, TermKey};
use crate::montgomery::{MontgomeryField, MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

#[derive(Clone, Copy)]
struct Residual {
    n: u64,
    res_fn: u64,
}

pub struct MultiFactorialKernel {
    multi: u32,
    min_n: u64,
    max_n: u64,
    #[allow(dead_code)]
    bases: Vec<MultiFactorialBasis>,
    max_steps_per_call: u64,
    state: Mutex<HashMap<(u64, u32), Residual>>,
}

impl MultiFactorialKernel {
    pub fn new(multi: u32, min_n: u64, max_n: u64, bases: Vec<MultiFactorialBasis>) -> Self {
        MultiFactorialKernel { multi, min_n, max_n, bases, max_steps_per_call: 4096, state: Mutex::new(HashMap::new()) }
    }

    pub fn initial_table(&self) -> TermTable {
        TermTable::new_indexed((self.min_n..=self.max_n).map(TermKey::N))
    }

    /// Smallest positive member of residue class `mf` — the base case of
    /// the `n!ₘ` recursion (`n!ₘ = n·(n−m)!ₘ`, terminating at the smallest
    /// positive term). That base case is `mf` itself when `mf != 0`, or
    /// `multi` when `mf == 0` (class 0 never includes `n = 0`).
    fn smallest_member(&self, mf: u32) -> u64 {
        if mf == 0 {
            self.multi as u64
        } else {
            mf as u64
        }
    }

    fn walk_class(&self, prime: u64, field: &MontgomeryField, mf: u32, table: &TermTable, sink: &FactorSink) {
        let one = field.one();
        let neg_one = field.neg_one();
        let mut guard = self.state.lock().unwrap();
        let is_new = !guard.contains_key(&(prime, mf));
        let mut r = *guard.entry((prime, mf)).or_insert_with(|| {
            let start = self.smallest_member(mf);
            Residual { n: start, res_fn: field.to_res(start % prime) }
        });

        // The base case itself is a valid n!m term; report it the one time
        // this (prime, mf) state is first created, priming silently on
        // every later resume since it was already checked.
        if is_new && (self.min_n..=self.max_n).contains(&r.n) {
            if r.res_fn == one {
                self.report(prime, r.n, -1, table, sink);
            } else if r.res_fn == neg_one {
                self.report(prime, r.n, 1, table, sink);
            }
        }

        let mut steps = 0u64;
        while steps < self.max_steps_per_call {
            let next_n = r.n + self.multi as u64;
            if next_n > self.max_n {
                break;
            }
            r.n = next_n;
            steps += 1;
            let term_res = field.to_res(r.n % prime);
            r.res_fn = field.mulmod(r.res_fn, term_res);

            // Below min_n this step only primes res_fn toward the true
            // n!m residue; it must not be compared or reported (spec
            // SPEC_FULL §B.3's non-reporting priming loop).
            if r.n < self.min_n {
                continue;
            }
            if r.res_fn == one {
                self.report(prime, r.n, -1, table, sink);
            } else if r.res_fn == neg_one {
                self.report(prime, r.n, 1, table, sink);
            }
        }
        guard.insert((prime, mf), r);
    }

    fn report(&self, prime: u64, n: u64, sign: i64, table: &TermTable, sink: &FactorSink) {
        let key = TermKey::N(n);
        if table.contains_key(key) {
            sink.report(FactorRecord { prime, term: key, sign_or_c: sign }, table);
        }
    }
}

impl SieveKernel for MultiFactorialKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };
        for mf in 0..self.multi {
            if self.multi % 2 == 0 && mf % 2 == 1 {
                continue;
            }
            for i in 0..LANES {
                self.walk_class(primes[i], mp.lane(i), mf, table, sink);
            }
        }
    }

    fn family_name(&self) -> &'static str {
        "multi_factorial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_multifactorial_mod(n: u64, multi: u64, p: u128) -> u128 {
        let mut acc = 1i128;
        let mut k = n;
        loop {
            acc = (acc * k as i128).rem_euclid(p as i128);
            if k <= multi {
                break;
            }
            k -= multi;
        }
        acc as u128
    }

    #[test]
    fn hits_match_brute_force_plus_minus_one() {
        let kernel = MultiFactorialKernel::new(3, 1, 120, vec![]);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        kernel.process_group([101, 103, 107, 109], &table, &sink);
        for rec in sink.flush() {
            let TermKey::N(n) = rec.term else { panic!() };
            let val = brute_multifactorial_mod(n, 3, rec.prime as u128);
            if rec.sign_or_c == -1 {
                assert_eq!(val, 1);
            } else {
                assert_eq!(val, rec.prime as u128 - 1);
            }
        }
    }

    #[test]
    fn even_multi_skips_odd_residue_class() {
        let kernel = MultiFactorialKernel::new(4, 1, 60, vec![]);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        kernel.process_group([37, 41, 43, 47], &table, &sink);
        for rec in sink.flush() {
            let TermKey::N(n) = rec.term else { panic!() };
            assert_eq!(n % 2, 0, "odd n should never be reported for even multi");
        }
    }
}
