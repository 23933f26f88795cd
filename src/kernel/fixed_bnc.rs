//! Fixed `base`, `n`, `c`: find `k` in `[min_k, max_k]` such that
//! `p | k·base^n + c`.
//!
//! Grounded on `FixedBNCWorker`: `k ≡ (1/base)^n (mod p)`, negated when
//! `c = +1`. `RemoveTermsSmallPrime`/`RemoveTermsBigPrime` apply a parity
//! lift — `k += p` when `base` is odd and the solved `k` is odd — needed
//! only for odd bases, unlike [`DMDivisor`](super::dm_divisor) where `k`
//! is forced even by construction and no lift applies.

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, TermKey};
use crate::montgomery::{MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

pub struct FixedBNCKernel {
    base: u32,
    n: u64,
    c: i32,
    min_k: u64,
    max_k: u64,
}

impl FixedBNCKernel {
    pub fn new(base: u32, n: u64, c: i32, min_k: u64, max_k: u64) -> Self {
        FixedBNCKernel { base, n, c, min_k, max_k }
    }

    fn remove_terms(&self, prime: u64, mut k: u64, table: &TermTable, sink: &FactorSink) {
        if self.base % prime as u32 == 0 {
            return;
        }
        if (self.base & 1 == 1) && (k & 1 == 1) {
            k += prime;
        }
        if k < self.min_k {
            if prime >= self.min_k {
                k += prime;
            } else {
                k += prime * self.min_k.saturating_sub(k).div_ceil(prime);
            }
            if (self.base & 1 == 1) && (k & 1 == 1) {
                k += prime;
            }
        }
        while k <= self.max_k {
            if table.contains_k(k) {
                sink.report(FactorRecord { prime, term: TermKey::K(k), sign_or_c: self.c as i64 }, table);
            }
            let step = if self.base & 1 == 1 { prime * 2 } else { prime };
            match k.checked_add(step) {
                Some(next) => k = next,
                None => break,
            }
        }
    }
}

impl SieveKernel for FixedBNCKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };
        let base_res = mp.to_res([self.base as u64; LANES]);

        for i in 0..LANES {
            let field = mp.lane(i);
            let p = primes[i];
            let Some(inv_base_res) = field.inverse(base_res[i]) else { continue };
            let k_res = field.pow(inv_base_res, self.n);
            let mut k0 = field.from_res(k_res);
            if self.c == 1 {
                k0 = p - k0;
            }
            self.remove_terms(p, k0, table, sink);
        }
    }

    fn family_name(&self) -> &'static str {
        "fixed_bnc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respects_k_window_and_parity() {
        let kernel = FixedBNCKernel::new(3, 12, 1, 1, 20_000);
        let table = TermTable::new_range(1, 20_000);
        let sink = FactorSink::new();
        kernel.process_group([101, 103, 107, 109], &table, &sink);
        for rec in sink.flush() {
            let TermKey::K(k) = rec.term else { panic!() };
            assert!((1..=20_000).contains(&k));
            // Odd base: every reported k must be even.
            assert_eq!(k % 2, 0);
            let val = k as i128 * 3i128.pow(12) + 1;
            assert_eq!(val.rem_euclid(rec.prime as i128), 0);
        }
    }

    #[test]
    fn even_base_has_no_parity_constraint() {
        let kernel = FixedBNCKernel::new(6, 8, -1, 1, 5_000);
        let table = TermTable::new_range(1, 5_000);
        let sink = FactorSink::new();
        kernel.process_group([37, 41, 43, 47], &table, &sink);
        for rec in sink.flush() {
            let TermKey::K(k) = rec.term else { panic!() };
            let val = k as i128 * 6i128.pow(8) - 1;
            assert_eq!(val.rem_euclid(rec.prime as i128), 0);
        }
    }
}
