//! Double-Mersenne cofactor divisors: find `k` in `[min_k, max_k]` such
//! that `p | 2·k·(2^n − 1) + 1`.
//!
//! Grounded on `DMDivisorWorker::TestMegaPrimeChunk`/`RemoveTerms`: solve
//! `2^n − 1 ≡ bs (mod p)`, then `k ≡ −bs^−1 · 2^−1 (mod p)` by inverting
//! `bs` and halving (the inverse is always even since `p` is odd, so the
//! halving never needs a parity lift — `2kp+1` forces `k` even or odd with
//! no base-dependent correction, unlike [`FixedBNC`](super::fixed_bnc)).

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, TermKey};
use crate::montgomery::{MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

pub struct DMDivisorKernel {
    n: u64,
    min_k: u64,
    max_k: u64,
}

impl DMDivisorKernel {
    pub fn new(n: u64, min_k: u64, max_k: u64) -> Self {
        DMDivisorKernel { n, min_k, max_k }
    }
}

impl SieveKernel for DMDivisorKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };
        let ones: [u64; LANES] = std::array::from_fn(|i| mp.lane(i).one());
        let two_res = mp.to_res([2; LANES]);
        let pow_res = mp.pow(two_res, self.n);
        let pow_n = mp.from_res(pow_res);

        for i in 0..LANES {
            let p = primes[i];
            let field = mp.lane(i);
            // bs = 2^n - 1 (mod p), as a plain residue class representative.
            let bs = if pow_n[i] == 0 { p - 1 } else { pow_n[i] - 1 };
            if bs == 0 {
                continue;
            }
            let Some(inv_res) = field.inverse(field.to_res(bs)) else { continue };
            let inv_bs = field.from_res(inv_res);
            // 2k = -inv_bs (mod p); inv_bs is forced even by the structure
            // of 2kp+1 so the halving below never leaves a remainder.
            let mut neg_inv = p - inv_bs;
            if neg_inv & 1 != 0 {
                neg_inv += p;
            }
            let k0 = neg_inv >> 1;
            self.remove_terms(p, k0, table, sink);
        }
    }

    fn family_name(&self) -> &'static str {
        "dm_divisor"
    }
}

impl DMDivisorKernel {
    fn remove_terms(&self, prime: u64, mut k: u64, table: &TermTable, sink: &FactorSink) {
        if k < self.min_k {
            if prime >= self.min_k {
                k += prime;
            } else {
                k += prime * self.min_k.saturating_sub(k).div_ceil(prime);
            }
        }
        if k > self.max_k {
            return;
        }
        while k <= self.max_k {
            if table.contains_k(k) {
                sink.report(FactorRecord { prime, term: TermKey::K(k), sign_or_c: 1 }, table);
            }
            match k.checked_add(prime) {
                Some(next) => k = next,
                None => break,
            }
        }
    }
}
