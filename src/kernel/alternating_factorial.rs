//! Alternating factorial: `af(n) = Σ_{k=1..n} (−1)^(n−k) k!`. Find `n` in
//! `[1, max_n]` such that `p | af(n)`.
//!
//! Grounded on `af_kernel.gpu.h`'s incremental n-walk: maintain a running
//! factorial residue `resFn = n! (mod p)` and alternating-sum residue
//! `resAfn = af(n) (mod p)`; each step, `resFn *= (n+1)`, test equality,
//! then `resAfn = resFn − resAfn` (the alternating recurrence
//! `af(n) = n! − af(n−1)`). The walk is resumed across calls bounded by
//! `max_steps` per invocation, carrying `(n, resFn, resAfn)` per prime —
//! the GPU kernel's `fResiduals`/`afResiduals` buffers, reexpressed as a
//! per-prime residual map (spec §B.3).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, TermKey};
use crate::montgomery::{MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

#[derive(Clone, Copy)]
struct Residual {
    n: u64,
    res_n: u64,
    res_fn: u64,
    res_afn: u64,
}

pub struct AlternatingFactorialKernel {
    max_n: u64,
    max_steps: u64,
    state: Mutex<HashMap<u64, Residual>>,
}

impl AlternatingFactorialKernel {
    pub fn new(max_n: u64, max_steps: u64) -> Self {
        AlternatingFactorialKernel { max_n, max_steps, state: Mutex::new(HashMap::new()) }
    }

    pub fn initial_table(&self) -> TermTable {
        TermTable::new_indexed((1..=self.max_n).map(TermKey::N))
    }
}

impl SieveKernel for AlternatingFactorialKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };

        let mut guard = self.state.lock().unwrap();
        for i in 0..LANES {
            let p = primes[i];
            let field = mp.lane(i);
            let one = field.one();
            let mut r = *guard.entry(p).or_insert(Residual { n: 1, res_n: one, res_fn: one, res_afn: one });
            if r.n >= self.max_n {
                continue;
            }

            let mut steps = 0u64;
            while r.n < self.max_n && steps < self.max_steps {
                r.n += 1;
                steps += 1;
                r.res_n = field.add(r.res_n, one);
                r.res_fn = field.mulmod(r.res_fn, r.res_n);
                if r.res_fn == r.res_afn {
                    let key = TermKey::N(r.n);
                    if table.contains_key(key) {
                        sink.report(FactorRecord { prime: p, term: key, sign_or_c: 1 }, table);
                    }
                }
                r.res_afn = field.sub(r.res_fn, r.res_afn);
            }
            guard.insert(p, r);
        }
    }

    fn family_name(&self) -> &'static str {
        "alternating_factorial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_af(n: u64, p: u128) -> u128 {
        let mut af = 0i128;
        let mut fact = 1i128;
        for k in 1..=n {
            fact = (fact * k as i128).rem_euclid(p as i128);
            let sign: i128 = if (n - k) % 2 == 0 { 1 } else { -1 };
            af = (af + sign * fact).rem_euclid(p as i128);
        }
        af as u128
    }

    #[test]
    fn single_call_covers_small_range() {
        let kernel = AlternatingFactorialKernel::new(50, 1000);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        kernel.process_group([101, 103, 107, 109], &table, &sink);
        for rec in sink.flush() {
            let TermKey::N(n) = rec.term else { panic!() };
            assert_eq!(brute_af(n, rec.prime as u128), 0);
        }
    }

    #[test]
    fn resumes_across_calls_with_step_cap() {
        let kernel = AlternatingFactorialKernel::new(200, 10);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        // 20 calls * 10 steps = 200, enough to cover the full range.
        for _ in 0..20 {
            kernel.process_group([101, 103, 107, 109], &table, &sink);
        }
        let batch = sink.flush();
        for rec in &batch {
            let TermKey::N(n) = rec.term else { panic!() };
            assert_eq!(brute_af(n, rec.prime as u128), 0);
        }
    }
}
