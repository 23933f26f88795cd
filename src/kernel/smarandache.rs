//! Concatenated-decimal Smarandache terms: `S(n)` is the decimal
//! concatenation of `1, 2, …, n` (1, 12, 123, 1234, …). Find `n` in
//! `terms` such that `p | S(n)`.
//!
//! Grounded on `SmarandacheGpuWorker`: `S(n) = S(n−1)·10^d(n) + n (mod p)`
//! where `d(n)` is the decimal digit count of `n`, walked incrementally
//! over the ascending term list rather than recomputed from scratch each
//! time. The original dispatches to one of two kernels (`sm_kernel6` /
//! `sm_kernel7`) split by whether the first term in a batch is below
//! 10^6, purely to size an on-device digit-power table; a single walk
//! with powers of ten computed on demand is equivalent here.

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, TermKey};
use crate::montgomery::{MontgomeryField, MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

pub struct SmarandacheKernel {
    terms: Vec<u64>,
    #[allow(dead_code)]
    max_digits: u32,
}

impl SmarandacheKernel {
    pub fn new(terms: Vec<u64>, max_digits: u32) -> Self {
        let mut terms = terms;
        terms.sort_unstable();
        SmarandacheKernel { terms, max_digits }
    }

    pub fn initial_table(&self) -> TermTable {
        TermTable::new_indexed(self.terms.iter().map(|&n| TermKey::N(n)))
    }

    fn walk(&self, prime: u64, field: &MontgomeryField, table: &TermTable, sink: &FactorSink) {
        let mut s_res = 0u64;
        for &n in &self.terms {
            let digits = decimal_digits(n);
            let pow10_res = field.pow(field.to_res(10), digits as u64);
            s_res = field.mulmod(s_res, pow10_res);
            s_res = field.add(s_res, field.to_res(n % prime));
            if s_res == 0 {
                let key = TermKey::N(n);
                if table.contains_key(key) {
                    sink.report(FactorRecord { prime, term: key, sign_or_c: 1 }, table);
                }
            }
        }
    }
}

fn decimal_digits(mut n: u64) -> u32 {
    if n == 0 {
        return 1;
    }
    let mut d = 0;
    while n > 0 {
        d += 1;
        n /= 10;
    }
    d
}

impl SieveKernel for SmarandacheKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };
        for i in 0..LANES {
            self.walk(primes[i], mp.lane(i), table, sink);
        }
    }

    fn family_name(&self) -> &'static str {
        "smarandache"
    }
}
