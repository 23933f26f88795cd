//! Fixed `k`, `base`, `n`: find `c` in `[min_c, max_c]` such that
//! `p | k·base^n + c`.
//!
//! Grounded on `FixedKBNWorker::TestMegaPrimeChunk`/`RemoveTerms`: compute
//! `kbExpN = k·base^n (mod p)` once per prime, then walk `c = p − kbExpN`
//! up and down by steps of `p` across the `[min_c, max_c]` window.

use crate::factor_sink::FactorSink;
use crate::family::{FactorRecord, TermKey};
use crate::montgomery::{MontgomeryVec, LANES};
use crate::term_table::TermTable;

use super::SieveKernel;

pub struct FixedKBNKernel {
    k: u64,
    base: u32,
    n: u64,
    min_c: i64,
    max_c: i64,
}

impl FixedKBNKernel {
    pub fn new(k: u64, base: u32, n: u64, min_c: i64, max_c: i64) -> Self {
        FixedKBNKernel { k, base, n, min_c, max_c }
    }

    pub fn initial_table(&self) -> TermTable {
        let keys = (self.min_c..=self.max_c).map(|c| TermKey::NC(self.n, c));
        TermTable::new_indexed(keys)
    }

    fn remove_terms(&self, prime: u64, kb_exp_n: u64, table: &TermTable, sink: &FactorSink) {
        let base_c = prime as i64 - kb_exp_n as i64;

        let mut c = base_c;
        while c <= self.max_c {
            self.report_if_alive(prime, c, table, sink);
            c += prime as i64;
        }

        let mut c = base_c - prime as i64;
        while c >= self.min_c {
            self.report_if_alive(prime, c, table, sink);
            c -= prime as i64;
        }
    }

    fn report_if_alive(&self, prime: u64, c: i64, table: &TermTable, sink: &FactorSink) {
        if c < self.min_c || c > self.max_c {
            return;
        }
        let key = TermKey::NC(self.n, c);
        if table.contains_key(key) {
            sink.report(FactorRecord { prime, term: key, sign_or_c: c }, table);
        }
    }
}

impl SieveKernel for FixedKBNKernel {
    fn process_group(&self, primes: [u64; LANES], table: &TermTable, sink: &FactorSink) {
        let Ok(mp) = MontgomeryVec::new(primes) else { return };
        let base_res = mp.to_res([self.base as u64; LANES]);
        let pow_res = mp.pow(base_res, self.n);
        let k_res = mp.to_res([self.k; LANES]);
        let kb_res = mp.mulmod(pow_res, k_res);
        let kb_n = mp.from_res(kb_res);

        for i in 0..LANES {
            self.remove_terms(primes[i], kb_n[i], table, sink);
        }
    }

    fn family_name(&self) -> &'static str {
        "fixed_kbn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_all_c_in_arithmetic_progression() {
        let kernel = FixedKBNKernel::new(3, 2, 10, -500, 500);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        kernel.process_group([101, 103, 107, 109], &table, &sink);
        let batch = sink.flush();
        for rec in &batch {
            let TermKey::NC(n, c) = rec.term else { panic!() };
            assert_eq!(n, 10);
            let val = 3i128 * 2i128.pow(10) + c as i128;
            assert_eq!(val.rem_euclid(rec.prime as i128), 0);
        }
        // At least one hit expected for a prime this small relative to the range.
        assert!(!batch.is_empty());
    }

    #[test]
    fn never_reports_outside_c_window() {
        let kernel = FixedKBNKernel::new(7, 3, 25, -50, 50);
        let table = kernel.initial_table();
        let sink = FactorSink::new();
        kernel.process_group([37, 41, 43, 47], &table, &sink);
        for rec in sink.flush() {
            let TermKey::NC(_, c) = rec.term else { panic!() };
            assert!((-50..=50).contains(&c));
        }
    }
}
