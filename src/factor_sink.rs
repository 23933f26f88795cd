//! # FactorSink — Deduplicated Factor Collection
//!
//! Every kernel invocation that finds `prime | term` reports a
//! [`FactorRecord`] here rather than writing directly to the factor log or
//! the term table (spec §4.4, §5). The sink is the single point enforcing
//! "a given `(prime, TermKey)` pair is reported at most once": two workers
//! racing on adjacent prime chunks, or a CPU and GPU worker covering
//! overlapping ranges during a resume, must not double-count a hit.
//!
//! Reports accumulate in an unsorted buffer guarded by a mutex. `flush`
//! drains the buffer, sorts by `(prime asc, term asc)`, and hands the
//! caller (the supervisor, writing the factor log) an ordered batch.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};

use crate::family::{FactorRecord, TermKey};
use crate::term_table::TermTable;

struct SinkState {
    pending: Vec<FactorRecord>,
    seen: HashSet<(u64, TermKey)>,
    total_accepted: u64,
    total_duplicate: u64,
}

/// Mutex-guarded, at-most-once factor collector. Cloned handles (via
/// `Arc<FactorSink>`) are shared across all CPU and GPU workers.
pub struct FactorSink {
    state: Mutex<SinkState>,
    notify: Condvar,
}

impl Default for FactorSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FactorSink {
    pub fn new() -> Self {
        FactorSink {
            state: Mutex::new(SinkState {
                pending: Vec::new(),
                seen: HashSet::new(),
                total_accepted: 0,
                total_duplicate: 0,
            }),
            notify: Condvar::new(),
        }
    }

    /// Report a factor hit. Also removes the term from `table` on first
    /// sight, so a duplicate report (same prime dividing the same term,
    /// found twice by overlapping workers) neither double-removes nor
    /// double-logs.
    pub fn report(&self, record: FactorRecord, table: &TermTable) {
        let mut state = self.state.lock().unwrap();
        if !state.seen.insert((record.prime, record.term)) {
            state.total_duplicate += 1;
            return;
        }
        state.total_accepted += 1;
        state.pending.push(record);
        drop(state);
        table.remove(record.term);
        self.notify.notify_all();
    }

    /// Report a batch at once (GPU worker drain path): one buffer copy back
    /// from the device may carry many hits.
    pub fn report_many(&self, records: impl IntoIterator<Item = FactorRecord>, table: &TermTable) {
        for record in records {
            self.report(record, table);
        }
    }

    /// Drain and sort all pending records. Safe to call concurrently with
    /// `report`; anything reported after the drain snapshot is taken stays
    /// pending for the next flush.
    pub fn flush(&self) -> Vec<FactorRecord> {
        let mut state = self.state.lock().unwrap();
        let mut batch = std::mem::take(&mut state.pending);
        drop(state);
        batch.sort();
        batch
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn total_accepted(&self) -> u64 {
        self.state.lock().unwrap().total_accepted
    }

    pub fn total_duplicate(&self) -> u64 {
        self.state.lock().unwrap().total_duplicate
    }

    /// Block until at least one record is pending or `timeout` elapses.
    /// Used by a checkpoint-ticking supervisor loop that wants to avoid
    /// busy-polling an idle sink.
    pub fn wait_for_pending(&self, timeout: std::time::Duration) {
        let state = self.state.lock().unwrap();
        if !state.pending.is_empty() {
            return;
        }
        let _ = self.notify.wait_timeout(state, timeout).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_report_is_suppressed() {
        let sink = FactorSink::new();
        let table = TermTable::new_range(1, 100);
        let rec = FactorRecord { prime: 7, term: TermKey::K(3), sign_or_c: 1 };
        sink.report(rec, &table);
        sink.report(rec, &table);
        assert_eq!(sink.total_accepted(), 1);
        assert_eq!(sink.total_duplicate(), 1);
        assert_eq!(sink.pending_len(), 1);
    }

    #[test]
    fn report_removes_term_from_table_once() {
        let sink = FactorSink::new();
        let table = TermTable::new_range(1, 100);
        assert!(table.contains_k(3));
        sink.report(FactorRecord { prime: 7, term: TermKey::K(3), sign_or_c: 1 }, &table);
        assert!(!table.contains_k(3));
        let initial = table.size();
        sink.report(FactorRecord { prime: 11, term: TermKey::K(3), sign_or_c: 1 }, &table);
        assert_eq!(table.size(), initial);
    }

    #[test]
    fn flush_sorts_by_prime_then_term() {
        let sink = FactorSink::new();
        let table = TermTable::new_range(1, 1000);
        sink.report(FactorRecord { prime: 13, term: TermKey::K(5), sign_or_c: 1 }, &table);
        sink.report(FactorRecord { prime: 7, term: TermKey::K(9), sign_or_c: -1 }, &table);
        sink.report(FactorRecord { prime: 7, term: TermKey::K(2), sign_or_c: 1 }, &table);
        let batch = sink.flush();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].prime, 7);
        assert_eq!(batch[0].term, TermKey::K(2));
        assert_eq!(batch[1].term, TermKey::K(9));
        assert_eq!(batch[2].prime, 13);
    }

    #[test]
    fn flush_drains_and_leaves_buffer_empty() {
        let sink = FactorSink::new();
        let table = TermTable::new_range(1, 100);
        sink.report(FactorRecord { prime: 3, term: TermKey::K(1), sign_or_c: 1 }, &table);
        assert_eq!(sink.flush().len(), 1);
        assert_eq!(sink.pending_len(), 0);
        assert_eq!(sink.flush().len(), 0);
    }
}
