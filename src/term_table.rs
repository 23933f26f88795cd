//! # TermTable — Surviving-Term Set with Concurrent-Safe Removal
//!
//! Two concrete shapes, chosen per family (spec §4.3):
//!
//! - [`RangeBitset`] for k-based families (`FixedBNC`, `DMDivisor`,
//!   `SierpinskiRiesel`): a packed bitset over `[min_k, max_k]`.
//!   `remove(k)` clears a bit in O(1); termination when the popcount hits
//!   zero.
//! - [`IndexedList`] for n-based families (`MultiFactorial`,
//!   `AlternatingFactorial`, `Smarandache`): a hash set over alive `n`
//!   (or `(n, c)`) pairs.
//!
//! Both are wrapped in a reader-writer lock by [`TermTable`] — kernel prep
//! takes a read lock, supervisor rebuild/remove takes a write lock (spec
//! §5). The table is monotonically non-growing after initialization.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::family::TermKey;

/// Packed bitset over `[min, max]` inclusive. One bit per candidate `k`.
pub struct RangeBitset {
    min: u64,
    max: u64,
    words: Vec<u64>,
    alive: usize,
}

impl RangeBitset {
    pub fn new(min: u64, max: u64) -> Self {
        let span = (max - min + 1) as usize;
        let num_words = span.div_ceil(64);
        let mut words = vec![u64::MAX; num_words];
        let extra_bits = num_words * 64 - span;
        if extra_bits > 0 {
            if let Some(last) = words.last_mut() {
                *last >>= extra_bits;
            }
        }
        RangeBitset { min, max, words, alive: span }
    }

    fn index(&self, k: u64) -> Option<usize> {
        if k < self.min || k > self.max {
            return None;
        }
        Some((k - self.min) as usize)
    }

    pub fn contains(&self, k: u64) -> bool {
        match self.index(k) {
            Some(idx) => self.words[idx / 64] & (1 << (idx % 64)) != 0,
            None => false,
        }
    }

    /// Clear the bit for `k`. Returns `true` if it was previously set
    /// (i.e. this call actually removed a live term).
    pub fn remove(&mut self, k: u64) -> bool {
        let Some(idx) = self.index(k) else { return false };
        let word = &mut self.words[idx / 64];
        let mask = 1u64 << (idx % 64);
        if *word & mask != 0 {
            *word &= !mask;
            self.alive -= 1;
            true
        } else {
            false
        }
    }

    pub fn size(&self) -> usize {
        self.alive
    }

    pub fn min_k(&self) -> u64 {
        self.min
    }

    pub fn max_k(&self) -> u64 {
        self.max
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = u64> + '_ {
        self.words.iter().enumerate().flat_map(move |(wi, &word)| {
            let base = self.min + (wi * 64) as u64;
            BitIter { word, base }
        })
    }
}

struct BitIter {
    word: u64,
    base: u64,
}

impl Iterator for BitIter {
    type Item = u64;
    fn next(&mut self) -> Option<u64> {
        if self.word == 0 {
            return None;
        }
        let tz = self.word.trailing_zeros() as u64;
        self.word &= self.word - 1;
        Some(self.base + tz)
    }
}

/// Hash-set-backed table over arbitrary `TermKey`s, used by n-based
/// families where keys are sparse relative to their numeric range.
pub struct IndexedList {
    alive: HashSet<TermKey>,
}

impl IndexedList {
    pub fn new(keys: impl IntoIterator<Item = TermKey>) -> Self {
        IndexedList { alive: keys.into_iter().collect() }
    }

    pub fn contains(&self, key: TermKey) -> bool {
        self.alive.contains(&key)
    }

    pub fn remove(&mut self, key: TermKey) -> bool {
        self.alive.remove(&key)
    }

    pub fn size(&self) -> usize {
        self.alive.len()
    }

    pub fn iter_alive(&self) -> impl Iterator<Item = &TermKey> {
        self.alive.iter()
    }
}

enum TermShape {
    RangeBitset(RangeBitset),
    IndexedList(IndexedList),
}

/// Reader-writer-locked term table. Kernels take a read lock to test
/// `contains`; factor reports and supervisor rebuilds take a write lock
/// to `remove`.
pub struct TermTable {
    shape: RwLock<TermShape>,
}

impl TermTable {
    pub fn new_range(min_k: u64, max_k: u64) -> Self {
        TermTable { shape: RwLock::new(TermShape::RangeBitset(RangeBitset::new(min_k, max_k))) }
    }

    pub fn new_indexed(keys: impl IntoIterator<Item = TermKey>) -> Self {
        TermTable { shape: RwLock::new(TermShape::IndexedList(IndexedList::new(keys))) }
    }

    pub fn contains_k(&self, k: u64) -> bool {
        match &*self.shape.read().unwrap() {
            TermShape::RangeBitset(b) => b.contains(k),
            TermShape::IndexedList(_) => false,
        }
    }

    pub fn contains_key(&self, key: TermKey) -> bool {
        match &*self.shape.read().unwrap() {
            TermShape::IndexedList(l) => l.contains(key),
            TermShape::RangeBitset(b) => match key {
                TermKey::K(k) => b.contains(k),
                _ => false,
            },
        }
    }

    /// Remove the term identified by `key`, returning `true` if it was
    /// alive. Used by the `FactorSink` when forwarding a deduplicated
    /// factor report to the table.
    pub fn remove(&self, key: TermKey) -> bool {
        let mut shape = self.shape.write().unwrap();
        match &mut *shape {
            TermShape::RangeBitset(b) => match key {
                TermKey::K(k) => b.remove(k),
                _ => false,
            },
            TermShape::IndexedList(l) => l.remove(key),
        }
    }

    pub fn size(&self) -> usize {
        match &*self.shape.read().unwrap() {
            TermShape::RangeBitset(b) => b.size(),
            TermShape::IndexedList(l) => l.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn snapshot_keys(&self) -> Vec<TermKey> {
        match &*self.shape.read().unwrap() {
            TermShape::RangeBitset(b) => b.iter_alive().map(TermKey::K).collect(),
            TermShape::IndexedList(l) => l.iter_alive().copied().collect(),
        }
    }

    /// Remove every alive key not present in `alive`. Used to rebuild a
    /// freshly-constructed full-range table down to a checkpoint's snapshot
    /// on resume, since a checkpoint only ever shrinks the surviving set.
    pub fn retain_only(&self, alive: &HashSet<TermKey>) {
        let mut shape = self.shape.write().unwrap();
        match &mut *shape {
            TermShape::RangeBitset(b) => {
                let drop: Vec<u64> = b.iter_alive().filter(|&k| !alive.contains(&TermKey::K(k))).collect();
                for k in drop {
                    b.remove(k);
                }
            }
            TermShape::IndexedList(l) => {
                let drop: Vec<TermKey> = l.iter_alive().filter(|k| !alive.contains(k)).copied().collect();
                for k in drop {
                    l.remove(k);
                }
            }
        }
    }
}
