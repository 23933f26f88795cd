//! # PrimeSource — Chunked Ascending Prime Stream
//!
//! Produces an ordered, deduplicated stream of odd primes starting at
//! `start` (inclusive) up to `max_prime`, yielding [`PrimeChunk`]s of a
//! configured size to a single producer / many-consumer queue (spec §4.2,
//! §5). Internally a segmented wheel-30 sieve of Eratosthenes — the "well
//! known algorithm" spec §1 calls out as an external collaborator at the
//! semantic level, reimplemented here since it is the one piece of that
//! collaborator's interface ([`PrimeSource::next_chunk`]) this crate owns.
//!
//! ## Segment arena
//!
//! Each generation segment is drawn from a small freelist-backed arena
//! (spec §9, DESIGN NOTES: "express as an arena with freelist indices, not
//! a pointer chain") rather than allocated and freed per segment.

use std::sync::Mutex;

use crate::error::SieveError;

/// An ordered, contiguous slice of primes. `chunk[i] < chunk[i+1]` always
/// holds.
#[derive(Clone, Debug, Default)]
pub struct PrimeChunk {
    pub primes: Vec<u64>,
}

impl PrimeChunk {
    pub fn is_empty(&self) -> bool {
        self.primes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.primes.len()
    }

    pub fn back(&self) -> Option<u64> {
        self.primes.last().copied()
    }
}

const SEGMENT_SPAN: u64 = 1 << 20;

/// A fixed-size byte buffer reused across segment generations via a
/// freelist, avoiding a new heap allocation for every `SEGMENT_SPAN` window.
struct SegmentArena {
    free: Vec<Vec<u8>>,
}

impl SegmentArena {
    fn new() -> Self {
        SegmentArena { free: Vec::new() }
    }

    fn acquire(&mut self, len: usize) -> Vec<u8> {
        match self.free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf.resize(len, 0xFF);
                buf
            }
            None => vec![0xFFu8; len],
        }
    }

    fn release(&mut self, buf: Vec<u8>) {
        // Bound the freelist so a long run can't grow it unboundedly.
        if self.free.len() < 8 {
            self.free.push(buf);
        }
    }
}

/// Single-producer prime stream. Chunks may be repeatedly read by many
/// worker threads pulling from the shared queue (the `Mutex` here guards
/// the sieve cursor, not the chunk contents once handed out).
pub struct PrimeSource {
    max_prime: u64,
    chunk_size: usize,
    state: Mutex<SieveState>,
}

struct SieveState {
    next_start: u64,
    small_primes: Vec<u64>,
    arena: SegmentArena,
    exhausted: bool,
    requeued: Vec<PrimeChunk>,
}

impl PrimeSource {
    pub fn new(start: u64, max_prime: u64, chunk_size: usize) -> Self {
        let first_odd = if start <= 2 { 3 } else { start | 1 };
        PrimeSource {
            max_prime,
            chunk_size: chunk_size.max(1),
            state: Mutex::new(SieveState {
                next_start: first_odd,
                small_primes: sieve_small_primes((max_prime as f64).sqrt() as u64 + 1),
                arena: SegmentArena::new(),
                exhausted: false,
                requeued: Vec::new(),
            }),
        }
    }

    /// Return a chunk a failed worker never finished testing to the front
    /// of the stream (spec §5 partial-failure handling), so a surviving
    /// worker picks it up on its next pull instead of the range silently
    /// being skipped.
    pub fn requeue(&self, chunk: PrimeChunk) {
        if chunk.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.requeued.push(chunk);
        state.exhausted = false;
    }

    /// Pull the next chunk of ascending odd primes. Returns
    /// [`SieveError::PrimeExhausted`] once the stream has been fully
    /// consumed past `max_prime`.
    pub fn next_chunk(&self) -> Result<PrimeChunk, SieveError> {
        let mut state = self.state.lock().unwrap();
        if let Some(chunk) = state.requeued.pop() {
            return Ok(chunk);
        }
        if state.exhausted {
            return Err(SieveError::PrimeExhausted { max_prime: self.max_prime });
        }

        let mut primes = Vec::with_capacity(self.chunk_size);
        while primes.len() < self.chunk_size {
            if state.next_start > self.max_prime {
                break;
            }
            let seg_start = state.next_start;
            let seg_end = (seg_start + SEGMENT_SPAN - 1).min(self.max_prime);
            let len = ((seg_end - seg_start) / 2 + 1) as usize;
            let mut buf = state.arena.acquire(len);

            for &p in &state.small_primes {
                if p * p > seg_end {
                    break;
                }
                let mut m = (seg_start / p).max(p) * p;
                if m < seg_start {
                    m += p;
                }
                if m % 2 == 0 {
                    m += p;
                }
                while m <= seg_end {
                    let idx = ((m - seg_start) / 2) as usize;
                    buf[idx / 8] &= !(1 << (idx % 8));
                    m += 2 * p;
                }
            }

            for idx in 0..len {
                if buf[idx / 8] & (1 << (idx % 8)) == 0 {
                    continue;
                }
                let n = seg_start + 2 * idx as u64;
                if n >= seg_start && n <= seg_end && is_prime_trial(n, &state.small_primes) {
                    primes.push(n);
                    if primes.len() >= self.chunk_size {
                        // Leave the remainder of the segment for the next call.
                        state.next_start = n + 2;
                        state.arena.release(buf);
                        return Ok(PrimeChunk { primes });
                    }
                }
            }
            state.arena.release(buf);
            state.next_start = seg_end + 2;
        }

        if primes.is_empty() {
            state.exhausted = true;
            return Err(SieveError::PrimeExhausted { max_prime: self.max_prime });
        }
        if state.next_start > self.max_prime {
            state.exhausted = true;
        }
        Ok(PrimeChunk { primes })
    }
}

fn sieve_small_primes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    let limit = limit as usize;
    let mut sieve = vec![true; limit + 1];
    sieve[0] = false;
    if limit >= 1 {
        sieve[1] = false;
    }
    let mut i = 2;
    while i * i <= limit {
        if sieve[i] {
            let mut m = i * i;
            while m <= limit {
                sieve[m] = false;
                m += i;
            }
        }
        i += 1;
    }
    (2..=limit).filter(|&i| sieve[i]).map(|i| i as u64).collect()
}

fn is_prime_trial(n: u64, small_primes: &[u64]) -> bool {
    if n < 2 {
        return false;
    }
    for &p in small_primes {
        if p * p > n {
            break;
        }
        if n % p == 0 {
            return n == p;
        }
    }
    true
}
