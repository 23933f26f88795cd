//! CPU worker: a single OS thread pulling prime chunks and handing them to
//! a kernel four at a time (spec §4.1's `MontgomeryVec` lane width).
//!
//! The tail of a chunk whose length isn't a multiple of
//! [`LANES`](crate::montgomery::LANES) is padded by repeating the last
//! prime — mirroring `FixedBNCWorker::TestSmallB`'s "duplicate the last
//! few entries so that the number of valid entries is divisible by 4".
//! Padding a prime into the group a second time would otherwise double-
//! report any factor it finds; `FactorSink`'s at-most-once dedup absorbs
//! that for free; this worker additionally skips reporting a watermark
//! advance for a padding slot so the acknowledged prime does not appear
//! to jump ahead of what was actually tested.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::factor_sink::FactorSink;
use crate::kernel::SieveKernel;
use crate::montgomery::LANES;
use crate::prime_source::PrimeSource;
use crate::progress::Progress;
use crate::term_table::TermTable;

use super::{Watermark, WorkerOutcome};

pub struct CpuWorker {
    pub id: u32,
    kernel: Arc<dyn SieveKernel>,
    source: Arc<PrimeSource>,
    table: Arc<TermTable>,
    sink: Arc<FactorSink>,
    progress: Arc<Progress>,
    watermark: Arc<Watermark>,
    interrupt: Arc<AtomicBool>,
}

impl CpuWorker {
    pub fn new(
        id: u32,
        kernel: Arc<dyn SieveKernel>,
        source: Arc<PrimeSource>,
        table: Arc<TermTable>,
        sink: Arc<FactorSink>,
        progress: Arc<Progress>,
        watermark: Arc<Watermark>,
        interrupt: Arc<AtomicBool>,
    ) -> Self {
        CpuWorker { id, kernel, source, table, sink, progress, watermark, interrupt }
    }

    pub fn run(&self) -> WorkerOutcome {
        loop {
            if self.interrupt.load(Ordering::Relaxed) {
                return WorkerOutcome::Interrupted;
            }
            if self.table.is_empty() {
                return WorkerOutcome::Completed;
            }

            let chunk = match self.source.next_chunk() {
                Ok(chunk) => chunk,
                Err(crate::error::SieveError::PrimeExhausted { .. }) => return WorkerOutcome::Completed,
                Err(e) => return WorkerOutcome::Failed(e),
            };
            if chunk.is_empty() {
                return WorkerOutcome::Completed;
            }

            let real_len = chunk.len();
            let mut primes = chunk.primes;
            let last = *primes.last().unwrap();
            while primes.len() % LANES != 0 {
                primes.push(last);
            }

            for group in primes.chunks_exact(LANES) {
                if self.interrupt.load(Ordering::Relaxed) {
                    return WorkerOutcome::Interrupted;
                }
                let group: [u64; LANES] = group.try_into().unwrap();
                self.kernel.process_group(group, &self.table, &self.sink);
            }

            self.watermark.advance_to(last);
            self.progress.primes_tested.fetch_add(real_len as u64, Ordering::Relaxed);
            self.progress.factors_found.store(self.sink.total_accepted(), Ordering::Relaxed);
            self.progress.terms_remaining.store(self.table.size() as u64, Ordering::Relaxed);

            tracing::trace!(worker = self.id, largest_prime = last, "cpu worker acknowledged chunk");
        }
    }
}
