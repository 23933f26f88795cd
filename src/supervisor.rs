//! # Supervisor — Worker Pool, Watermark Reconciliation, Checkpointing
//!
//! Owns the `TermTable`, `FactorSink`, and `PrimeSource` for one run; spawns
//! the CPU and (optionally) GPU workers on a scoped thread set; and ticks a
//! checkpoint/factor-log loop on the calling thread while they run (spec
//! §4.7, §5). The watermark it reports back is the minimum acknowledged
//! prime across every worker, floored at the resume point — a prime is only
//! ever checkpointed once every worker has moved past it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::checkpoint::{self, CheckpointData};
use crate::error::SieveError;
use crate::factor_sink::FactorSink;
use crate::family::FamilyParameters;
use crate::io;
use crate::kernel::{self, SieveKernel};
use crate::prime_source::PrimeSource;
use crate::progress::Progress;
use crate::term_table::TermTable;
use crate::worker::cpu::CpuWorker;
use crate::worker::gpu::{GpuWorker, GpuWorkerConfig};
use crate::worker::{Watermark, WorkerOutcome};

/// A factor burst this large forces an out-of-cycle checkpoint tick even if
/// the periodic interval hasn't elapsed yet (spec §5: "or on factor burst").
const FACTOR_BURST_THRESHOLD: usize = 256;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct SupervisorConfig {
    pub min_prime: u64,
    pub max_prime: u64,
    pub cpu_workers: u32,
    pub cpu_chunk_size: usize,
    pub gpu: Option<GpuWorkerConfig>,
    pub checkpoint_path: PathBuf,
    pub factor_log_path: PathBuf,
    pub checkpoint_interval: Duration,
    /// Start fresh, ignoring any checkpoint already on disk.
    pub fresh_start: bool,
}

#[derive(Debug)]
pub enum SieveExit {
    /// The prime stream reached `max_prime`, or the term table emptied,
    /// without interruption.
    Completed { watermark: u64 },
    /// A clean drain after SIGINT. Caller should exit with code 2 (spec §6).
    Interrupted { watermark: u64 },
}

pub struct Supervisor {
    params: FamilyParameters,
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(params: FamilyParameters, config: SupervisorConfig) -> Self {
        Supervisor { params, config }
    }

    pub fn run(&self) -> Result<SieveExit, SieveError> {
        self.params.validate()?;
        let (kernel, table) = kernel::build(&self.params)?;
        let kernel: Arc<dyn SieveKernel> = Arc::from(kernel);
        let table = Arc::new(table);

        let mut floor = self.config.min_prime;
        if !self.config.fresh_start {
            if let Some(cp) = checkpoint::load(&self.config.checkpoint_path, self.params.term_key_shape()) {
                floor = floor.max(cp.watermark);
                let alive: std::collections::HashSet<_> = cp.alive_terms.into_iter().collect();
                table.retain_only(&alive);
                tracing::info!(watermark = floor, term_count = table.size(), "resumed from checkpoint");
            }
        } else {
            checkpoint::clear(&self.config.checkpoint_path);
        }

        if table.is_empty() {
            tracing::info!("term table already empty at startup; nothing to sieve");
            return Ok(SieveExit::Completed { watermark: self.config.max_prime });
        }

        let source = Arc::new(PrimeSource::new(floor + 1, self.config.max_prime, self.config.cpu_chunk_size));
        let sink = Arc::new(FactorSink::new());
        let progress = Progress::new(table.size() as u64);
        let interrupt = Arc::new(AtomicBool::new(false));
        self.install_interrupt_handler(&interrupt);

        let reporter = progress.start_reporter();

        let worker_count = self.config.cpu_workers as usize + self.config.gpu.is_some() as usize;
        let watermarks: Vec<Arc<Watermark>> = (0..worker_count).map(|_| Arc::new(Watermark::new())).collect();
        let watermark_floor = AtomicU64::new(floor);

        let outcomes = std::thread::scope(|scope| {
            let mut handles = Vec::new();
            for i in 0..self.config.cpu_workers {
                let worker = CpuWorker::new(
                    i,
                    kernel.clone(),
                    source.clone(),
                    table.clone(),
                    sink.clone(),
                    progress.clone(),
                    watermarks[i as usize].clone(),
                    interrupt.clone(),
                );
                handles.push(scope.spawn(move || worker.run()));
            }
            if let Some(gpu_cfg) = self.config.gpu {
                let idx = self.config.cpu_workers as usize;
                let worker = GpuWorker::new(
                    self.config.cpu_workers,
                    kernel.clone(),
                    source.clone(),
                    table.clone(),
                    sink.clone(),
                    progress.clone(),
                    watermarks[idx].clone(),
                    interrupt.clone(),
                    gpu_cfg,
                );
                handles.push(scope.spawn(move || worker.run()));
            }

            self.checkpoint_loop(&handles, &watermarks, &watermark_floor, &table, &sink, &interrupt);

            handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
        });

        progress.stop();
        let _ = reporter.join();

        let failed: Vec<&SieveError> = outcomes
            .iter()
            .filter_map(|o| match o {
                WorkerOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .collect();
        let any_completed_or_interrupted = outcomes.iter().any(|o| matches!(o, WorkerOutcome::Completed | WorkerOutcome::Interrupted));
        if !failed.is_empty() && !any_completed_or_interrupted {
            return Err(SieveError::Device { worker_id: 0, message: format!("all workers failed: {failed:?}") });
        }
        for e in &failed {
            tracing::error!(error = %e, "a worker failed; continuing with remaining workers' results");
        }

        let final_watermark = self.reconcile_watermark(&watermarks, &watermark_floor, &table);
        self.flush(&sink, final_watermark, &table)?;

        if interrupt.load(Ordering::Relaxed) {
            Ok(SieveExit::Interrupted { watermark: final_watermark })
        } else {
            Ok(SieveExit::Completed { watermark: final_watermark })
        }
    }

    fn install_interrupt_handler(&self, interrupt: &Arc<AtomicBool>) {
        let flag = interrupt.clone();
        let already_installed = ctrlc::set_handler(move || {
            tracing::warn!("interrupt received, draining in-flight work and writing a final checkpoint");
            flag.store(true, Ordering::Relaxed);
        });
        if let Err(e) = already_installed {
            tracing::debug!(error = %e, "ctrlc handler not installed (already set for this process)");
        }
    }

    fn reconcile_watermark(&self, watermarks: &[Arc<Watermark>], floor: &AtomicU64, table: &TermTable) -> u64 {
        if table.is_empty() {
            return self.config.max_prime;
        }
        let base = floor.load(Ordering::Relaxed);
        watermarks.iter().map(|w| w.get().max(base)).min().unwrap_or(base)
    }

    fn flush(&self, sink: &FactorSink, watermark: u64, table: &TermTable) -> Result<(), SieveError> {
        let batch = sink.flush();
        if let Err(e) = io::append_factors(&self.config.factor_log_path, &self.params, &batch) {
            tracing::error!(error = %e, "factor log write failed");
        } else if !batch.is_empty() {
            tracing::info!(count = batch.len(), "appended factors to log");
        }
        let snapshot = CheckpointData { watermark, alive_terms: table.snapshot_keys() };
        checkpoint::save(&self.config.checkpoint_path, &snapshot)
    }

    #[allow(clippy::too_many_arguments)]
    fn checkpoint_loop(
        &self,
        handles: &[std::thread::ScopedJoinHandle<'_, WorkerOutcome>],
        watermarks: &[Arc<Watermark>],
        floor: &AtomicU64,
        table: &Arc<TermTable>,
        sink: &Arc<FactorSink>,
        interrupt: &Arc<AtomicBool>,
    ) {
        let mut last_checkpoint = Instant::now();
        loop {
            std::thread::sleep(POLL_INTERVAL);
            let done = handles.iter().all(|h| h.is_finished());

            let current = self.reconcile_watermark(watermarks, floor, table);
            floor.fetch_max(current, Ordering::Relaxed);

            let due = last_checkpoint.elapsed() >= self.config.checkpoint_interval;
            let burst = sink.pending_len() >= FACTOR_BURST_THRESHOLD;
            if due || burst || done || interrupt.load(Ordering::Relaxed) {
                let watermark = floor.load(Ordering::Relaxed);
                if let Err(e) = self.flush(sink, watermark, table) {
                    tracing::error!(error = %e, "checkpoint tick failed, will retry next cycle");
                } else {
                    tracing::debug!(watermark, "checkpoint written");
                }
                last_checkpoint = Instant::now();
            }

            if done {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> SupervisorConfig {
        SupervisorConfig {
            min_prime: 2,
            max_prime: 2000,
            cpu_workers: 2,
            cpu_chunk_size: 64,
            gpu: None,
            checkpoint_path: dir.join("sieve.checkpoint"),
            factor_log_path: dir.join("factors.log"),
            checkpoint_interval: Duration::from_millis(50),
            fresh_start: true,
        }
    }

    #[test]
    fn runs_small_dm_divisor_to_completion() {
        let dir = tempdir().unwrap();
        let params = FamilyParameters::DMDivisor { n: 7, min_k: 1, max_k: 500 };
        let supervisor = Supervisor::new(params, config(dir.path()));
        match supervisor.run().unwrap() {
            SieveExit::Completed { watermark } => assert_eq!(watermark, 2000),
            other => panic!("expected Completed, got {other:?}"),
        }
        assert!(dir.path().join("sieve.checkpoint").exists());
    }

    #[test]
    fn resume_from_checkpoint_never_regresses_watermark() {
        let dir = tempdir().unwrap();
        let params = FamilyParameters::DMDivisor { n: 7, min_k: 1, max_k: 500 };

        let mut cfg = config(dir.path());
        cfg.max_prime = 500;
        let first = Supervisor::new(params.clone(), cfg);
        let watermark_after_first = match first.run().unwrap() {
            SieveExit::Completed { watermark } => watermark,
            other => panic!("expected Completed, got {other:?}"),
        };

        let mut cfg2 = config(dir.path());
        cfg2.max_prime = 2000;
        cfg2.fresh_start = false;
        let second = Supervisor::new(params, cfg2);
        match second.run().unwrap() {
            SieveExit::Completed { watermark } => assert!(watermark >= watermark_after_first),
            other => panic!("expected Completed, got {other:?}"),
        }
    }
}
