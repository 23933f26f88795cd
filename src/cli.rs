//! # Cli — Command-Line Surface
//!
//! Thin `clap` derive surface over [`Supervisor`] (spec §6 names the CLI as
//! an external collaborator, not core sieve engineering). One subcommand
//! per target family, mirroring the teacher's one-subcommand-per-search-form
//! `Commands` enum; `SierpinskiRiesel` and `Smarandache` take a JSON
//! descriptor file instead of individual flags since their parameter sets
//! (sequence lists, Legendre maps, term lists) don't reduce to a handful of
//! scalars.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::error::SieveError;
use crate::family::{FamilyParameters, MultiFactorialBasis};
use crate::io;
use crate::supervisor::{Supervisor, SupervisorConfig};
use crate::worker::gpu::GpuWorkerConfig;

#[derive(Parser)]
#[command(name = "darkreach-sieve", version, about = "Distributed modular-arithmetic sieve for parameterized integer-sequence families")]
pub struct Cli {
    /// Largest prime to test (spec `-P`).
    #[arg(short = 'P', long = "max-prime")]
    pub max_prime: u64,

    /// Smallest prime to test; raised automatically on resume (spec `-p`).
    #[arg(short = 'p', long = "min-prime", default_value_t = 2)]
    pub min_prime: u64,

    /// Number of CPU worker threads (spec `-W`).
    #[arg(short = 'W', long = "cpu-workers")]
    pub cpu_workers: Option<u32>,

    /// Primes per GPU dispatch; presence enables the GPU worker (spec `-g`).
    #[arg(short = 'g', long = "gpu-primes-per-worker")]
    pub gpu_primes_per_worker: Option<usize>,

    /// Fatal ceiling on factors drained from one GPU dispatch (spec `-M`).
    #[arg(short = 'M', long = "max-gpu-factors", default_value_t = 4096)]
    pub max_gpu_factors: u32,

    /// Informational per-dispatch GPU step budget (spec `-S`).
    #[arg(short = 'S', long = "max-gpu-steps", default_value_t = 4096)]
    pub max_gpu_steps: u64,

    /// Override for the Sierpinski/Riesel `q` subsequence-count parameter (spec `-Q`).
    #[arg(short = 'Q', long = "user-best-q")]
    pub user_best_q: Option<u64>,

    /// Prime-source chunks pulled into one GPU dispatch (spec `-s`).
    #[arg(short = 's', long = "chunks-per-gpu-worker", default_value_t = 4)]
    pub chunks_per_gpu_worker: usize,

    /// Chunk size a single CPU worker pulls per `PrimeSource::next_chunk` call.
    #[arg(long = "cpu-chunk-size", default_value_t = 4096)]
    pub cpu_chunk_size: usize,

    /// Checkpoint file path.
    #[arg(long = "checkpoint", default_value = "sieve.checkpoint")]
    pub checkpoint: PathBuf,

    /// Factor log file path.
    #[arg(long = "factor-log", default_value = "factors.log")]
    pub factor_log: PathBuf,

    /// Seconds between periodic checkpoints.
    #[arg(long = "checkpoint-interval-secs", default_value_t = 60)]
    pub checkpoint_interval_secs: u64,

    /// Ignore any checkpoint already on disk and start from `min_prime`.
    #[arg(long = "fresh", default_value_t = false)]
    pub fresh: bool,

    #[command(subcommand)]
    pub family: FamilyCommand,
}

#[derive(Subcommand)]
pub enum FamilyCommand {
    /// n!m +/- 1.
    MultiFactorial { multi: u32, min_n: u64, max_n: u64 },
    /// af(n) = sum (-1)^(n-k) k!.
    AlternatingFactorial {
        max_n: u64,
        #[arg(default_value_t = 100_000)]
        max_steps: u64,
    },
    /// k*b^n+c, solving for c.
    FixedKbn { k: u64, base: u32, n: u64, min_c: i64, max_c: i64 },
    /// k*b^n+c, solving for k.
    FixedBnc { base: u32, n: u64, c: i32, min_k: u64, max_k: u64 },
    /// 2*k*(2^n-1)+1 double-Mersenne cofactor divisors.
    DmDivisor { n: u64, min_k: u64, max_k: u64 },
    /// Generalized Sierpinski/Riesel, loaded from a JSON descriptor.
    SierpinskiRiesel { file: PathBuf },
    /// Concatenated-decimal Smarandache terms, loaded from a JSON descriptor.
    Smarandache { file: PathBuf },
}

impl Cli {
    fn build_family_parameters(&self) -> Result<FamilyParameters, SieveError> {
        let params = match &self.family {
            FamilyCommand::MultiFactorial { multi, min_n, max_n } => {
                FamilyParameters::MultiFactorial { multi: *multi, min_n: *min_n, max_n: *max_n, bases: Vec::<MultiFactorialBasis>::new() }
            }
            FamilyCommand::AlternatingFactorial { max_n, max_steps } => {
                FamilyParameters::AlternatingFactorial { max_n: *max_n, max_steps: *max_steps }
            }
            FamilyCommand::FixedKbn { k, base, n, min_c, max_c } => {
                FamilyParameters::FixedKBN { k: *k, base: *base, n: *n, min_c: *min_c, max_c: *max_c }
            }
            FamilyCommand::FixedBnc { base, n, c, min_k, max_k } => {
                FamilyParameters::FixedBNC { base: *base, n: *n, c: *c, min_k: *min_k, max_k: *max_k }
            }
            FamilyCommand::DmDivisor { n, min_k, max_k } => FamilyParameters::DMDivisor { n: *n, min_k: *min_k, max_k: *max_k },
            FamilyCommand::SierpinskiRiesel { file } => {
                let mut params = io::load_family_parameters(file)?;
                if let (Some(q), FamilyParameters::SierpinskiRiesel { q: q_field, .. }) = (self.user_best_q, &mut params) {
                    *q_field = q;
                }
                params
            }
            FamilyCommand::Smarandache { file } => io::load_family_parameters(file)?,
        };
        params.validate()?;
        Ok(params)
    }

    fn gpu_config(&self) -> Option<GpuWorkerConfig> {
        self.gpu_primes_per_worker.map(|primes_per_dispatch| GpuWorkerConfig {
            primes_per_dispatch,
            chunks_per_dispatch: self.chunks_per_gpu_worker,
            max_gpu_factors: self.max_gpu_factors,
            max_gpu_steps: self.max_gpu_steps,
        })
    }

    pub fn build_supervisor(&self) -> Result<Supervisor, SieveError> {
        let params = self.build_family_parameters()?;
        let cpu_workers = self.cpu_workers.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get() as u32).unwrap_or(1));
        let config = SupervisorConfig {
            min_prime: self.min_prime,
            max_prime: self.max_prime,
            cpu_workers,
            cpu_chunk_size: self.cpu_chunk_size,
            gpu: self.gpu_config(),
            checkpoint_path: self.checkpoint.clone(),
            factor_log_path: self.factor_log.clone(),
            checkpoint_interval: Duration::from_secs(self.checkpoint_interval_secs),
            fresh_start: self.fresh,
        };
        Ok(Supervisor::new(params, config))
    }
}
