//! Binary entry point: parses the CLI, wires up tracing, and runs the
//! sieve to completion or interruption (spec §6 exit codes: 0 success, 1
//! fatal sieve error, 2 user interrupt with a valid checkpoint written).

use clap::Parser;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing() {
    let format = std::env::var("LOG_FORMAT").unwrap_or_default();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).with_target(false).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
    }
}

fn main() {
    init_tracing();
    let cli = darkreach_sieve::cli::Cli::parse();

    let supervisor = match cli.build_supervisor() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "invalid sieve configuration");
            std::process::exit(1);
        }
    };

    match supervisor.run() {
        Ok(darkreach_sieve::supervisor::SieveExit::Completed { watermark }) => {
            tracing::info!(watermark, "sieve completed");
            std::process::exit(0);
        }
        Ok(darkreach_sieve::supervisor::SieveExit::Interrupted { watermark }) => {
            tracing::warn!(watermark, "sieve interrupted; checkpoint written for resume");
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "sieve failed");
            std::process::exit(1);
        }
    }
}
