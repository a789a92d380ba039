use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use scapem::config::Config;
use scapem::pipeline::run;

/// Visibility, AOT, water vapour and surface reflectance retrieval for MERIS scenes
#[derive(Parser, Debug)]
#[command(name = "scapem")]
#[command(about = "SCAPE-M atmospheric correction of MERIS radiance scenes")]
struct Args {
    /// JSON configuration file
    #[arg(short, long, env = "SCAPEM_CONFIG")]
    config: PathBuf,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of worker threads
    #[arg(long, env = "SCAPEM_THREADS")]
    threads: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let start = Instant::now();
    let config = Config::from_file(&args.config)?;
    info!("Using configuration {}", args.config.display());

    let written = run(&config)?;
    info!(
        "Finished {} products in {:.1} s",
        written.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
