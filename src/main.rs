use anyhow::Result;
use log::{debug, info};
use ringlog::{Drain, File, LogBuilder, MultiLogBuilder, Output, Stderr};
use route_bench::{Cli, Config};
use std::time::Duration;

/// Maximum trace log file size before rotation (10MB)
const LOG_FILE_MAX_SIZE: u64 = 1024 * 1024 * 10;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load configuration first so logging can honor its settings
    let config = Config::load(cli.config.as_deref())?;

    let log_level = config.log.level.to_level_filter();

    // Configure output destination
    let output: Box<dyn Output> = if let Some(ref log_file) = config.output.trace_log {
        // Log to file with rotation
        let backup_file = log_file.with_extension("old");
        Box::new(File::new(log_file.clone(), backup_file, LOG_FILE_MAX_SIZE)?)
    } else {
        // Log to stderr
        Box::new(Stderr::new())
    };

    let log = LogBuilder::new()
        .output(output)
        .build()
        .expect("failed to initialize logger");

    let mut drain = MultiLogBuilder::new()
        .level_filter(log_level)
        .default(log)
        .build()
        .start();

    // Keep the drain flushed outside the request path
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_millis(100));
        let _ = drain.flush();
    });

    // Print clean startup message
    if !config.output.quiet {
        println!("LLM Routing Benchmark");
        if let Some(ref path) = cli.config {
            println!("   Config: {}", path.display());
        }
        println!("   Target: {}", config.endpoint.base_url);
        println!("   Routing model: {}", config.routing.target());
        println!("   Concurrency: {}", config.load.concurrent_requests);
        println!("   Questions: {}", config.input.file.display());
        println!();
    }

    // Build tokio runtime with the configured worker threads
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.runtime.worker_threads)
        .enable_all()
        .build()?;

    runtime.block_on(async { run_benchmark(config).await })
}

async fn run_benchmark(config: Config) -> Result<()> {
    debug!("Initializing benchmark runner");
    let runner = route_bench::BenchmarkRunner::new(config)?;
    info!("Starting benchmark run");
    runner.run().await?;
    info!("Benchmark process completed");

    // Give the background drain a moment to flush the tail of the log
    tokio::time::sleep(Duration::from_millis(250)).await;
    Ok(())
}
