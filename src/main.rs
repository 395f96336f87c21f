//! loadmix binary
//!
//! Loads the configuration, then either runs the traffic profile against the
//! target, prints the VU schedule, or writes a template config.

use clap::Parser;
use loadmix::cli::{Cli, Command, generate_config_template};
use loadmix::config::Config;
use loadmix::metrics::Metrics;
use loadmix::runtime::{ReqwestSender, Scheduler};
use loadmix::telemetry;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output, profile }) => {
            let template = generate_config_template(profile);
            match output {
                Some(path) => {
                    std::fs::write(&path, template)?;
                    eprintln!("Wrote template configuration to {}", path);
                }
                None => print!("{}", template),
            }
            Ok(())
        }
        Some(Command::Plan { step }) => {
            let config = Config::from_file(&cli.config)?;
            let profile = &config.profile;
            let plan = serde_json::json!({
                "profile": profile.kind(),
                "total_seconds": profile.total_duration().as_secs_f64(),
                "max_vus": profile.max_vus(),
                "thresholds": profile.thresholds(),
                "points": profile.schedule(Duration::from_secs(step)),
            });
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
        Some(Command::Run { seed, metrics_file }) => {
            run(&cli.config, seed, metrics_file.as_deref()).await
        }
        None => run(&cli.config, None, None).await,
    }
}

async fn run(
    config_path: &str,
    seed: Option<u64>,
    metrics_file: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_file(config_path)?;

    // Initialize telemetry
    telemetry::init(&config.observability.log_level);

    tracing::info!(
        config = %config_path,
        target = config.target.base_url.as_deref().unwrap_or("<absolute urls>"),
        "Starting loadmix"
    );

    let metrics = Metrics::new()?;
    let sender = Arc::new(ReqwestSender::new(config.request_timeout())?);
    let seed = seed.or(config.run.seed);
    let scheduler = Scheduler::new(&config, sender, metrics.clone())?.with_seed(seed);

    let summary = scheduler.run(shutdown_signal()).await;

    tracing::info!(
        iterations = summary.iterations,
        failed_requests = summary.failed_requests,
        peak_vus = summary.peak_vus,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "Load run complete"
    );

    if let Some(path) = metrics_file {
        metrics.write_text_file(path)?;
        tracing::info!(path = %path, "Wrote metrics");
    }

    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C, run will only stop at profile end");
        std::future::pending::<()>().await;
    }
}
