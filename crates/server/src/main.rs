//! sheed - watershed delineation service

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sheed_cloud::{DemCache, OpenTopography};
use sheed_pipeline::{JobRequest, WatershedJob};
use sheed_server::config::{Cli, Command, DelineateArgs, ProviderArgs, ServeArgs};
use sheed_server::{app, logging, AppState};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

fn provider(api_key: &str, args: &ProviderArgs) -> Result<OpenTopography> {
    OpenTopography::with_base_url(api_key, args.dem_url.clone())
        .context("Failed to set up DEM provider")
}

async fn serve(api_key: &str, args: ServeArgs) -> Result<()> {
    ensure_dir(&args.provider.output_dir)?;
    ensure_dir(&args.static_dir)?;

    let source = provider(api_key, &args.provider)?;
    let state = AppState::new(Arc::new(source), &args.provider.output_dir, &args.static_dir);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")
}

async fn delineate(api_key: &str, args: DelineateArgs) -> Result<()> {
    ensure_dir(&args.provider.output_dir)?;
    let source = provider(api_key, &args.provider)?;
    let cache = DemCache::new(&args.provider.output_dir);

    let (lat, lon) = args.coordinates;
    let job = WatershedJob::new(JobRequest {
        lat,
        lon,
        name: args.name,
        expand_factor: args.expand_factor,
        client_id: String::new(),
        dataset: args.dem,
    })?;

    let start = Instant::now();
    let pb = spinner("Starting...");
    let log = |line: &str| pb.set_message(line.to_string());
    let outcome = job.run(&source, &cache, &log).await;
    pb.finish_and_clear();
    let outcome = outcome.context("Watershed delineation failed")?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.clipped {
        eprintln!("Warning: the catchment still touches the DEM edge");
    }
    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Serve(args) => serve(&cli.api_key, args).await,
        Command::Delineate(args) => delineate(&cli.api_key, args).await,
    }
}
