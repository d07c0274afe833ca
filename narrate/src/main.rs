#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use std::path::Path;

use anyhow::Context;
use args::Args;
use clap::Parser;
use narrate_config::Config;

const DEFAULT_CONFIG_PATH: &str = "narrate.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = load_config(&args)?;

    if let Some(provider) = &args.provider {
        config.tts.provider.clone_from(provider);
    }

    if let Some(output_dir) = &args.output_dir {
        config.tts.output_dir.clone_from(output_dir);
    }

    config.validate()?;

    // Initialize telemetry
    narrate_telemetry::init(&config.telemetry)?;

    tracing::info!(
        provider = %config.tts.provider,
        script = %args.script.display(),
        "starting narrate"
    );

    let synthesizer = tts::create_synthesizer(&config.tts)?;

    let result = tokio::select! {
        result = synthesizer.execute(&args.script, args.target_duration) => result?,
        () = shutdown_signal() => anyhow::bail!("interrupted before synthesis finished"),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => Config::load(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Config::load(Path::new(DEFAULT_CONFIG_PATH)),
        None => Config::from_env().context("failed to read configuration from the environment"),
    }
}

/// Wait for a shutdown signal (`SIGINT` or `SIGTERM`)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("shutdown signal received");
}
