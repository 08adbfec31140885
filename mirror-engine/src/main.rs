use anyhow::{Context, Result};
use mirror_engine::config::Config;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Resolves the config file path from `MIRROR_CONFIG`, defaulting to
/// `config.toml` next to the binary (so a packaged deployment doesn't need
/// the working directory set) with a fallback to the current directory.
fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("MIRROR_CONFIG") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join("config.toml")))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

fn init_logging(log_directory: Option<&std::path::Path>) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(env_filter).with(tracing_subscriber::fmt::layer());

    match log_directory {
        Some(dir) => {
            if let Err(err) = std::fs::create_dir_all(dir) {
                eprintln!("failed to create log directory {dir:?}: {err}");
            }
            let file_appender = tracing_appender::rolling::daily(dir, "mirror-engine");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
            std::mem::forget(guard);
        }
        None => registry.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let path = config_path();
    let config = Config::from_file(&path).with_context(|| format!("loading configuration from {path:?}"))?;

    init_logging(config.log_directory.as_deref());
    tracing::info!(config_path = %path.display(), "starting mirror engine");

    let app = mirror_engine::supervisor::start(config).await?;
    tracing::info!("mirror engine running, awaiting shutdown signal");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutdown signal received");
    app.shutdown().await;

    Ok(())
}
