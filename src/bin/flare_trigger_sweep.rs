use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use flare_trigger_sweep::{run_parameter_search, SweepConfig};

#[derive(Debug, Parser)]
#[command(name = "flare_trigger_sweep")]
#[command(about = "Replay historical XRS flares against launch trigger thresholds")]
struct Cli {
    /// Sweep configuration (.json or .toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Flare archive, overrides `archive_path` from the config
    #[arg(long)]
    archive: Option<PathBuf>,

    /// Output base directory, overrides `output_root` from the config
    #[arg(long)]
    output: Option<PathBuf>,
}

fn resolve_default_config_path() -> PathBuf {
    let local = PathBuf::from("sweep.json");
    if local.exists() {
        return local;
    }

    let configs = PathBuf::from("configs").join("sweep.json");
    if configs.exists() {
        return configs;
    }

    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("configs")
        .join("sweep.json")
}

const DEFAULT_LOG_FILTER: &str = "info";

/// `RUST_LOG` directives (e.g. `flare_trigger_sweep=debug`), falling back to
/// `info` when unset or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn main() -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    FmtSubscriber::builder()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(resolve_default_config_path);
    let mut config = SweepConfig::from_path(&config_path)
        .with_context(|| format!("failed to load config: {}", config_path.display()))?;
    if let Some(archive) = cli.archive {
        config.archive_path = archive;
    }
    if let Some(output) = cli.output {
        config.output_root = output;
    }

    let result = run_parameter_search(&config).with_context(|| {
        format!(
            "parameter search over {} failed",
            config.archive_path.display()
        )
    })?;

    info!(
        tables = result.tables.len(),
        skipped = result.skipped.len(),
        "parameter search complete"
    );
    println!("Output directory: {}", result.output_dir.display());
    Ok(())
}
