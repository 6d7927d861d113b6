//! Skyhub CLI
//!
//! Ingests the remote image manifest and serves the resized results.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use skyhub::{
    error::{AppError, Result},
    index::{ImageIndex, JsonIndex},
    models::{Config, SizeSpec},
    pipeline::{self, Pipeline, PipelineReport},
    server::{self, AppState},
    storage::{ImageStorage, LocalStorage},
    utils::http,
};
use tokio_util::sync::CancellationToken;

/// Skyhub - image manifest ingester
#[derive(Parser, Debug)]
#[command(
    name = "skyhub",
    version,
    about = "Downloads, resizes and serves images listed in a remote manifest"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "skyhub.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the ingestion pipeline once
    Ingest {
        /// Write the run report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Serve stored images and the index listing
    Serve,

    /// Ingest, then serve
    Run,

    /// Validate the configuration file
    Validate,

    /// Check every indexed record against storage
    Verify,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Cancel `token` once `signal` fires. A signal that cannot be awaited
/// leaves the token untouched.
async fn cancel_on_signal(
    signal: impl Future<Output = std::io::Result<()>>,
    token: CancellationToken,
) {
    match signal.await {
        Ok(()) => {
            log::warn!("Ctrl-C received, shutting down");
            token.cancel();
        }
        Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
    }
}

/// Cancel the returned token on Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), token.clone()));
    token
}

/// Load the config; `validate` insists the file exists.
fn load_config(cli: &Cli) -> Result<Config> {
    let loaded = match cli.command {
        Command::Validate => Config::load(&cli.config),
        _ => Config::load_if_present(&cli.config),
    };
    let config = loaded.inspect_err(|e| {
        log::error!("Cannot load config {}: {}", cli.config.display(), e);
    })?;

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }
    Ok(config)
}

struct Backends {
    storage: Arc<dyn ImageStorage>,
    index: Arc<dyn ImageIndex>,
}

impl Backends {
    async fn open(config: &Config) -> Result<Self> {
        let index = JsonIndex::open(config.index.path.clone()).await.map_err(|e| {
            log::error!("Cannot open index {}: {}", config.index.path.display(), e);
            e
        })?;
        Ok(Self {
            storage: Arc::new(LocalStorage::from_config(config)),
            index: Arc::new(index),
        })
    }
}

/// Run the pipeline once; `None` if cancelled before the manifest arrived.
async fn ingest(
    config: &Config,
    backends: &Backends,
    cancel: &CancellationToken,
) -> Result<Option<PipelineReport>> {
    let client = http::create_async_client(&config.source)?;
    let pipeline = Pipeline::new(
        &config.pipeline,
        client,
        Arc::clone(&backends.storage),
        Arc::clone(&backends.index),
    );
    match pipeline
        .run(&config.source.endpoint, &SizeSpec::ALL, cancel)
        .await
    {
        Ok(report) => Ok(Some(report)),
        Err(AppError::Cancelled(_)) => {
            log::warn!("Cancelled before the manifest was fetched");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

async fn serve(config: &Config, backends: &Backends, cancel: CancellationToken) -> Result<()> {
    let state = AppState::new(Arc::clone(&backends.index), Arc::clone(&backends.storage));
    let router = server::router(&config.storage.url_prefix, state);
    server::serve(&config.server.listen_addr, router, cancel).await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;

    let cancel = shutdown_on_ctrl_c();

    match cli.command {
        Command::Validate => {
            log::info!("✓ Config OK ({})", cli.config.display());
        }

        Command::Ingest { report } => {
            let backends = Backends::open(&config).await?;
            let summary = ingest(&config, &backends, &cancel).await?;
            if let (Some(summary), Some(path)) = (summary, report) {
                let json = serde_json::to_string_pretty(&summary)?;
                tokio::fs::write(&path, json).await?;
                log::info!("Report written to {}", path.display());
            }
        }

        Command::Serve => {
            let backends = Backends::open(&config).await?;
            serve(&config, &backends, cancel).await?;
        }

        Command::Run => {
            let backends = Backends::open(&config).await?;
            log::info!("Step 1/2: Ingesting images...");
            ingest(&config, &backends, &cancel).await?;

            if cancel.is_cancelled() {
                log::warn!("Cancelled before serving");
                return Ok(());
            }
            log::info!("Step 2/2: Serving...");
            serve(&config, &backends, cancel).await?;
        }

        Command::Verify => {
            let backends = Backends::open(&config).await?;
            let report =
                pipeline::verify(backends.index.as_ref(), backends.storage.as_ref()).await?;
            if !report.is_ok() {
                return Err(AppError::validation(format!(
                    "{} of {} records failed verification",
                    report.problems.len(),
                    report.checked
                )));
            }
        }
    }

    log::info!("Done!");
    Ok(())
}
