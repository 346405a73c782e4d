//! Asset report server and offline renderer.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use asset_report::emit::Backend;
use asset_report::model::ReportScope;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use asset_report_server::config::AppConfig;
use asset_report_server::store::{self, FileStore, RecordStore};
use asset_report_server::{create_router, AppState};

const DEFAULT_LOG_FILTER: &str = "asset_report=info,asset_report_server=info,tower_http=info";

/// Serves cost-center asset reports as PDF downloads.
///
/// Settings come from `config/default.toml`, `config/{RUN_MODE}.toml`, the file given with
/// `--config` and `ASSET_REPORT__*` environment variables, in that order.
#[derive(Parser)]
#[command(author, version, about = "Cost-center asset inventory PDF reports")]
struct Cli {
    /// Additional configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (the default).
    Serve {
        /// Overrides server.port.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Render a report from a JSON file of records.
    Render {
        /// JSON array of asset documents.
        #[arg(long)]
        input: PathBuf,

        /// Restrict the report to one cost center.
        #[arg(long)]
        cost_center: Option<String>,

        /// Output file; defaults to the report file name in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overrides report.backend (`draw` or `table`).
        #[arg(long)]
        backend: Option<Backend>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Render {
            input,
            cost_center,
            output,
            backend,
        } => render(config, &input, cost_center, output, backend).await,
    }
}

async fn serve(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let store = store::from_config(&config.store).context("Failed to create record store")?;
    let emitter = config.report.backend.emitter(config.report.fonts_dir.clone());
    info!(backend = %config.report.backend, output_dir = %config.report.output_dir.display(), "Report backend configured");

    let state = AppState {
        store,
        emitter: Arc::from(emitter),
        output_dir: config.report.output_dir.clone(),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, port.unwrap_or(config.server.port));
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn render(
    config: AppConfig,
    input: &Path,
    cost_center: Option<String>,
    output: Option<PathBuf>,
    backend: Option<Backend>,
) -> anyhow::Result<()> {
    let store = FileStore::new(input);
    let (scope, records) = match cost_center {
        Some(cost_center) => {
            let records = store.fetch_by_cost_center(&cost_center).await?;
            (ReportScope::CostCenter(cost_center), records)
        }
        None => (ReportScope::All, store.fetch_all().await?),
    };

    let backend = backend.unwrap_or(config.report.backend);
    let emitter = backend.emitter(config.report.fonts_dir.clone());
    let task_scope = scope.clone();
    let rendered =
        tokio::task::spawn_blocking(move || asset_report::generate(records, &task_scope, emitter.as_ref()))
            .await??;

    let output = output.unwrap_or_else(|| PathBuf::from(scope.file_name()));
    tokio::fs::write(&output, &rendered.bytes)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        path = %output.display(),
        pages = ?rendered.page_count,
        skipped_images = rendered.skipped_images,
        "Report written"
    );
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
