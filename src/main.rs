use anyhow::{Context, Result};
use azure_metrics_exporter::config::Config;
use azure_metrics_exporter::definitions::render_definitions;
use azure_metrics_exporter::metrics::ExporterMetrics;
use azure_metrics_exporter::server;
use azure_metrics_exporter::state::{ExporterState, Snapshot};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Prometheus exporter for Azure Monitor metrics
#[derive(Parser, Debug)]
#[command(name = "azure-metrics-exporter", version, about, long_about = None)]
struct Args {
    /// Azure exporter configuration file
    #[arg(long = "config.file", default_value = "azure.yml")]
    config_file: PathBuf,

    /// The address to listen on for HTTP requests
    #[arg(long = "web.listen-address", default_value = ":9276")]
    listen_address: String,

    /// List available metric definitions for the given resources and exit
    #[arg(long = "list.definitions")]
    list_definitions: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Write logs to this file instead of stdout
    #[arg(long = "log.file")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&PathBuf>,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level();

    let (non_blocking, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(log_file.is_none())
        .with_target(true)
        .init();

    Ok(guard)
}

/// Accept Go-style `:9276` as "all interfaces"
fn bind_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_level, args.log_file.as_ref())?;

    let config = Config::load(&args.config_file).context("Error loading config")?;
    let snapshot = Snapshot::build(config, None).context("Error creating Azure client")?;

    // Without a token the exporter cannot serve anything useful
    snapshot
        .collector
        .client()
        .ensure_token()
        .await
        .context("Failed to get token")?;

    if args.list_definitions {
        print!("{}", render_definitions(&snapshot.collector).await);
        return Ok(());
    }

    let metrics = ExporterMetrics::new().context("Failed to register exporter metrics")?;
    let state = Arc::new(ExporterState::new(args.config_file.clone(), snapshot, metrics));

    #[cfg(unix)]
    spawn_reload_on_sighup(Arc::clone(&state))?;

    let address = bind_address(&args.listen_address);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Error starting HTTP server on {}", address))?;
    tracing::info!("azure-metrics-exporter listening on {}", address);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

#[cfg(unix)]
fn spawn_reload_on_sighup(state: Arc<ExporterState>) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = state.reload().await {
                tracing::error!("Failed to reload configuration: {}", e);
            }
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
