//! Prometheus exporter for SONiC network switches.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sonic_exporter::{ExporterConfig, HttpServer, build_registry};
use sonic_exporter_common::{LogFormat, init_tracing, load_config};
use sonic_exporter_framework::Scraper;
use tokio::sync::watch;
use tracing::{error, info};

/// Prometheus exporter for SONiC network switches.
#[derive(Parser, Debug)]
#[command(name = "sonic-exporter")]
#[command(about = "Export SONiC switch telemetry as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Address to listen on (overrides config).
    #[arg(long = "web.listen-address")]
    listen_address: Option<String>,

    /// Path under which to expose metrics (overrides config).
    #[arg(long = "web.telemetry-path")]
    telemetry_path: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides config).
    #[arg(long = "log.level")]
    log_level: Option<String>,

    /// Log format: text or json (overrides config).
    #[arg(long = "log.format")]
    log_format: Option<LogFormat>,
}

impl Args {
    /// Load the configuration file and apply command line overrides.
    ///
    /// Validation runs once, on the merged result.
    fn load(&self) -> anyhow::Result<ExporterConfig> {
        let mut config: ExporterConfig = match &self.config {
            Some(path) => load_config(path)?,
            None => ExporterConfig::default(),
        };

        if let Some(listen_address) = &self.listen_address {
            config.web.listen_address = listen_address.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.metrics_path = path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sonic-exporter: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("sonic-exporter: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting SONiC exporter");

    let registry = Arc::new(build_registry(&config)?);
    let scraper = Arc::new(
        Scraper::new(registry).with_collector_timeout(config.scrape.collector_timeout()),
    );

    let server = HttpServer::bind(scraper, &config.web).await?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut http_task = tokio::spawn(server.run(shutdown_rx));

    tokio::select! {
        result = &mut http_task => {
            // The server only returns on its own when it fails.
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(anyhow::anyhow!("HTTP server task failed: {}", e)),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(5), http_task).await {
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server stopped with error"),
        Err(_) => error!("HTTP server did not stop within 5s"),
        _ => {}
    }

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sonic-exporter.json5");
        std::fs::write(
            &path,
            "{ web: { listen_address: '127.0.0.1:9101' }, logging: { level: 'warn' } }",
        )
        .unwrap();

        let args = Args::try_parse_from([
            "sonic-exporter",
            "--config",
            path.to_str().unwrap(),
            "--web.listen-address",
            ":9200",
            "--web.telemetry-path",
            "/sonic",
            "--log.format",
            "json",
        ])
        .unwrap();
        let config = args.load().unwrap();

        assert_eq!(config.web.listen_address, ":9200");
        assert_eq!(config.web.metrics_path, "/sonic");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_override_repairs_invalid_file_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sonic-exporter.json5");
        std::fs::write(&path, "{ web: { metrics_path: 'metrics' } }").unwrap();

        let args = Args::try_parse_from([
            "sonic-exporter",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        assert!(args.load().is_err());

        let args = Args::try_parse_from([
            "sonic-exporter",
            "--config",
            path.to_str().unwrap(),
            "--web.telemetry-path",
            "/sonic",
        ])
        .unwrap();
        assert_eq!(args.load().unwrap().web.metrics_path, "/sonic");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args =
            Args::try_parse_from(["sonic-exporter", "--web.telemetry-path", "metrics"]).unwrap();
        assert!(args.load().is_err());

        assert!(Args::try_parse_from(["sonic-exporter", "--log.format", "yaml"]).is_err());
    }
}
