use clap::{Args, Parser};
use config::{ConfigError, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use provisioner::ProvisionerRunError;
use provisioner::config::{Settings, SettingsError};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;

#[derive(Parser)]
enum CliCommand {
    /// Run the workbook intake endpoint
    Serve(ServeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// YAML config file. Defaults apply to every section when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error(transparent)]
    Run(#[from] ProvisionerRunError),
}

fn main() -> ExitCode {
    let cli = CliCommand::parse();

    let result = match cli {
        CliCommand::Serve(args) => serve(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("intake: {e}");
            ExitCode::FAILURE
        }
    }
}

fn serve(args: ServeArgs) -> Result<(), CliError> {
    // A .env file only fills in variables the environment does not already set
    if let Ok(path) = dotenvy::dotenv() {
        println!("Loaded environment from {}", path.display());
    }

    let config = match &args.config {
        Some(path) => config::Config::from_file(path)?,
        None => config::Config::default(),
    };

    let _sentry = logging::init(config.logging.as_ref())?;

    if let Some(metrics) = &config.metrics {
        install_statsd(metrics)?;
    }

    let settings = Settings::from_env()?;

    tracing::info!("Starting provisioner");
    provisioner::run(config.provisioner, settings)?;
    Ok(())
}

fn install_statsd(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some("intake"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    provisioner::metrics_defs::describe_all();

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
