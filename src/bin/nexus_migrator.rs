use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nexus_migrator::client::RepositoryHttpClient;
use nexus_migrator::config::{ConfigLoader, DEFAULT_AUTH_PATH, DEFAULT_CONFIG_PATH};
use nexus_migrator::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "nexus-migrator")]
#[command(about = "Migrate every artifact of a Nexus repository tree to another repository server")]
#[command(version)]
struct Cli {
    /// File (JSON) containing configuration for the Nexus Artifact Migrator.
    #[arg(long = "migratorConfFile", default_value = DEFAULT_CONFIG_PATH)]
    migrator_conf_file: PathBuf,

    /// File (JSON) containing authentication for the Nexus servers accessed by the Artifact Migrator.
    #[arg(long = "migratorAuthFile", default_value = DEFAULT_AUTH_PATH)]
    migrator_auth_file: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(&cli.migrator_conf_file, &cli.migrator_auth_file)
        .into_diagnostic()?;
    info!(
        source = %config.endpoints.listing_base,
        target = %config.endpoints.upload_base,
        credentials = ?config.credentials,
        "configuration loaded"
    );

    let client = RepositoryHttpClient::new(config.credentials.clone()).into_diagnostic()?;
    let root = config.endpoints.listing_base.clone();
    let pipeline = Pipeline::spawn(Arc::new(config), Arc::new(client)).into_diagnostic()?;

    pipeline.seed(root);
    pipeline.drain_failures(Duration::from_secs(1));
    Ok(())
}
