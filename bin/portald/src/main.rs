//! ---
//! portal_section: "01-core-functionality"
//! portal_subsection: "binary"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Binary entrypoint for the client portal daemon."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use portal_api::{price_quotation, spawn_portal_server, PortalState};
use portal_common::{init_tracing, AppConfig, VersionInfo};
use portal_store::{seed_demo, PortalStore, Quotation};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Client portal daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'V',
        long = "version",
        action = ArgAction::SetTrue,
        help = "Print extended version information and exit"
    )]
    version: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Serve the portal until interrupted")]
    Run,
    #[command(about = "Create the database schema and exit")]
    InitDb,
    #[command(about = "Load and validate the configuration")]
    CheckConfig,
    #[command(about = "Print the reconstructed pricing of a quotation as JSON")]
    Price {
        #[arg(value_name = "QUOTATION_ID")]
        quotation: i64,
    },
    #[command(about = "Write demo clients, projects and quotations")]
    SeedDemo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/portal.toml"));
    candidates.push(PathBuf::from("configs/portal.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let config = loaded.config;
    let config_path = loaded.source;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("portald", &config.logging)?;
            info!(
                config_path = %config_path.display(),
                version = %version.cli_string(),
                "configuration loaded"
            );
            run_server(config).await?;
        }
        Commands::InitDb => {
            open_store(&config.database.path)?;
            println!("Database ready: {}", config.database.path.display());
        }
        Commands::CheckConfig => print_summary(&config, &config_path),
        Commands::Price { quotation } => {
            let store = open_store(&config.database.path)?;
            let record = store
                .load_entity(quotation)
                .with_context(|| format!("failed to load quotation {quotation}"))?;
            let quotation = Quotation::from_record(&record)?;
            let priced = price_quotation(&store, &quotation, &config.pricing.default_vat_rate)
                .with_context(|| format!("failed to price quotation {}", quotation.reference))?;
            println!("{}", serde_json::to_string_pretty(&priced)?);
        }
        Commands::SeedDemo => {
            let mut store = open_store(&config.database.path)?;
            let ids = seed_demo(&mut store).context("failed to write demo data")?;
            println!(
                "Demo data written: client {} (anna@example.com), client {} (bram@example.com), quotation {}",
                ids.client, ids.other_client, ids.quotation
            );
        }
    }

    Ok(())
}

fn open_store(path: &Path) -> Result<PortalStore> {
    PortalStore::open(path)
        .with_context(|| format!("failed to open portal database {}", path.display()))
}

async fn run_server(config: AppConfig) -> Result<()> {
    let listen = config.server.listen;
    let state = Arc::new(PortalState::from_config(config)?);
    info!(state = ?state, "portal state initialised");

    let server = spawn_portal_server(state, listen)?;
    info!(address = %server.addr(), "portal running; waiting for termination signal");
    shutdown_signal().await;
    info!("termination signal received; shutting down");
    server.shutdown().await
}

fn print_summary(config: &AppConfig, source: &Path) {
    let enabled = |flag: bool| if flag { "enabled" } else { "disabled" };
    println!("Configuration: {}", source.display());
    println!("Listen: {}", config.server.listen);
    match &config.server.static_dir {
        Some(dir) => println!("Static assets: {}", dir.display()),
        None => println!("Static assets: none"),
    }
    println!("Database: {}", config.database.path.display());
    println!("Session cookie: {}", config.session.cookie_name);
    println!("CRM: {}", enabled(config.crm.base_url.is_some()));
    println!("PDF rendering: {}", enabled(config.pdf.endpoint.is_some()));
    println!(
        "Pricing: {} with default VAT {}%",
        config.pricing.currency, config.pricing.default_vat_rate
    );
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        tokio::select! {
            _ = ctrl_c() => {},
            _ = terminate() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
    }
}

async fn ctrl_c() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(?err, "failed to install Ctrl+C handler");
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
        }
        Err(err) => {
            warn!(?err, "failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}
