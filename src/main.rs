//! C.A.R.E. Gateway
//!
//! Main entry point: runs the vital-sign simulation, the group analysis
//! automation and the HTTP control surface until interrupted.

use std::path::PathBuf;
use std::sync::Arc;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use care_gateway::api::{self, middleware, AppState};
use care_gateway::settings::{self, LogFormat, LogSettings};
use care_gateway::{
    AnalyzedGroups, CommandAnalyzer, Emitter, FhirEmitter, GroupWatcher, JsonGroupStore, LogEmitter,
    PatientRegistry, SimulationScheduler,
};

#[derive(Parser)]
#[command(name = "care-gateway", about = "Live vital-sign simulation and group insight automation")]
struct Cli {
    /// Directory holding default.toml and per-environment overrides
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Log emissions instead of posting them to the FHIR server
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let settings = settings::load_settings(&cli.config_dir).context("Failed to load configuration")?;
    init_tracing(&settings.log);

    let emitter: Arc<dyn Emitter> = if cli.dry_run {
        info!("dry run: emissions are logged, not posted");
        Arc::new(LogEmitter)
    } else {
        Arc::new(
            FhirEmitter::new(&settings.fhir.base_url, settings.fhir.timeout())
                .context("Failed to build FHIR client")?,
        )
    };
    let analyzer = CommandAnalyzer::from_command_line(&settings.automation.analyzer_command)
        .context("Analyzer command is empty")?;

    let registry = Arc::new(PatientRegistry::new());
    let analyzed = Arc::new(AnalyzedGroups::new());
    let shutdown = CancellationToken::new();

    let simulation = SimulationScheduler::new(registry.clone(), emitter.clone(), settings.simulation.clone());
    let watcher = GroupWatcher::new(
        Arc::new(JsonGroupStore::new(settings.groups.path.clone())),
        Arc::new(analyzer),
        emitter,
        analyzed.clone(),
        settings.automation.clone(),
    );

    let simulation_task = tokio::spawn(simulation.run(shutdown.clone()));
    let automation_task = tokio::spawn(watcher.run(shutdown.clone()));

    // Start HTTP server
    let state = web::Data::new(AppState::new(registry, analyzed));
    let (host, port) = (settings.server.host.clone(), settings.server.port);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::cors())
            .configure(api::configure)
    })
    .disable_signals()
    .bind((host.as_str(), port))
    .with_context(|| format!("Failed to bind {}:{}", host, port))?
    .run();

    let handle = server.handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("shutdown requested");
        handle.stop(true).await;
    });

    info!(%host, port, fhir = %settings.fhir.base_url, "C.A.R.E. Gateway started");
    let served = server.await;

    // in-flight ticks and sweeps finish before the loops exit
    shutdown.cancel();
    let (simulation, automation) = tokio::join!(simulation_task, automation_task);
    if let Err(e) = simulation {
        error!("simulation task ended abnormally: {}", e);
    }
    if let Err(e) = automation {
        error!("automation task ended abnormally: {}", e);
    }

    served.context("HTTP server failed")?;
    info!("shutdown complete");
    Ok(())
}
