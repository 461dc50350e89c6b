//! Lattice Identity - keeps the secure-naming registry in step with Services

use std::sync::Arc;

use clap::Parser;
use kube::Client;

use lattice_identity::config::ControllerConfig;
use lattice_identity::controller::informer::ServiceInformer;
use lattice_identity::controller::ServiceController;
use lattice_identity::telemetry::init_telemetry;
use lattice_identity::IdentityRegistry;

/// Lattice Identity - secure-naming registry controller
#[derive(Parser, Debug)]
#[command(name = "lattice-identity", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ControllerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.config;

    init_telemetry(config.telemetry())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    run_controller(config).await
}

/// Watch Services and maintain the identity registry until interrupted
async fn run_controller(config: ControllerConfig) -> anyhow::Result<()> {
    tracing::info!(
        namespaces = ?config.namespaces,
        watch_timeout_secs = config.watch_timeout_secs,
        "Starting lattice-identity controller"
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    let registry = IdentityRegistry::shared();
    let controller = Arc::new(ServiceController::new(
        config.namespaces.clone(),
        registry.clone(),
    ));

    let watcher_config = config.watcher_config();
    let informer = ServiceInformer::new(controller.clone());

    tokio::select! {
        result = informer.run(client, controller.namespaces(), watcher_config) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Service watch stopped");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal");
        }
    }

    tracing::info!(
        mappings = registry.len(),
        "lattice-identity controller shutting down"
    );
    Ok(())
}
