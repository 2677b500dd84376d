//! Proxy config manager.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        CONFIG MANAGER                            │
//!   │                                                                  │
//!   │  ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌─────────┐  │
//!   │  │ identity │──▶│   version    │──▶│  updater   │──▶│snapshot │◀─┼── proxies
//!   │  │ resolver │   │   tracker    │   │fetch/build │   │  store  │  │
//!   │  └──────────┘   └──────▲───────┘   └────────────┘   └─────────┘  │
//!   │                        │                                         │
//!   │                 ┌──────┴───────┐                                 │
//!   │                 │rollout check │  (managed strategy only)        │
//!   │                 │    loop      │                                 │
//!   │                 └──────────────┘                                 │
//!   │                                                                  │
//!   │  metadata server ─▶ identity, attributes, tokens                 │
//!   │  service management API ─▶ rollouts, configs                     │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use proxy_config_manager::admin::{serve_admin, AdminState};
use proxy_config_manager::config::validation::validate_config;
use proxy_config_manager::config::{load_config, AppConfig, ConfigError};
use proxy_config_manager::lifecycle::signals::wait_for_signal;
use proxy_config_manager::manager::{Collaborators, ConfigManager};
use proxy_config_manager::observability::{init_logging, metrics, TracingLogSink};
use proxy_config_manager::service::{MetadataClient, MetadataSource, ServiceManagementClient};
use proxy_config_manager::snapshot::{DefaultSnapshotBuilder, InMemorySnapshotStore, NodeIdHash};
use proxy_config_manager::Shutdown;

#[derive(Parser, Debug)]
#[command(name = "config-manager")]
#[command(about = "Keeps proxy resource snapshots in step with a service's active configuration")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Endpoint service name.
    #[arg(long)]
    service: Option<String>,

    /// Initial service config id.
    #[arg(long)]
    service_config_id: Option<String>,

    /// Service config rollout strategy, must be either "managed" or "fixed".
    #[arg(long)]
    rollout_strategy: Option<String>,

    /// Fetch service name, config id and rollout strategy from the metadata server.
    #[arg(long)]
    check_metadata: bool,

    /// Seconds between rollout checks.
    #[arg(long)]
    check_rollout_interval: Option<u64>,

    /// Run without a metadata server.
    #[arg(long)]
    non_gcp: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if self.service.is_some() {
            config.manager.service_name = self.service.clone();
        }
        if self.service_config_id.is_some() {
            config.manager.config_id = self.service_config_id.clone();
        }
        if self.rollout_strategy.is_some() {
            config.manager.rollout_strategy = self.rollout_strategy.clone();
        }
        if self.check_metadata {
            config.manager.check_metadata = true;
        }
        if let Some(secs) = self.check_rollout_interval {
            config.manager.check_interval_secs = secs;
        }
        if self.non_gcp {
            config.metadata.non_gcp = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);
    tracing::info!("config-manager v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let metadata: Option<Arc<dyn MetadataSource>> = MetadataClient::new(&config.metadata)?
        .map(|client| Arc::new(client) as Arc<dyn MetadataSource>);
    let service_management = Arc::new(ServiceManagementClient::new(
        &config.service_management,
        metadata.clone(),
    )?);
    let store = Arc::new(InMemorySnapshotStore::new(
        Arc::new(NodeIdHash),
        Arc::new(TracingLogSink),
    ));

    let deps = Collaborators {
        fetcher: service_management.clone(),
        tracker: service_management,
        builder: Arc::new(DefaultSnapshotBuilder::new()),
        store,
        metadata,
    };

    let mut manager =
        match ConfigManager::bootstrap(&config.manager, config.generator.clone(), deps).await {
            Ok(manager) => manager,
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Failed to bootstrap config manager");
                return Err(e.into());
            }
        };

    let shutdown = Shutdown::new();
    manager.start(shutdown.subscribe());

    let admin_task = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            status: manager.status_handle(),
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        Some(tokio::spawn(serve_admin(listener, state, shutdown.subscribe())))
    } else {
        None
    };

    wait_for_signal(&shutdown).await;

    manager.join().await;
    if let Some(task) = admin_task {
        match task.await {
            Ok(Err(e)) => tracing::error!(error = %e, "Admin endpoint failed"),
            Err(e) => tracing::error!(error = %e, "Admin task failed"),
            Ok(Ok(())) => {}
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
