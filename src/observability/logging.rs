//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Bridge the snapshot store's log sink onto tracing
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON format for production, pretty format for development

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::ObservabilityConfig;
use crate::snapshot::store::LogSink;

/// Install the global tracing subscriber.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("proxy_config_manager={},tower_http=info", config.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Log sink handed to the snapshot store.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "snapshot_store", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "snapshot_store", "{}", message);
    }
}
