//! # Accessd Observe - Observability Layer
//!
//! Centralized structured logging and metrics for accessd.

#![deny(unsafe_code)]

use std::sync::OnceLock;

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Global Prometheus handle for rendering metrics
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod metrics;

/// Configuration for the tracing subscriber
#[derive(Debug, Clone, bon::Builder)]
#[builder(on(String, into))]
pub struct TracingConfig {
    /// Service name attached to the startup log line
    #[builder(default = "accessd".to_string())]
    pub service_name: String,
    /// Filter directives used when `RUST_LOG` is unset
    #[builder(default = "info,accessd=debug".to_string())]
    pub default_filter: String,
    /// Emit JSON lines instead of human-readable output
    #[builder(default = false)]
    pub json: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Initialize the global tracing subscriber
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing_with_config(config: TracingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    let initialized = if config.json {
        registry.with(tracing_subscriber::fmt::layer().json().with_target(false)).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()
    };

    if initialized.is_err() {
        tracing::debug!("Tracing already initialized, skipping");
        return Ok(());
    }

    tracing::info!(service = %config.service_name, json = config.json, "Tracing initialized");

    Ok(())
}

/// Initialize tracing with default configuration
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(TracingConfig::default())
}

/// Initialize Prometheus metrics exporter and store the handle for rendering
pub fn init_metrics() -> Result<()> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    // Store handle globally for rendering metrics later
    let _ = PROMETHEUS_HANDLE.set(handle);

    metrics::init_metrics_descriptions();

    tracing::info!("Metrics exporter initialized");

    Ok(())
}

/// Render current metrics in Prometheus text format
///
/// Returns None if metrics haven't been initialized yet
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

/// Initialize full observability stack
pub fn init() -> Result<()> {
    init_tracing()?;
    init_metrics()?;

    Ok(())
}
