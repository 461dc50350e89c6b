//! Process configuration
//!
//! Every option can be given as a flag or through the environment, so the
//! controller runs unchanged from a Deployment manifest.

use clap::Args;
use kube::runtime::watcher;

use crate::telemetry::TelemetryConfig;
use crate::{Error, Result};

/// Watch timeout (seconds) - must be less than the client read timeout (30s)
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 25;

/// Configuration for the identity controller
#[derive(Args, Debug, Clone)]
pub struct ControllerConfig {
    /// Namespaces to watch; all namespaces when omitted
    #[arg(long = "namespace", env = "WATCH_NAMESPACES", value_delimiter = ',')]
    pub namespaces: Vec<String>,

    /// Server-side watch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_WATCH_TIMEOUT_SECS)]
    pub watch_timeout_secs: u32,

    /// OTLP endpoint for trace and metric export
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespaces: Vec::new(),
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
            otlp_endpoint: None,
        }
    }
}

impl ControllerConfig {
    /// Reject configurations the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.namespaces.iter().any(|ns| ns.trim().is_empty()) {
            return Err(Error::internal_with_context(
                "config",
                "namespace list contains a blank entry",
            ));
        }
        if self.watch_timeout_secs == 0 {
            return Err(Error::internal_with_context(
                "config",
                "watch timeout must be positive",
            ));
        }
        Ok(())
    }

    /// Watcher settings for the Service watch
    pub fn watcher_config(&self) -> watcher::Config {
        watcher::Config::default().timeout(self.watch_timeout_secs)
    }

    /// Telemetry settings derived from this configuration
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            otlp_endpoint: self.otlp_endpoint.clone(),
            ..Default::default()
        }
    }
}
