//! Telemetry initialization
//!
//! JSON logs always; OTLP traces and metrics only when an endpoint is set.
//! Pod and node names come from the downward API environment.

use std::fmt;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info,lattice_identity=debug,kube=info,tower=warn,hyper=warn";

/// Downward API variables copied into the resource, with their attribute keys
const DOWNWARD_API_ATTRIBUTES: &[(&str, &str)] = &[
    ("POD_NAME", "k8s.pod.name"),
    ("POD_NAMESPACE", "k8s.namespace.name"),
    ("NODE_NAME", "k8s.node.name"),
];

/// OTLP signal an exporter carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Spans
    Traces,
    /// Instruments from [`crate::metrics`]
    Metrics,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
        })
    }
}

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// An OTLP exporter could not be built
    #[error("failed to build OTLP {signal} exporter for {endpoint}: {message}")]
    Exporter {
        /// Signal the exporter was for
        signal: Signal,
        /// Collector endpoint
        endpoint: String,
        /// Underlying failure
        message: String,
    },

    /// A global subscriber was already installed
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}

impl TelemetryError {
    fn exporter(signal: Signal, endpoint: &str, err: impl fmt::Display) -> Self {
        Self::Exporter {
            signal,
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and metrics
    pub service_name: String,

    /// OTLP endpoint (e.g., "http://otel-collector:4317"); logs only when None
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "lattice-identity".to_string(),
            otlp_endpoint: None,
        }
    }
}

/// Initialize logging and optional OTLP export
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let provider = install_otlp(endpoint, resource(&config.service_name))?;
            let tracer = provider.tracer(config.service_name.clone());
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_target(true),
        )
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))
}

/// Resource attributes shared by every exported signal
fn resource(service_name: &str) -> Resource {
    let downward = DOWNWARD_API_ATTRIBUTES
        .iter()
        .filter_map(|(env, key)| std::env::var(env).ok().map(|v| KeyValue::new(*key, v)));

    Resource::new(
        [
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ]
        .into_iter()
        .chain(downward),
    )
}

/// Install global trace and meter providers exporting to `endpoint`
///
/// Returns the tracer provider so the caller can bridge `tracing` spans.
fn install_otlp(endpoint: &str, resource: Resource) -> Result<TracerProvider, TelemetryError> {
    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::exporter(Signal::Traces, endpoint, e))?;
    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::exporter(Signal::Metrics, endpoint, e))?;

    global::set_meter_provider(
        SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(metric_exporter, runtime::Tokio).build())
            .with_resource(resource.clone())
            .build(),
    );

    let tracer_provider = TracerProvider::builder()
        .with_batch_exporter(span_exporter, runtime::Tokio)
        .with_resource(resource)
        .build();
    global::set_tracer_provider(tracer_provider.clone());

    Ok(tracer_provider)
}
