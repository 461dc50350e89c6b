//! Metrics for the identity registry and service model conversion
//!
//! Provides OpenTelemetry metrics for:
//! - Registry events applied by the service controller
//! - Registry size
//! - Secure-naming lookups (hit/miss)
//! - Conversion failures

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;

use crate::Error;

/// Global meter for lattice-identity metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("lattice-identity"));

// ============================================================================
// Registry Metrics
// ============================================================================

/// Counter of service events applied to the registry
///
/// Labels:
/// - `event`: added, updated, deleted
pub static REGISTRY_EVENTS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("lattice_identity_registry_events_total")
        .with_description("Total number of service events applied to the identity registry")
        .with_unit("{events}")
        .build()
});

/// Gauge of identity mappings currently held
pub static REGISTRY_MAPPINGS: Lazy<Gauge<u64>> = Lazy::new(|| {
    METER
        .u64_gauge("lattice_identity_registry_mappings")
        .with_description("Number of identity mappings in the registry")
        .with_unit("{mappings}")
        .build()
});

/// Counter of registry lookups
///
/// Labels:
/// - `result`: hit, miss
pub static LOOKUPS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("lattice_identity_lookups_total")
        .with_description("Total number of secure-naming identity lookups")
        .with_unit("{lookups}")
        .build()
});

// ============================================================================
// Conversion Metrics
// ============================================================================

/// Counter of failed conversions
///
/// Labels:
/// - `kind`: conversion, unresolved_probe_port
pub static CONVERSION_ERRORS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("lattice_identity_conversion_errors_total")
        .with_description("Total number of failed service model conversions")
        .with_unit("{errors}")
        .build()
});

// ============================================================================
// Helper Types
// ============================================================================

/// Labels for registry events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Service added
    Added,
    /// Service updated
    Updated,
    /// Service deleted
    Deleted,
}

impl RegistryEvent {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

/// Labels for lookup outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// Identity was mapped
    Hit,
    /// Identity was unknown
    Miss,
}

impl LookupResult {
    /// Convert to label value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }
}

// ============================================================================
// Metric Recording Helpers
// ============================================================================

/// Record a service event applied to the registry
pub fn record_registry_event(event: RegistryEvent) {
    REGISTRY_EVENTS.add(1, &[KeyValue::new("event", event.as_str())]);
}

/// Record the current number of registry mappings
pub fn record_registry_size(size: usize) {
    REGISTRY_MAPPINGS.record(size as u64, &[]);
}

/// Record a registry lookup
pub fn record_lookup(result: LookupResult) {
    LOOKUPS.add(1, &[KeyValue::new("result", result.as_str())]);
}

/// Record a failed conversion
pub fn record_conversion_error(err: &Error) {
    CONVERSION_ERRORS.add(1, &[KeyValue::new("kind", err.kind())]);
}
