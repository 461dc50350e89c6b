//! Lattice Identity - service model conversion and secure-naming registry
//!
//! Translates Kubernetes Services and Pods into the mesh's platform-neutral
//! service model, and maintains the table of workload identities that may
//! present for one another.
//!
//! # Modules
//!
//! - [`model`] - Platform-neutral service model (Service, Port, Protocol)
//! - [`conversion`] - Kubernetes to model conversion (services, protocols, probes, identities)
//! - [`annotation`] - Service account annotation keys and parsing
//! - [`spiffe`] - SPIFFE identity URIs and trust domains
//! - [`registry`] - Concurrent identity mapping table
//! - [`controller`] - Service watch callbacks and the controller feeding the registry
//! - [`config`] - Command line and environment configuration
//! - [`telemetry`] - Logging, tracing and metric export setup
//! - [`metrics`] - OpenTelemetry instruments
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod annotation;
pub mod config;
pub mod controller;
pub mod conversion;
pub mod error;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod spiffe;
pub mod telemetry;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod testing;

pub use error::Error;
pub use registry::{IdentityRegistry, SharedIdentityRegistry};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
