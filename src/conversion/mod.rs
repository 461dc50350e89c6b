//! Conversion of Kubernetes objects into the internal service model
//!
//! - [`protocol`] - L7 protocol inference from port names
//! - [`service`] - Service -> [`Service`](crate::model::Service)
//! - [`probe`] - pod probes -> management ports
//! - [`identity`] - expected secure-naming identity of a pod

pub mod identity;
pub mod probe;
pub mod protocol;
pub mod service;

pub use identity::secure_naming_san;
pub use probe::convert_probes_to_ports;
pub use protocol::convert_protocol;
pub use service::{convert_service, service_hostname};
