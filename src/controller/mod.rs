//! Service controller - keeps the identity registry in step with Services
//!
//! Every watched Service contributes the raw entries of its two service
//! account annotations to the registry, each mapped to itself. Callbacks are
//! delivered one at a time by the [`informer`]; the registry's own lock
//! protects it from concurrent readers.

pub mod informer;

use std::collections::BTreeSet;

use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use crate::annotation::ServiceAccountAnnotations;
use crate::metrics::{self, RegistryEvent};
use crate::registry::SharedIdentityRegistry;

/// Receiver of Service watch callbacks
#[cfg_attr(test, automock)]
pub trait ServiceEventHandler: Send + Sync {
    /// A Service appeared
    fn added(&self, service: &Service);

    /// A known Service changed
    fn updated(&self, old: &Service, new: &Service);

    /// A Service was removed
    fn deleted(&self, service: &Service);
}

/// A single Service watch callback
#[derive(Clone, Debug)]
pub enum ServiceEvent {
    /// A Service appeared
    Added(Service),
    /// A known Service changed
    Updated {
        /// Last state seen before the change
        old: Service,
        /// State after the change
        new: Service,
    },
    /// A Service was removed
    Deleted(Service),
}

impl ServiceEvent {
    /// Deliver this event to a handler
    pub fn dispatch(&self, handler: &dyn ServiceEventHandler) {
        match self {
            Self::Added(svc) => handler.added(svc),
            Self::Updated { old, new } => handler.updated(old, new),
            Self::Deleted(svc) => handler.deleted(svc),
        }
    }
}

/// Controller mapping Service annotations into the identity registry
pub struct ServiceController {
    namespaces: Vec<String>,
    registry: SharedIdentityRegistry,
}

impl ServiceController {
    /// Create a controller for the given namespaces (empty = all namespaces)
    pub fn new(namespaces: Vec<String>, registry: SharedIdentityRegistry) -> Self {
        Self {
            namespaces,
            registry,
        }
    }

    /// Namespaces this controller watches
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// The registry this controller writes to
    pub fn registry(&self) -> &SharedIdentityRegistry {
        &self.registry
    }

    /// Look up the identity `identity` may act as
    pub fn lookup(&self, identity: &str) -> Option<String> {
        self.registry.lookup(identity)
    }

    fn add_identities(&self, service: &Service) {
        for identity in service_identities(service) {
            self.registry.add_mapping(&identity, &identity);
        }
    }

    fn remove_identities(&self, service: &Service) {
        for identity in service_identities(service) {
            self.registry.delete_mapping(&identity, &identity);
        }
    }
}

impl ServiceEventHandler for ServiceController {
    fn added(&self, service: &Service) {
        debug!(service = %service.name_any(), namespace = ?service.namespace(), "service added");
        self.add_identities(service);
        metrics::record_registry_event(RegistryEvent::Added);
    }

    fn updated(&self, old: &Service, new: &Service) {
        debug!(service = %new.name_any(), namespace = ?new.namespace(), "service updated");
        self.remove_identities(old);
        self.add_identities(new);
        metrics::record_registry_event(RegistryEvent::Updated);
    }

    fn deleted(&self, service: &Service) {
        debug!(service = %service.name_any(), namespace = ?service.namespace(), "service deleted");
        self.remove_identities(service);
        metrics::record_registry_event(RegistryEvent::Deleted);
    }
}

/// Distinct raw identities named by a Service's annotations, malformed
/// entries dropped
fn service_identities(service: &Service) -> BTreeSet<String> {
    let parsed = ServiceAccountAnnotations::from_annotations(service.metadata.annotations.as_ref());
    for diag in &parsed.diagnostics {
        warn!(
            service = %service.name_any(),
            annotation = diag.key,
            index = diag.index,
            problem = %diag.message,
            "ignoring malformed service account entry"
        );
    }
    parsed.identities().map(str::to_string).collect()
}
