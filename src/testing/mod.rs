//! In-memory event fixtures
//!
//! [`Source`] stands in for the Kubernetes watch: events pushed before
//! [`Source::start`] are held back and delivered in order once started.
//! [`Accumulator`] records every callback it receives.

use std::sync::Arc;

use k8s_openapi::api::core::v1::Service;
use parking_lot::Mutex;

use crate::controller::{ServiceEvent, ServiceEventHandler};

/// Event source driven by the test
#[derive(Default)]
pub struct Source {
    started: bool,
    handlers: Vec<Arc<dyn ServiceEventHandler>>,
    pending: Vec<ServiceEvent>,
}

impl Source {
    /// Register a handler to receive events
    pub fn dispatch(&mut self, handler: Arc<dyn ServiceEventHandler>) {
        self.handlers.push(handler);
    }

    /// Begin delivering events, flushing anything queued
    pub fn start(&mut self) {
        self.started = true;
        for event in std::mem::take(&mut self.pending) {
            self.deliver(&event);
        }
    }

    /// Stop delivering events; later pushes are queued
    pub fn stop(&mut self) {
        self.started = false;
    }

    /// Whether the source is delivering events
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Emit an event, or queue it if the source is stopped
    pub fn push(&mut self, event: ServiceEvent) {
        if self.started {
            self.deliver(&event);
        } else {
            self.pending.push(event);
        }
    }

    fn deliver(&self, event: &ServiceEvent) {
        for handler in &self.handlers {
            event.dispatch(handler.as_ref());
        }
    }
}

/// Handler that records every event it receives
#[derive(Default)]
pub struct Accumulator {
    events: Mutex<Vec<ServiceEvent>>,
}

impl Accumulator {
    /// Events received so far, in delivery order
    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().clone()
    }

    /// Forget all recorded events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ServiceEventHandler for Accumulator {
    fn added(&self, service: &Service) {
        self.events.lock().push(ServiceEvent::Added(service.clone()));
    }

    fn updated(&self, old: &Service, new: &Service) {
        self.events.lock().push(ServiceEvent::Updated {
            old: old.clone(),
            new: new.clone(),
        });
    }

    fn deleted(&self, service: &Service) {
        self.events.lock().push(ServiceEvent::Deleted(service.clone()));
    }
}
