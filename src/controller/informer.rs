//! Service watch driver
//!
//! Turns kube watcher streams into added/updated/deleted callbacks. The
//! watcher only reports the new state of an object, so the informer keeps
//! the last state it saw per object to supply the `old` side of an update.
//! When a watch restarts, the relist is diffed against that cache and
//! objects that disappeared in the meantime are reported as deleted.
//!
//! Events from every watched namespace are merged into one stream and
//! handled by a single task, so callbacks never run concurrently.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client};
use tracing::{debug, info, warn};

use super::ServiceEventHandler;
use crate::{Error, Result};

/// Namespace a watch stream covers; `None` for a cluster-wide watch
pub type WatchScope = Option<String>;

type ScopedEvent = (WatchScope, std::result::Result<Event<Service>, watcher::Error>);

/// Translates watch events into [`ServiceEventHandler`] callbacks
pub struct ServiceInformer {
    handler: Arc<dyn ServiceEventHandler>,
    known: HashMap<ObjectRef<Service>, Service>,
    relisting: HashMap<WatchScope, HashSet<ObjectRef<Service>>>,
}

impl ServiceInformer {
    /// Create an informer delivering to `handler`
    pub fn new(handler: Arc<dyn ServiceEventHandler>) -> Self {
        Self {
            handler,
            known: HashMap::new(),
            relisting: HashMap::new(),
        }
    }

    /// Number of Services currently known
    pub fn known_len(&self) -> usize {
        self.known.len()
    }

    /// Apply one watch event from the stream covering `scope`
    pub fn handle_event(&mut self, scope: &WatchScope, event: Event<Service>) {
        match event {
            Event::Init => {
                debug!(namespace = ?scope, "service relist started");
                self.relisting.insert(scope.clone(), HashSet::new());
            }
            Event::InitApply(svc) => {
                if let Some(seen) = self.relisting.get_mut(scope) {
                    seen.insert(ObjectRef::from_obj(&svc));
                }
                self.apply(svc);
            }
            Event::InitDone => {
                let seen = self.relisting.remove(scope).unwrap_or_default();
                let removed = self.sweep(scope, &seen);
                info!(
                    namespace = ?scope,
                    services = seen.len(),
                    removed,
                    "service relist complete"
                );
            }
            Event::Apply(svc) => self.apply(svc),
            Event::Delete(svc) => {
                self.known.remove(&ObjectRef::from_obj(&svc));
                self.handler.deleted(&svc);
            }
        }
    }

    fn apply(&mut self, svc: Service) {
        let key = ObjectRef::from_obj(&svc);
        match self.known.insert(key, svc.clone()) {
            Some(old) if is_same_version(&old, &svc) => {
                debug!(service = ?svc.metadata.name, "service unchanged, skipping");
            }
            Some(old) => self.handler.updated(&old, &svc),
            None => self.handler.added(&svc),
        }
    }

    /// Report known objects in `scope` that were absent from the relist
    fn sweep(&mut self, scope: &WatchScope, seen: &HashSet<ObjectRef<Service>>) -> usize {
        let gone: Vec<ObjectRef<Service>> = self
            .known
            .keys()
            .filter(|key| in_scope(key, scope) && !seen.contains(*key))
            .cloned()
            .collect();

        for key in &gone {
            if let Some(svc) = self.known.remove(key) {
                self.handler.deleted(&svc);
            }
        }
        gone.len()
    }

    /// Watch Services in `namespaces` (all namespaces when empty) until the
    /// streams end
    pub async fn run(
        mut self,
        client: Client,
        namespaces: &[String],
        config: watcher::Config,
    ) -> Result<()> {
        let streams: Vec<BoxStream<'static, ScopedEvent>> = if namespaces.is_empty() {
            vec![scoped_watch(Api::all(client), None, config)]
        } else {
            namespaces
                .iter()
                .map(|ns| {
                    scoped_watch(
                        Api::namespaced(client.clone(), ns),
                        Some(ns.clone()),
                        config.clone(),
                    )
                })
                .collect()
        };

        info!(namespaces = ?namespaces, "starting service watch");
        let mut events = stream::select_all(streams);

        while let Some((scope, event)) = events.next().await {
            match event {
                Ok(event) => self.handle_event(&scope, event),
                Err(e) => warn!(error = %e, namespace = ?scope, "service watch error, backing off"),
            }
        }

        Err(Error::internal_with_context(
            "informer",
            "service watch streams ended",
        ))
    }
}

fn scoped_watch(
    api: Api<Service>,
    scope: WatchScope,
    config: watcher::Config,
) -> BoxStream<'static, ScopedEvent> {
    watcher::watcher(api, config)
        .default_backoff()
        .map(move |event| (scope.clone(), event))
        .boxed()
}

fn in_scope(key: &ObjectRef<Service>, scope: &WatchScope) -> bool {
    match scope {
        None => true,
        Some(ns) => key.namespace.as_deref() == Some(ns.as_str()),
    }
}

fn is_same_version(old: &Service, new: &Service) -> bool {
    old.metadata.resource_version.is_some()
        && old.metadata.resource_version == new.metadata.resource_version
}
