//! Identity registry
//!
//! Maps the identity a peer presents to the identity it is allowed to act
//! as. Plain service accounts map to themselves. The registry is written by
//! the service controller and read by secure-naming checks on every inbound
//! mTLS handshake, so reads hold the lock only for a map lookup.
//!
//! A missing mapping is a denial: during an update's delete-then-insert
//! window a shared identity can briefly fail [`IdentityRegistry::check`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::metrics::{self, LookupResult};
use crate::{Error, Result};

/// Registry shared between the controller and verification callers
pub type SharedIdentityRegistry = Arc<IdentityRegistry>;

/// Thread-safe identity -> identity mapping
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    mappings: RwLock<HashMap<String, String>>,
}

impl IdentityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry ready to be shared
    pub fn shared() -> SharedIdentityRegistry {
        Arc::new(Self::new())
    }

    /// Look up the identity `from` may act as
    pub fn lookup(&self, from: &str) -> Option<String> {
        let found = self.mappings.read().get(from).cloned();
        metrics::record_lookup(if found.is_some() {
            LookupResult::Hit
        } else {
            LookupResult::Miss
        });
        found
    }

    /// Verify that identity `from` may act as identity `to`
    pub fn check(&self, from: &str, to: &str) -> Result<()> {
        match self.lookup(from) {
            Some(mapped) if mapped == to => Ok(()),
            _ => Err(Error::secure_naming(from, to)),
        }
    }

    /// Insert or overwrite the mapping `from -> to`
    pub fn add_mapping(&self, from: &str, to: &str) {
        let size = {
            let mut mappings = self.mappings.write();
            mappings.insert(from.to_string(), to.to_string());
            mappings.len()
        };
        debug!(%from, %to, "added identity mapping");
        metrics::record_registry_size(size);
    }

    /// Remove the mapping `from -> to`
    ///
    /// Nothing is removed if `from` is unmapped or maps to something other
    /// than `to`.
    pub fn delete_mapping(&self, from: &str, to: &str) {
        let size = {
            let mut mappings = self.mappings.write();
            match mappings.get(from) {
                None => {
                    warn!(%from, %to, "identity mapping does not exist");
                    return;
                }
                Some(current) if current != to => {
                    warn!(%from, %to, expected = %current, "identity mapping does not match");
                    return;
                }
                Some(_) => {
                    mappings.remove(from);
                }
            }
            mappings.len()
        };
        debug!(%from, %to, "deleted identity mapping");
        metrics::record_registry_size(size);
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    /// Whether the registry holds no mappings
    pub fn is_empty(&self) -> bool {
        self.mappings.read().is_empty()
    }

    /// Ordered copy of every mapping
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.mappings
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
