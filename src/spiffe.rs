//! SPIFFE identity construction
//!
//! Identities are opaque strings everywhere except here. The trust domain is
//! passed explicitly rather than read from process-wide state.

use std::fmt;

/// URI scheme of every SPIFFE identity
pub const URI_PREFIX: &str = "spiffe://";

/// Administrative namespace identities are issued under
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrustDomain(String);

impl TrustDomain {
    /// Create a trust domain from its name (e.g. `cluster.local`)
    pub fn new(domain: impl Into<String>) -> Self {
        Self(domain.into())
    }

    /// The trust domain name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity of a Kubernetes service account
    ///
    /// Format: `spiffe://{trust_domain}/ns/{namespace}/sa/{service_account}`
    pub fn workload_identity(&self, namespace: &str, service_account: &str) -> String {
        workload_uri(&self.0, namespace, service_account)
    }

    /// Identity built from an explicit path override
    ///
    /// Format: `spiffe://{trust_domain}/{path}`
    pub fn custom_identity(&self, path: &str) -> String {
        format!("{}{}/{}", URI_PREFIX, self.0, path)
    }
}

impl Default for TrustDomain {
    fn default() -> Self {
        Self::new("cluster.local")
    }
}

impl fmt::Display for TrustDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build `spiffe://{domain}/ns/{namespace}/sa/{service_account}`
pub fn workload_uri(domain: &str, namespace: &str, service_account: &str) -> String {
    format!(
        "{}{}/ns/{}/sa/{}",
        URI_PREFIX, domain, namespace, service_account
    )
}
