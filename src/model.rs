//! Internal service model
//!
//! The types the converters produce and the config-distribution side
//! consumes. A [`Service`] is built fresh on every conversion and never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Protocol
// =============================================================================

/// L7 protocol spoken on a service port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    /// Opaque TCP
    #[serde(rename = "TCP")]
    Tcp,
    /// Opaque UDP
    #[serde(rename = "UDP")]
    Udp,
    /// HTTP/1.1
    #[serde(rename = "HTTP")]
    Http,
    /// HTTP over TLS
    #[serde(rename = "HTTPS")]
    Https,
    /// HTTP/2
    #[serde(rename = "HTTP2")]
    Http2,
    /// gRPC
    #[serde(rename = "GRPC")]
    Grpc,
    /// gRPC-Web
    #[serde(rename = "GRPC-Web")]
    GrpcWeb,
    /// MongoDB wire protocol
    #[serde(rename = "Mongo")]
    Mongo,
    /// Redis wire protocol
    #[serde(rename = "Redis")]
    Redis,
    /// MySQL wire protocol
    #[serde(rename = "MySQL")]
    MySql,
}

impl Protocol {
    /// Canonical name of the protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Http => "HTTP",
            Self::Https => "HTTPS",
            Self::Http2 => "HTTP2",
            Self::Grpc => "GRPC",
            Self::GrpcWeb => "GRPC-Web",
            Self::Mongo => "Mongo",
            Self::Redis => "Redis",
            Self::MySql => "MySQL",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level protocol declared on a Kubernetes port
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TransportProtocol {
    /// TCP (the Kubernetes default when unset)
    #[default]
    Tcp,
    /// UDP
    Udp,
    /// SCTP, proxied as opaque TCP
    Sctp,
}

impl TransportProtocol {
    /// Parse the `protocol` field of a Kubernetes port
    ///
    /// Kubernetes defaults an absent protocol to TCP. Unknown values are
    /// treated the same way.
    pub fn from_k8s(protocol: Option<&str>) -> Self {
        match protocol {
            Some(p) if p.eq_ignore_ascii_case("UDP") => Self::Udp,
            Some(p) if p.eq_ignore_ascii_case("SCTP") => Self::Sctp,
            _ => Self::Tcp,
        }
    }
}

// =============================================================================
// Ports
// =============================================================================

/// A named port on a service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Declared port name (may be empty for single-port services)
    pub name: String,
    /// Port number
    pub port: u16,
    /// Inferred L7 protocol
    pub protocol: Protocol,
}

/// A health-check port exempted from mesh authentication
///
/// Shares the [`Port`] shape; the name is always `mgmt-<port>`.
pub type ManagementPort = Port;

/// Ordered list of ports
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortList(Vec<Port>);

impl PortList {
    /// Create an empty port list
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Find a port by name
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.0.iter().find(|p| p.name == name)
    }

    /// Find a port by number
    pub fn get_by_port(&self, port: u16) -> Option<&Port> {
        self.0.iter().find(|p| p.port == port)
    }

    /// Append a port
    pub fn push(&mut self, port: Port) {
        self.0.push(port);
    }

    /// Consume the list, returning the underlying ports
    pub fn into_inner(self) -> Vec<Port> {
        self.0
    }

    pub(crate) fn get_by_port_mut(&mut self, port: u16) -> Option<&mut Port> {
        self.0.iter_mut().find(|p| p.port == port)
    }
}

impl Deref for PortList {
    type Target = [Port];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Port>> for PortList {
    fn from(ports: Vec<Port>) -> Self {
        Self(ports)
    }
}

impl FromIterator<Port> for PortList {
    fn from_iter<I: IntoIterator<Item = Port>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for PortList {
    type Item = Port;
    type IntoIter = std::vec::IntoIter<Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a PortList {
    type Item = &'a Port;
    type IntoIter = std::slice::Iter<'a, Port>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// Service
// =============================================================================

/// How proxies resolve the endpoints of a service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Proxy load-balances across the endpoint set it was given
    ClientSideLb,
    /// Proxy resolves the hostname through DNS (ExternalName services)
    DnsLb,
    /// Proxy forwards to the original destination (headless services)
    Passthrough,
}

/// Attributes of a service that are not part of its identity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAttributes {
    /// Service name as declared in the cluster
    pub name: String,
    /// Service namespace
    pub namespace: String,
    /// Load-balancer ingress addresses, keyed by cluster id
    pub cluster_external_addresses: BTreeMap<String, Vec<String>>,
}

/// A service in the mesh's internal model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Fully-qualified hostname, unique within the domain suffix
    pub hostname: String,
    /// Cluster-assigned virtual IP; empty for headless and external services
    pub address: String,
    /// When the cluster object was created
    pub creation_time: Option<DateTime<Utc>>,
    /// Ports in declaration order
    pub ports: PortList,
    /// Identities allowed to serve this service
    pub service_accounts: Vec<String>,
    /// Whether the service lives outside the mesh
    pub mesh_external: bool,
    /// Endpoint resolution mode
    pub resolution: Resolution,
    /// Non-identifying attributes
    pub attributes: ServiceAttributes,
}

impl Service {
    /// Whether the service is external to the mesh
    pub fn external(&self) -> bool {
        self.mesh_external
    }
}
