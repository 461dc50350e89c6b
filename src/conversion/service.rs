//! Kubernetes Service -> internal service model

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{LoadBalancerIngress, Service as K8sService, ServicePort};
use tracing::warn;

use crate::annotation::ServiceAccountAnnotations;
use crate::conversion::protocol::convert_protocol;
use crate::metrics;
use crate::model::{Port, PortList, Resolution, Service, ServiceAttributes, TransportProtocol};
use crate::spiffe;
use crate::{Error, Result};

const SERVICE_TYPE_EXTERNAL_NAME: &str = "ExternalName";
const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";
const CLUSTER_IP_NONE: &str = "None";

/// Fully-qualified hostname of a service
///
/// Format: `{name}.{namespace}.svc.{domain_suffix}`
pub fn service_hostname(name: &str, namespace: &str, domain_suffix: &str) -> String {
    format!("{}.{}.svc.{}", name, namespace, domain_suffix)
}

/// Convert a Kubernetes Service into the internal service model
///
/// Fails only when the object is structurally invalid: no name, no
/// namespace, or a port number outside `1..=65535`.
pub fn convert_service(svc: &K8sService, domain_suffix: &str, cluster_id: &str) -> Result<Service> {
    convert(svc, domain_suffix, cluster_id).inspect_err(|e| metrics::record_conversion_error(e))
}

fn convert(svc: &K8sService, domain_suffix: &str, cluster_id: &str) -> Result<Service> {
    let name = svc.metadata.name.as_deref().unwrap_or_default();
    let namespace = svc.metadata.namespace.as_deref().unwrap_or_default();
    let resource = format!("{namespace}/{name}");
    if name.is_empty() {
        return Err(Error::conversion_for_field(resource, "metadata.name", "missing name"));
    }
    if namespace.is_empty() {
        return Err(Error::conversion_for_field(
            resource,
            "metadata.namespace",
            "missing namespace",
        ));
    }

    let spec = svc.spec.as_ref();
    let service_type = spec.and_then(|s| s.type_.as_deref()).unwrap_or_default();

    let mesh_external = service_type == SERVICE_TYPE_EXTERNAL_NAME;
    let cluster_ip = spec.and_then(|s| s.cluster_ip.as_deref()).unwrap_or_default();
    let (address, resolution) = if mesh_external {
        (String::new(), Resolution::DnsLb)
    } else if cluster_ip == CLUSTER_IP_NONE {
        (String::new(), Resolution::Passthrough)
    } else {
        (cluster_ip.to_string(), Resolution::ClientSideLb)
    };

    let ports = spec
        .and_then(|s| s.ports.as_deref())
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, port)| convert_port(&resource, i, port))
        .collect::<Result<PortList>>()?;

    let mut cluster_external_addresses = BTreeMap::new();
    if service_type == SERVICE_TYPE_LOAD_BALANCER {
        let addresses = load_balancer_addresses(svc);
        if !addresses.is_empty() {
            cluster_external_addresses.insert(cluster_id.to_string(), addresses);
        }
    }

    Ok(Service {
        hostname: service_hostname(name, namespace, domain_suffix),
        address,
        creation_time: svc.metadata.creation_timestamp.as_ref().map(|t| t.0),
        ports,
        service_accounts: service_accounts(svc, &resource, namespace, domain_suffix),
        mesh_external,
        resolution,
        attributes: ServiceAttributes {
            name: name.to_string(),
            namespace: namespace.to_string(),
            cluster_external_addresses,
        },
    })
}

fn convert_port(resource: &str, index: usize, port: &ServicePort) -> Result<Port> {
    let number = u16::try_from(port.port).ok().filter(|n| *n != 0).ok_or_else(|| {
        Error::conversion_for_field(
            resource,
            format!("spec.ports[{index}].port"),
            format!("port {} out of range", port.port),
        )
    })?;
    let name = port.name.clone().unwrap_or_default();
    let transport = TransportProtocol::from_k8s(port.protocol.as_deref());

    Ok(Port {
        protocol: convert_protocol(&name, transport),
        name,
        port: number,
    })
}

/// Canonical accounts verbatim, then plain accounts as SPIFFE URIs
fn service_accounts(
    svc: &K8sService,
    resource: &str,
    namespace: &str,
    domain_suffix: &str,
) -> Vec<String> {
    let parsed = ServiceAccountAnnotations::from_annotations(svc.metadata.annotations.as_ref());
    for diag in &parsed.diagnostics {
        warn!(
            service = %resource,
            annotation = diag.key,
            index = diag.index,
            problem = %diag.message,
            "ignoring malformed service account entry"
        );
    }

    let transformed = parsed
        .kubernetes
        .iter()
        .map(|sa| spiffe::workload_uri(domain_suffix, namespace, sa));
    parsed.canonical.iter().cloned().chain(transformed).collect()
}

fn load_balancer_addresses(svc: &K8sService) -> Vec<String> {
    svc.status
        .as_ref()
        .and_then(|s| s.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_deref())
        .unwrap_or_default()
        .iter()
        .filter_map(ingress_address)
        .collect()
}

fn ingress_address(ingress: &LoadBalancerIngress) -> Option<String> {
    ingress
        .ip
        .as_ref()
        .filter(|ip| !ip.is_empty())
        .or_else(|| ingress.hostname.as_ref().filter(|h| !h.is_empty()))
        .cloned()
}
