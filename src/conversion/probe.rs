//! Health-check probes -> management ports
//!
//! The kubelet cannot present mesh credentials, so ports targeted by
//! liveness and readiness probes are reported as management ports and
//! exempted from mutual TLS.

use k8s_openapi::api::core::v1::{Container, PodSpec, Probe};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::metrics;
use crate::model::{ManagementPort, PortList, Protocol};
use crate::{Error, Result};

/// Derive deduplicated management ports from the probes of every container
///
/// Ports are keyed by number and keep the order they were first seen in.
/// When an HTTP and a TCP probe target the same port, the port is
/// reported as HTTP.
pub fn convert_probes_to_ports(pod: &PodSpec) -> Result<PortList> {
    collect(pod).inspect_err(|e| metrics::record_conversion_error(e))
}

fn collect(pod: &PodSpec) -> Result<PortList> {
    let mut ports = PortList::new();

    for container in &pod.containers {
        let probes = [&container.liveness_probe, &container.readiness_probe];
        for probe in probes.into_iter().flatten() {
            let Some(port) = convert_probe_port(container, probe)? else {
                continue;
            };
            match ports.get_by_port_mut(port.port) {
                Some(existing) => {
                    if port.protocol == Protocol::Http {
                        existing.protocol = Protocol::Http;
                    }
                }
                None => ports.push(port),
            }
        }
    }

    Ok(ports)
}

/// Resolve the port a single probe targets
///
/// Returns `None` for probe kinds that do not target a port (exec, gRPC).
fn convert_probe_port(container: &Container, probe: &Probe) -> Result<Option<ManagementPort>> {
    let (target, protocol) = if let Some(http) = &probe.http_get {
        (&http.port, Protocol::Http)
    } else if let Some(tcp) = &probe.tcp_socket {
        (&tcp.port, Protocol::Tcp)
    } else {
        return Ok(None);
    };

    let number = match target {
        IntOrString::Int(port) => *port,
        IntOrString::String(name) => resolve_named_port(container, name)?,
    };
    let port = u16::try_from(number)
        .ok()
        .filter(|n| *n != 0)
        .ok_or_else(|| {
            Error::conversion_for_field(
                container.name.clone(),
                "probe.port",
                format!("port {number} out of range"),
            )
        })?;

    Ok(Some(ManagementPort {
        name: format!("mgmt-{port}"),
        port,
        protocol,
    }))
}

fn resolve_named_port(container: &Container, name: &str) -> Result<i32> {
    container
        .ports
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|p| p.name.as_deref() == Some(name))
        .map(|p| p.container_port)
        .ok_or_else(|| Error::unresolved_probe_port(container.name.clone(), name))
}
