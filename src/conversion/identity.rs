//! Expected secure-naming identity of a pod

use k8s_openapi::api::core::v1::Pod;

use crate::annotation;
use crate::spiffe::TrustDomain;

/// The identity a pod's certificate is expected to present
///
/// An [`annotation::IDENTITY`] override wins; otherwise the identity is
/// derived from the pod's namespace and service account.
pub fn secure_naming_san(pod: &Pod, trust_domain: &TrustDomain) -> String {
    if let Some(path) = annotation::identity_override(pod.metadata.annotations.as_ref()) {
        return trust_domain.custom_identity(path);
    }

    let namespace = pod.metadata.namespace.as_deref().unwrap_or_default();
    let service_account = pod
        .spec
        .as_ref()
        .and_then(|s| s.service_account_name.as_deref())
        .unwrap_or_default();
    trust_domain.workload_identity(namespace, service_account)
}
