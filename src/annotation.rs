//! Identity annotations on Services and Pods
//!
//! Services carry two comma-separated service account lists: plain
//! Kubernetes service accounts, and canonical identities used verbatim.
//! Pods may carry an identity override. Parsing is permissive: malformed
//! entries are dropped and reported as diagnostics, never as errors.

use std::collections::BTreeMap;

/// Annotation holding plain Kubernetes service accounts (comma-separated)
pub const KUBERNETES_SERVICE_ACCOUNTS: &str = "alpha.istio.io/kubernetes-serviceaccounts";

/// Annotation holding canonical service accounts (comma-separated)
pub const CANONICAL_SERVICE_ACCOUNTS: &str = "alpha.istio.io/canonical-serviceaccounts";

/// Pod annotation overriding the workload's identity path
pub const IDENTITY: &str = "alpha.istio.io/identity";

/// A problem found while parsing an annotation value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationDiagnostic {
    /// Annotation key the problem was found in
    pub key: &'static str,
    /// Zero-based position of the offending entry
    pub index: usize,
    /// What was wrong with it
    pub message: String,
}

/// Service account lists extracted from a Service's annotations
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceAccountAnnotations {
    /// Entries of [`KUBERNETES_SERVICE_ACCOUNTS`], in annotation order
    pub kubernetes: Vec<String>,
    /// Entries of [`CANONICAL_SERVICE_ACCOUNTS`], in annotation order
    pub canonical: Vec<String>,
    /// Dropped entries
    pub diagnostics: Vec<AnnotationDiagnostic>,
}

impl ServiceAccountAnnotations {
    /// Extract both service account lists from an annotation map
    pub fn from_annotations(annotations: Option<&BTreeMap<String, String>>) -> Self {
        let mut result = Self::default();
        let Some(annotations) = annotations else {
            return result;
        };

        if let Some(value) = annotations.get(KUBERNETES_SERVICE_ACCOUNTS) {
            result.kubernetes =
                split_list(KUBERNETES_SERVICE_ACCOUNTS, value, &mut result.diagnostics);
        }
        if let Some(value) = annotations.get(CANONICAL_SERVICE_ACCOUNTS) {
            result.canonical =
                split_list(CANONICAL_SERVICE_ACCOUNTS, value, &mut result.diagnostics);
        }
        result
    }

    /// Every raw identity from both annotations: plain accounts, then canonical
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.kubernetes
            .iter()
            .chain(self.canonical.iter())
            .map(String::as_str)
    }

    /// Whether neither annotation produced any entry
    pub fn is_empty(&self) -> bool {
        self.kubernetes.is_empty() && self.canonical.is_empty()
    }
}

/// Read the identity override annotation, ignoring blank values
pub fn identity_override(annotations: Option<&BTreeMap<String, String>>) -> Option<&str> {
    annotations?
        .get(IDENTITY)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn split_list(
    key: &'static str,
    value: &str,
    diagnostics: &mut Vec<AnnotationDiagnostic>,
) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for (index, raw) in value.split(',').enumerate() {
        let entry = raw.trim();
        if entry.is_empty() {
            diagnostics.push(AnnotationDiagnostic {
                key,
                index,
                message: "empty entry".to_string(),
            });
            continue;
        }
        if entry.chars().any(char::is_whitespace) {
            diagnostics.push(AnnotationDiagnostic {
                key,
                index,
                message: format!("entry {entry:?} contains whitespace"),
            });
            continue;
        }
        entries.push(entry.to_string());
    }
    entries
}
