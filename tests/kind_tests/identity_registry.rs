//! Integration tests for the identity registry controller
//!
//! These tests run the Service informer against a live API server and check
//! that the registry follows the service account annotations on Services.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::watcher;
use kube::Client;

use lattice_identity::annotation::{CANONICAL_SERVICE_ACCOUNTS, KUBERNETES_SERVICE_ACCOUNTS};
use lattice_identity::controller::informer::ServiceInformer;
use lattice_identity::controller::ServiceController;
use lattice_identity::conversion::convert_service;
use lattice_identity::model::Protocol;
use lattice_identity::{IdentityRegistry, SharedIdentityRegistry};

use super::helpers::{cleanup_namespace, ensure_test_cluster, fresh_namespace, wait_for};

const SYNC_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Test Fixtures
// =============================================================================

fn annotated_service(namespace: &str, name: &str, accounts: &str, canonical: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([
                (KUBERNETES_SERVICE_ACCOUNTS.to_string(), accounts.to_string()),
                (CANONICAL_SERVICE_ACCOUNTS.to_string(), canonical.to_string()),
            ])),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some("http-web".to_string()),
                port: 8080,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Start a controller watching `namespace` in the background
fn spawn_controller(client: Client, namespace: &str) -> SharedIdentityRegistry {
    let registry = IdentityRegistry::shared();
    let controller = Arc::new(ServiceController::new(
        vec![namespace.to_string()],
        registry.clone(),
    ));
    let informer = ServiceInformer::new(controller.clone());

    tokio::spawn(async move {
        let _ = informer
            .run(client, controller.namespaces(), watcher::Config::default())
            .await;
    });

    registry
}

// =============================================================================
// Registry Stories
// =============================================================================

/// Story: An annotated Service grants its service accounts secure-naming rights
///
/// A mesh operator creates a Service naming the accounts that back it. Once
/// the controller sees it, every named account can present for itself; when
/// the Service is deleted the grants are withdrawn.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_annotated_service_populates_registry() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "identity-create";
    fresh_namespace(&client, ns)
        .await
        .expect("failed to create namespace");

    let registry = spawn_controller(client.clone(), ns);
    let api: Api<Service> = Api::namespaced(client.clone(), ns);

    // Act: create a Service with both annotations
    let created = api
        .create(
            &PostParams::default(),
            &annotated_service(ns, "reviews", "reviews-sa", "reviews@company.com"),
        )
        .await
        .expect("failed to create service");

    // Assert: both identities appear, each mapped to itself
    assert!(
        wait_for(SYNC_TIMEOUT, || registry.len() == 2).await,
        "registry never picked up the service: {:?}",
        registry.snapshot()
    );
    assert!(registry.check("reviews-sa", "reviews-sa").is_ok());
    assert!(registry
        .check("reviews@company.com", "reviews@company.com")
        .is_ok());

    // Assert: the stored object converts into the model the mesh consumes
    let model = convert_service(&created, "cluster.local", "Kubernetes")
        .expect("service should convert");
    assert_eq!(model.hostname, format!("reviews.{ns}.svc.cluster.local"));
    assert_eq!(model.ports.get("http-web").map(|p| p.protocol), Some(Protocol::Http));
    assert_eq!(
        model.service_accounts,
        vec![
            "reviews@company.com".to_string(),
            format!("spiffe://cluster.local/ns/{ns}/sa/reviews-sa"),
        ]
    );

    // Act: delete the Service
    api.delete("reviews", &DeleteParams::default())
        .await
        .expect("failed to delete service");

    // Assert: the grants are withdrawn
    assert!(
        wait_for(SYNC_TIMEOUT, || registry.is_empty()).await,
        "registry kept entries after delete: {:?}",
        registry.snapshot()
    );

    cleanup_namespace(&client, ns).await;
}

/// Story: Re-annotating a Service moves the grant to the new account
///
/// When a Service's backing account is renamed, the old account must stop
/// passing secure-naming checks and the new one must start.
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_reannotated_service_replaces_identities() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ns = "identity-update";
    fresh_namespace(&client, ns)
        .await
        .expect("failed to create namespace");

    let registry = spawn_controller(client.clone(), ns);
    let api: Api<Service> = Api::namespaced(client.clone(), ns);

    api.create(
        &PostParams::default(),
        &annotated_service(ns, "ratings", "ratings-v1", ""),
    )
    .await
    .expect("failed to create service");
    assert!(wait_for(SYNC_TIMEOUT, || registry.lookup("ratings-v1").is_some()).await);

    // Act: point the Service at a new account
    let mut annotations = serde_json::Map::new();
    annotations.insert(KUBERNETES_SERVICE_ACCOUNTS.to_string(), "ratings-v2".into());
    let patch = serde_json::json!({ "metadata": { "annotations": annotations } });
    api.patch("ratings", &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("failed to patch service");

    // Assert: the old identity is gone and the new one is granted
    assert!(
        wait_for(SYNC_TIMEOUT, || {
            registry.lookup("ratings-v1").is_none() && registry.lookup("ratings-v2").is_some()
        })
        .await,
        "registry did not follow the annotation change: {:?}",
        registry.snapshot()
    );
    assert!(registry.check("ratings-v1", "ratings-v1").is_err());

    cleanup_namespace(&client, ns).await;
}
