//! Test helpers for integration tests
//!
//! Provides utilities for managing the kind cluster and test namespaces.

use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio::time::{sleep, Instant};

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "lattice-identity-test";

/// Global lock to ensure cluster is created only once
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Run `kind` with the given arguments, returning stdout on success
fn kind(args: &[&str]) -> Result<String, String> {
    let output = Command::new("kind")
        .args(args)
        .output()
        .map_err(|e| format!("failed to run kind {}: {e}", args.join(" ")))?;

    if !output.status.success() {
        return Err(format!(
            "kind {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Create the named kind cluster unless it is already running
fn ensure_kind_cluster(name: &str) -> Result<(), String> {
    let clusters = kind(&["get", "clusters"])?;
    if clusters.lines().any(|line| line.trim() == name) {
        println!("Reusing kind cluster '{name}'");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    kind(&["create", "cluster", "--name", name, "--wait", "60s"]).map(|_| ())
}

/// Client for the test cluster, creating the cluster on first use
///
/// Each test gets its own client; the kind context is selected explicitly so
/// the user's current kubeconfig context is left alone.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    CLUSTER_INIT
        .get_or_init(|| ensure_kind_cluster(TEST_CLUSTER_NAME))
        .clone()?;

    let options = KubeConfigOptions {
        context: Some(format!("kind-{TEST_CLUSTER_NAME}")),
        ..Default::default()
    };
    let config = Config::from_kubeconfig(&options)
        .await
        .map_err(|e| format!("failed to load kubeconfig: {e}"))?;
    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

/// Create a namespace, replacing one left behind by an earlier run
pub async fn fresh_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let api: Api<Namespace> = Api::all(client.clone());

    if api.get_opt(name).await?.is_some() {
        let _ = api.delete(name, &DeleteParams::default()).await;
        let deadline = Instant::now() + Duration::from_secs(60);
        while api.get_opt(name).await?.is_some() && Instant::now() < deadline {
            sleep(Duration::from_millis(500)).await;
        }
    }

    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.create(&PostParams::default(), &ns).await?;
    Ok(())
}

/// Delete a namespace without waiting for it to go away
pub async fn cleanup_namespace(client: &Client, name: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(name, &DeleteParams::default()).await;
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(200)).await;
    }
}
