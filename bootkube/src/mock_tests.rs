use std::{fs, time::Duration};

use bootkube_core::{classify, Placement, StatusExt};
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use kube::{client::Body, Client};
use serde_json::{json, Value};

use crate::{
    apply::{tests::asset, ApplyError, AssetCreator, AssetLoader},
    bootstrap::{create_assets, ReadinessProbe},
    cluster::{KubeCluster, ManifestLoader},
    config::BootstrapConfig,
    manifest::LoadError,
    progress::Recorder,
};

#[tokio::test]
async fn creates_asset_with_post_to_its_collection() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::Created);

    let created = KubeCluster::new(client)
        .create(&asset("kube-dns", "Service", "services"))
        .await
        .unwrap();
    assert_eq!(created.metadata.uid.as_deref(), Some("uid-kube-dns"));
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn conflict_keeps_status_reason() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::AlreadyExists);

    let err = KubeCluster::new(client)
        .create(&asset("kube-dns", "Service", "services"))
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert!(!classify::is_fatal(&err));
    assert_eq!(err.status().map(|s| s.code), Some(409));
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn missing_system_namespace_keeps_details() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::NamespaceMissing);

    let err = KubeCluster::new(client)
        .create(&asset("kube-dns", "Service", "services"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(classify::is_retryable(&err));
    assert_eq!(err.status().and_then(|s| s.target()), Some(("namespaces", "kube-system")));
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn unparseable_error_body_falls_back_to_http_status() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::GarbageNotFound);

    let err = KubeCluster::new(client)
        .create(&asset("kube-dns", "Service", "services"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!classify::is_retryable(&err));
    assert_eq!(err.status().map(|s| s.code), Some(404));
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn readiness_asks_for_server_version() {
    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::Version);

    KubeCluster::new(client).server_version().await.unwrap();
    timeout_after_1s(mocksrv).await;
}

#[tokio::test]
async fn loader_resolves_each_kind_once() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("00-ns.yaml"),
        "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: kube-system\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("10-dns.yaml"),
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: kube-dns\n  namespace: kube-system\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: dashboard\n",
    )
    .unwrap();

    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::CoreDiscovery);

    let assets = ManifestLoader::new(client, dir.path())
        .default_namespace("bootstrap")
        .load()
        .await
        .unwrap();
    timeout_after_1s(mocksrv).await;

    let names: Vec<_> = assets.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["kube-system", "kube-dns", "dashboard"]);
    assert_eq!(assets[0].placement, Placement::Cluster);
    assert_eq!(assets[0].plural(), "namespaces");
    assert_eq!(assets[1].placement, Placement::Namespaced("kube-system".into()));
    assert_eq!(assets[2].placement, Placement::Namespaced("bootstrap".into()));
    assert_eq!(assets[2].singular(), "service");
}

#[tokio::test]
async fn failed_discovery_aborts_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("10-dns.yaml"),
        "apiVersion: v1\nkind: Service\nmetadata:\n  name: kube-dns\n  namespace: kube-system\n",
    )
    .unwrap();

    let (client, fakeserver) = testcontext();
    let mocksrv = fakeserver.run(Scenario::CoreGroupMissing);

    let config = BootstrapConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
        ..BootstrapConfig::default()
    };
    let progress = Recorder::default();
    let err = create_assets(client, "default", dir.path(), config, &progress)
        .await
        .unwrap_err();
    timeout_after_1s(mocksrv).await;

    assert!(!err.is_timeout());
    match err.apply_error() {
        Some(ApplyError::Load(LoadError::Discovery { api_version, kind, .. })) => {
            assert_eq!(api_version, "v1");
            assert_eq!(kind, "Service");
        }
        other => panic!("expected a discovery failure, got {other:?}"),
    }
    assert_eq!(progress.lines(), vec![
        "Waiting for api-server...",
        "Creating self-hosted assets...",
    ]);
}

// ------------------------------------------------------------------------
// mock apiserver
// ------------------------------------------------------------------------

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;
struct ApiServerVerifier(ApiServerHandle);

async fn timeout_after_1s(handle: tokio::task::JoinHandle<()>) {
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("timeout on mock apiserver")
        .expect("scenario succeeded")
}

/// Canned apiserver conversations
enum Scenario {
    Created,
    AlreadyExists,
    NamespaceMissing,
    GarbageNotFound,
    Version,
    CoreDiscovery,
    /// The apiserver answers, but serves no core group
    CoreGroupMissing,
}

impl ApiServerVerifier {
    /// Answer the calls of one scenario, asserting on each request
    ///
    /// Calls beyond the scenario show up in the test as a closed service error.
    fn run(self, scenario: Scenario) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            match scenario {
                Scenario::Created => self.handle_create_service(StatusCode::CREATED, created_service()).await,
                Scenario::AlreadyExists => {
                    self.handle_create_service(
                        StatusCode::CONFLICT,
                        failure_status(409, "AlreadyExists", "services", "kube-dns"),
                    )
                    .await
                }
                Scenario::NamespaceMissing => {
                    self.handle_create_service(
                        StatusCode::NOT_FOUND,
                        failure_status(404, "NotFound", "namespaces", "kube-system"),
                    )
                    .await
                }
                Scenario::GarbageNotFound => {
                    self.handle_create_service(StatusCode::NOT_FOUND, Value::String("404 page not found".into()))
                        .await
                }
                Scenario::Version => {
                    self.handle_version().await;
                }
                Scenario::CoreDiscovery => self.handle_core_discovery(2).await,
                Scenario::CoreGroupMissing => self.handle_version().await.handle_missing_core_group().await,
            }
        })
    }

    async fn handle_create_service(mut self, code: StatusCode, body: Value) {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), Method::POST);
        assert_eq!(
            request.uri().path(),
            "/api/v1/namespaces/kube-system/services"
        );
        let sent: Value = serde_json::from_slice(&request.into_body().collect().await.unwrap().to_bytes()).unwrap();
        assert_eq!(sent["metadata"]["name"], "kube-dns");
        assert_eq!(sent["kind"], "Service");

        let data = match body {
            Value::String(raw) => raw.into_bytes(),
            other => serde_json::to_vec(&other).unwrap(),
        };
        send.send_response(Response::builder().status(code).body(Body::from(data)).unwrap());
    }

    async fn handle_version(mut self) -> Self {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/version");
        let info = json!({
            "major": "1",
            "minor": "33",
            "gitVersion": "v1.33.1",
            "gitCommit": "8adc0f041b8e7ad1d30e29cc59c6ae7a15e19828",
            "gitTreeState": "clean",
            "buildDate": "2025-05-15T08:19:08Z",
            "goVersion": "go1.24.2",
            "compiler": "gc",
            "platform": "linux/amd64"
        });
        send.send_response(Response::builder().body(Body::from(serde_json::to_vec(&info).unwrap())).unwrap());
        self
    }

    async fn handle_missing_core_group(mut self) {
        let (request, send) = self.0.next_request().await.expect("discovery not called");
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/api/v1");
        let missing = json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": "the server could not find the requested resource",
            "reason": "NotFound",
            "details": {},
            "code": 404
        });
        send.send_response(
            Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from(serde_json::to_vec(&missing).unwrap()))
                .unwrap(),
        );
        // the loader is not retried once discovery fails
        assert!(self.0.next_request().await.is_none(), "unexpected request after failed discovery");
    }

    async fn handle_core_discovery(mut self, calls: usize) {
        for _ in 0..calls {
            let (request, send) = self.0.next_request().await.expect("discovery not called");
            assert_eq!(request.method(), Method::GET);
            assert_eq!(request.uri().path(), "/api/v1");
            let list = json!({
                "kind": "APIResourceList",
                "groupVersion": "v1",
                "resources": [
                    {
                        "name": "namespaces",
                        "singularName": "namespace",
                        "namespaced": false,
                        "kind": "Namespace",
                        "verbs": ["create", "delete", "get", "list", "patch", "update", "watch"]
                    },
                    {
                        "name": "services",
                        "singularName": "service",
                        "namespaced": true,
                        "kind": "Service",
                        "verbs": ["create", "delete", "get", "list", "patch", "update", "watch"]
                    },
                    {
                        "name": "services/status",
                        "singularName": "",
                        "namespaced": true,
                        "kind": "Service",
                        "verbs": ["get", "patch", "update"]
                    }
                ]
            });
            send.send_response(Response::builder().body(Body::from(serde_json::to_vec(&list).unwrap())).unwrap());
        }
    }
}

fn created_service() -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": "kube-dns",
            "namespace": "kube-system",
            "uid": "uid-kube-dns",
            "resourceVersion": "301"
        },
        "spec": { "clusterIP": "10.3.0.10" }
    })
}

fn failure_status(code: u16, reason: &str, kind: &str, name: &str) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("{kind} \"{name}\" {}", reason.to_lowercase()),
        "reason": reason,
        "details": { "name": name, "kind": kind },
        "code": code
    })
}

// Create a test context with a mocked kube client
fn testcontext() -> (Client, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    let mock_client = Client::new(mock_service, "default");
    (mock_client, ApiServerVerifier(handle))
}
