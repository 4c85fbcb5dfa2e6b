// ABOUTME: Integration tests for the REST adapter over a fake daemon.
// ABOUTME: Checks routing, status mapping, NDJSON streaming, and config management.

mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use dockgate::api::DockerApi;
use dockgate::config::ConnectionConfig;
use dockgate::http::{AppState, MEDIA_TYPE_NDJSON, create_router};
use dockgate::registry::DaemonRegistry;
use dockgate::repository::{
    MemoryStore, RepositorySet, StaticConfigRepository, StoreConfigRepository,
};
use dockgate::runtime::DaemonError;
use dockgate::types::ConfigId;
use http_body_util::BodyExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use support::fake_daemon::{FakeDaemon, StreamEnd};
use tower::ServiceExt;

struct Gateway {
    router: axum::Router,
    daemon: Arc<FakeDaemon>,
}

fn gateway() -> Gateway {
    support::init_tracing();
    let daemon = Arc::new(FakeDaemon::new("host-a"));
    let api = DockerApi::new(ConfigId::new("host-a"), Arc::clone(&daemon) as _);
    let registry = DaemonRegistry::from_apis([api]);

    let mut fixed = BTreeMap::new();
    fixed.insert(ConfigId::new("host-a"), ConnectionConfig::remote("tcp://a:2375"));
    let repositories = RepositorySet::new()
        .with_store(Arc::new(StoreConfigRepository::new(MemoryStore::new())))
        .with_repository(Arc::new(StaticConfigRepository::new(fixed)));

    Gateway {
        router: create_router(AppState::new(Arc::new(registry), repositories)),
        daemon,
    }
}

async fn send(
    router: &axum::Router,
    method: Method,
    uri: &str,
    body: Body,
) -> (StatusCode, Vec<u8>, Option<String>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec(), content_type)
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>, Option<String>) {
    send(router, Method::GET, uri, Body::empty()).await
}

fn json(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).unwrap()
}

mod routing {
    use super::*;

    #[tokio::test]
    async fn ping_reachable_daemon_is_ok() {
        let gw = gateway();
        let (status, _, _) = get(&gw.router, "/api/docker/host-a/ping").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn ping_unreachable_daemon_is_server_error() {
        let gw = gateway();
        gw.daemon.set_failing(true);
        let (status, _, _) = get(&gw.router, "/api/docker/host-a/ping").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn unknown_config_is_not_found() {
        let gw = gateway();
        let (status, body, _) = get(&gw.router, "/api/docker/image/ghost/listOfImages").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["message"], "Api service for ghost is not found");
        assert!(gw.daemon.calls().is_empty());
    }

    #[tokio::test]
    async fn query_results_are_json() {
        let gw = gateway();
        let (status, body, _) =
            get(&gw.router, "/api/docker/container/host-a/listOfContainers?all=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)[0]["Id"], "c1");
        assert_eq!(gw.daemon.calls(), ["list_containers:true"]);
    }

    #[tokio::test]
    async fn failed_query_is_server_error_with_message() {
        let gw = gateway();
        gw.daemon.set_failing(true);
        let (status, body, _) =
            get(&gw.router, "/api/docker/container/host-a/inspectContainer?id=c1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json(&body)["message"].as_str().unwrap().contains("host-a is down"));
    }

    #[tokio::test]
    async fn container_commands_map_to_status() {
        let gw = gateway();
        let (status, _, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/container/host-a/startContainer?id=c1",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(
            &gw.router,
            Method::DELETE,
            "/api/docker/container/host-a/removeContainer?id=c1&force=true",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            gw.daemon.calls(),
            ["start_container:c1", "remove_container:c1:true"]
        );

        gw.daemon.set_failing(true);
        let (status, body, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/container/host-a/stopContainer?id=c1",
            Body::empty(),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn invalid_image_is_bad_request() {
        let gw = gateway();
        let (status, _, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/container/host-a/createContainer",
            Body::from(r#"{"name": "bad name!"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_container_returns_created() {
        let gw = gateway();
        let (status, body, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/container/host-a/createContainer",
            Body::from(r#"{"name": "busybox", "tag": "1.36"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json(&body)["Id"], "c2");
    }

    #[tokio::test]
    async fn save_image_returns_tar_attachment() {
        let gw = gateway();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/docker/image/host-a/saveImage")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name": "busybox"}"#))
            .unwrap();
        let response = gw.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/x-tar");
        assert!(
            response.headers()[header::CONTENT_DISPOSITION]
                .to_str()
                .unwrap()
                .contains("attachment")
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"tar-bytes");
    }

    #[tokio::test]
    async fn create_image_streams_the_archive_body() {
        let gw = gateway();
        let (status, _, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/image/host-a/createImage?repo=rootfs:1",
            Body::from(vec![0u8; 4096]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(gw.daemon.calls(), ["create_image:rootfs:1:4096"]);
    }

    #[tokio::test]
    async fn load_image_reports_daemon_output() {
        let gw = gateway();
        let (status, body, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/image/host-a/loadImage",
            Body::from(vec![1u8; 2048]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!([{"stream": "Loaded image"}]));
        assert_eq!(gw.daemon.calls(), ["load_image:2048"]);
    }

    #[tokio::test]
    async fn failed_load_is_server_error() {
        let gw = gateway();
        gw.daemon.set_failing(true);
        let (status, body, _) = send(
            &gw.router,
            Method::POST,
            "/api/docker/image/host-a/loadImage",
            Body::from(vec![1u8; 16]),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json(&body)["message"].is_string());
    }
}

mod streaming {
    use super::*;

    fn lines(body: &[u8]) -> Vec<serde_json::Value> {
        body.split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn pull_progress_is_ndjson() {
        let gw = gateway();
        let (status, body, content_type) =
            get(&gw.router, "/api/docker/image/host-a/pullImage?name=busybox").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(MEDIA_TYPE_NDJSON));

        let statuses: Vec<_> = lines(&body)
            .iter()
            .map(|line| line["status"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(statuses, ["Pulling from library", "Downloading", "Pull complete"]);
    }

    #[tokio::test]
    async fn mid_stream_error_becomes_last_line() {
        let gw = gateway();
        gw.daemon
            .set_stream_end(StreamEnd::Fail(DaemonError::command("connection reset")));
        let (status, body, _) = get(
            &gw.router,
            "/api/docker/container/host-a/logContainer?id=c1&follow=false&tail=5",
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let lines = lines(&body);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "STDOUT");
        assert_eq!(lines[0]["payload"], "hello");
        assert!(lines[2]["error"].as_str().unwrap().contains("connection reset"));
        assert_eq!(gw.daemon.calls(), ["logs:c1:false:5"]);
    }

    #[tokio::test]
    async fn invalid_pull_fails_before_streaming() {
        let gw = gateway();
        let (status, _, content_type) =
            get(&gw.router, "/api/docker/image/host-a/pullImage?name=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_ne!(content_type.as_deref(), Some(MEDIA_TYPE_NDJSON));
        assert_eq!(gw.daemon.subscriptions().started(), 0);
    }

    #[tokio::test]
    async fn events_stream_completes() {
        let gw = gateway();
        let (status, body, _) = get(&gw.router, "/api/docker/client/host-a/events").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lines(&body)[0]["Action"], "start");
        let subs = gw.daemon.subscriptions();
        assert_eq!(subs.started(), 1);
        assert_eq!(subs.closed(), 1);
    }
}

mod config_management {
    use super::*;

    #[tokio::test]
    async fn list_shows_static_entries() {
        let gw = gateway();
        let (status, body, _) = get(&gw.router, "/api/config").await;
        assert_eq!(status, StatusCode::OK);
        let listed = json(&body);
        assert_eq!(listed[0]["id"], "host-a");
        assert_eq!(listed[0]["readOnly"], true);
        assert_eq!(listed[0]["config"]["target"]["type"], "remote");
    }

    #[tokio::test]
    async fn put_then_delete_dynamic_entry() {
        let gw = gateway();
        let (status, _, _) = send(
            &gw.router,
            Method::PUT,
            "/api/config/dynamic",
            Body::from(r#"{"target": {"type": "local"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body, _) = get(&gw.router, "/api/config").await;
        assert_eq!(json(&body).as_array().unwrap().len(), 2);

        let (status, _, _) =
            send(&gw.router, Method::DELETE, "/api/config/dynamic", Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _, _) =
            send(&gw.router, Method::DELETE, "/api/config/dynamic", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unusable_host_is_rejected_and_not_stored() {
        let gw = gateway();
        let (status, body, _) = send(
            &gw.router,
            Method::PUT,
            "/api/config/bad",
            Body::from(r#"{"target": {"type": "remote", "host": "not-a-daemon-url"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json(&body)["message"]
                .as_str()
                .unwrap()
                .contains("missing scheme")
        );

        let (_, body, _) = get(&gw.router, "/api/config").await;
        let ids: Vec<_> = json(&body)
            .as_array()
            .unwrap()
            .iter()
            .map(|entity| entity["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["host-a"]);
    }

    #[tokio::test]
    async fn static_entries_are_conflicts() {
        let gw = gateway();
        let (status, _, _) = send(
            &gw.router,
            Method::PUT,
            "/api/config/host-a",
            Body::from(r#"{"target": {"type": "remote", "host": "tcp://b:2375"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _, _) =
            send(&gw.router, Method::DELETE, "/api/config/host-a", Body::empty()).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
