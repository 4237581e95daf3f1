//! HTTP API end to end against mocked registries

mod helper;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use mockito::{Server, ServerGuard};
use serde_json::Value;
use tower::ServiceExt;

use helper::{create_test_store, package_config};
use stack_tracker::config::TrackerConfig;
use stack_tracker::package::types::Category;
use stack_tracker::reconcile::Reconciler;
use stack_tracker::refresh::Refresher;
use stack_tracker::scheduler::Scheduler;
use stack_tracker::server::{AppState, router};
use stack_tracker::source::registries::{GitHubSource, NpmSource, PypiSource};

async fn mock_registries(server: &mut ServerGuard) {
    server
        .mock("GET", "/react")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"dist-tags": {"latest": "18.3.1"}, "time": {"18.3.1": "2024-04-26T16:42:00.000Z"}}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/downloads/point/last-week/react")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"downloads": 25000000, "package": "react"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/downloads/point/last-month/react")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"downloads": 100000000, "package": "react"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/repos/facebook/react")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"stargazers_count": 230000, "forks_count": 47000}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/pypi/fastapi/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"info": {"version": "0.115.0"}, "releases": {"0.115.0": [{"upload_time_iso_8601": "2024-09-17T10:00:00.000000Z"}]}}"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/api/packages/fastapi/recent")
        .with_status(429)
        .create_async()
        .await;
}

fn build_app(server: &ServerGuard) -> (tempfile::TempDir, Router) {
    let (temp_dir, store) = create_test_store();
    let url = server.url();

    let mut config = TrackerConfig::default();
    config
        .add_package(
            "react",
            package_config(Category::Frontend, Some("react"), None, Some("facebook/react")),
            true,
        )
        .unwrap();
    config
        .add_package(
            "fastapi",
            package_config(Category::Backend, None, Some("fastapi"), None),
            false,
        )
        .unwrap();

    let reconciler = Reconciler::new(
        Arc::new(NpmSource::new(&url, &url)),
        Arc::new(PypiSource::new(url.clone(), url.clone())),
        Arc::new(GitHubSource::new(&url)),
    );
    let store = Arc::new(store);
    let refresher = Arc::new(Refresher::new(reconciler, store.clone(), Arc::new(config)));
    let app = router(AppState {
        store,
        scheduler: Arc::new(Scheduler::new(refresher)),
    });
    (temp_dir, app)
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn refresh_then_query_over_http() {
    let mut server = Server::new_async().await;
    mock_registries(&mut server).await;
    let (_temp_dir, app) = build_app(&server);

    let (status, body) = call(&app, "GET", "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 0);

    let (status, body) = call(&app, "POST", "/stacks/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["updated_stacks"], 2);

    let (status, body) = call(&app, "GET", "/stacks/react").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["latest_version"], "18.3.1");
    assert_eq!(body["release_date"], "2024-04-26");
    assert_eq!(body["github_stars"], 230_000);
    assert_eq!(body["downloads_weekly"], 25_000_000);
    assert_eq!(body["downloads_monthly"], 100_000_000);
    assert_eq!(body["category"], "frontend");

    // rate-limited download stats degrade to zero without failing the package
    let (_, body) = call(&app, "GET", "/stacks/fastapi").await;
    assert_eq!(body["latest_version"], "0.115.0");
    assert_eq!(body["downloads_weekly"], 0);

    let (_, body) = call(&app, "GET", "/stacks/trending?sort_by=downloads&limit=1").await;
    assert_eq!(body["stacks"][0]["name"], "React");

    let (_, body) = call(&app, "GET", "/stacks/category/backend").await;
    assert_eq!(body["total_count"], 1);

    let (_, body) = call(&app, "GET", "/stacks/outdated").await;
    assert_eq!(body["total_count"], 0);
}
