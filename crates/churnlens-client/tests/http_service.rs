use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use churnlens_client::{
    AnalysisService, ClientError, HttpAnalysisService, fetch_rows, normalize_dataset,
};
use churnlens_core::{
    AnalysisRequest, DatasetKind, HotspotRow, Id, OwnershipRow, RunStatus,
};
use serde_json::{Value, json};

async fn spawn_service() -> SocketAddr {
    let app = Router::new()
        .route("/api/analyses", post(create_analysis))
        .route("/api/runs/{run_id}", get(fetch_run))
        .route("/api/repositories/{repository_id}/{kind}", get(fetch_dataset));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

async fn create_analysis(Json(body): Json<Value>) -> impl IntoResponse {
    if body.get("repositoryUrl").and_then(Value::as_str).is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "missing url"})));
    }
    (StatusCode::ACCEPTED, Json(json!({"runId": 17, "repository_id": "repo-9"})))
}

async fn fetch_run(Path(run_id): Path<String>) -> impl IntoResponse {
    match run_id.as_str() {
        "17" => (
            StatusCode::OK,
            Json(json!({
                "id": 17,
                "status": "failed",
                "createdAt": "2024-03-01T10:00:00Z",
                "completed_at": "2024-03-01T10:05:00Z",
                "errorMessage": "clone failed"
            })),
        ),
        "garbled" => (StatusCode::OK, Json(json!({"id": "garbled", "status": "paused"}))),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "no such run"}))),
    }
}

async fn fetch_dataset(Path((repository_id, kind)): Path<(String, String)>) -> impl IntoResponse {
    if repository_id != "repo-9" {
        return (StatusCode::NOT_FOUND, Json(Value::Null));
    }
    let body = match kind.as_str() {
        "hotspots" => json!([
            {"path": "src/lib.rs", "touches": 12, "churn": 340},
            {"file": "src/main.rs", "commits": 3, "lines_changed": 40, "score": 0.2}
        ]),
        "ownership" => json!({
            "owners": [{"path": "src/lib.rs", "author": "ada", "share": 0.8, "commits": 9}],
            "totalContributors": 4
        }),
        _ => json!({"unexpected": true}),
    };
    (StatusCode::OK, Json(body))
}

fn service_for(addr: SocketAddr) -> HttpAnalysisService {
    HttpAnalysisService::new(&format!("http://{addr}/api/"), Duration::from_secs(5))
        .expect("http service")
}

#[tokio::test]
async fn request_analysis_posts_camel_case_body() {
    let service = service_for(spawn_service().await);

    let ticket = service
        .request_analysis(&AnalysisRequest {
            repository_url: "https://example.com/r.git".to_owned(),
            branch: Some("main".to_owned()),
            max_commits: None,
        })
        .await
        .expect("request analysis");

    assert_eq!(ticket.run_id, Id::new("17"));
    assert_eq!(ticket.repository_id, Id::new("repo-9"));
}

#[tokio::test]
async fn fetch_run_decodes_and_maps_errors() {
    let service = service_for(spawn_service().await);

    let run = service.fetch_run(&Id::new("17")).await.expect("fetch run");
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.completed_at.is_some());
    assert_eq!(run.failure_message().as_deref(), Some("clone failed"));

    assert!(matches!(
        service.fetch_run(&Id::new("missing")).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        service.fetch_run(&Id::new("garbled")).await,
        Err(ClientError::Json(_))
    ));
}

#[tokio::test]
async fn datasets_are_normalized_at_the_boundary() {
    let service = service_for(spawn_service().await);
    let repo = Id::new("repo-9");

    let (hotspots, ownership) = tokio::join!(
        fetch_rows::<HotspotRow>(&service, &repo),
        fetch_rows::<OwnershipRow>(&service, &repo),
    );

    let hotspots = hotspots.expect("hotspots");
    assert_eq!(hotspots.rows.len(), 2);
    assert_eq!(hotspots.rows[1].path, "src/main.rs");
    assert_eq!(hotspots.rows[1].touches, 3);
    assert_eq!(hotspots.rows[1].churn, 40);

    let ownership = ownership.expect("ownership");
    assert_eq!(ownership.rows[0].contributor, "ada");
    assert_eq!(ownership.summary.get("totalContributors"), Some(&json!(4)));

    let raw = service
        .fetch_dataset(&repo, DatasetKind::Timeline)
        .await
        .expect("raw timeline");
    assert!(matches!(
        normalize_dataset(DatasetKind::Timeline, raw),
        Err(ClientError::InvalidEnvelope { .. })
    ));
}
