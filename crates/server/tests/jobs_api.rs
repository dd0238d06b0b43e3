//! Job API tests against the in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use transflow_core::{testing::MockResponse, ExecutionReport, JobFilter};

use common::{fixtures, TestFixture};

#[tokio::test]
async fn test_health_and_config() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");

    let response = fixture.get("/api/v1/config").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["auth"]["method"], "api_key");
    assert_eq!(response.body["auth"]["api_key_configured"], true);
    assert!(response.body["auth"].get("api_key").is_none());
}

#[tokio::test]
async fn test_submit_returns_accepted_with_status_url() {
    let fixture = TestFixture::new().await;
    fixture.executor.set_delay(Duration::from_millis(200)).await;

    let response = fixture.submit(fixtures::job_payload("clip-1")).await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["state"], "submitted");
    let job_id = response.body["job_id"].as_str().unwrap();
    assert_eq!(
        response.body["status_url"],
        format!("/api/v1/jobs/{}", job_id)
    );
}

#[tokio::test]
async fn test_submitted_job_reaches_succeeded() {
    let fixture = TestFixture::new().await;

    let response = fixture.submit(fixtures::job_payload("clip-1")).await;
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let status = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["state"], "succeeded");
    assert_eq!(status.body["id"], job_id.as_str());
    assert_eq!(
        status.body["output"]["location"],
        "http://mock-cdn/ffmpeg/clip-1/"
    );
    assert_eq!(status.body["input"]["video_id"], "clip-1");
    assert!(status.body.get("failure").is_none());
}

#[tokio::test]
async fn test_failed_job_exposes_reason() {
    let fixture = TestFixture::new().await;
    fixture
        .executor
        .set_response(MockResponse::Report(ExecutionReport::failure(
            500,
            "encoder exploded",
        )))
        .await;

    let response = fixture.submit(fixtures::job_payload("clip-1")).await;
    let job_id = response.body["job_id"].as_str().unwrap().to_string();

    let status = fixture.wait_for_terminal(&job_id).await;
    assert_eq!(status.body["state"], "failed");
    assert_eq!(status.body["result"]["cause"], "execution_failure");
    assert!(status.body["failure"]
        .as_str()
        .unwrap()
        .contains("encoder exploded"));
}

#[tokio::test]
async fn test_invalid_token_is_401_and_creates_nothing() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .submit_with_token(fixtures::job_payload("clip-1"), Some("wrong"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = fixture
        .submit_with_token(fixtures::job_payload("clip-1"), None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(fixture.store.count(&JobFilter::new()).unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_authorizer_is_503() {
    let fixture = TestFixture::new().await;
    fixture.auth.set_unavailable(true);

    let response = fixture.submit(fixtures::job_payload("clip-1")).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(fixture.store.count(&JobFilter::new()).unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_payload_is_400() {
    let fixture = TestFixture::new().await;

    let response = fixture.submit_raw("{not json").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = fixture
        .submit(json!({ "video_id": "clip-1", "input_files": "https://example.com/a.mov" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("output_files"));

    assert_eq!(fixture.store.count(&JobFilter::new()).unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_body_checks_credentials_first() {
    let fixture = TestFixture::new().await;
    let body = vec![b' '; 2 * 1024 * 1024];

    let response = fixture.submit_bytes(body.clone(), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = fixture.submit_bytes(body, Some(common::TOKEN)).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);

    assert_eq!(fixture.store.count(&JobFilter::new()).unwrap(), 0);
}

#[tokio::test]
async fn test_get_unknown_job_is_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/jobs/does-not-exist").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_routes_require_credentials() {
    let fixture = TestFixture::new().await;

    let response = fixture.get_with_token("/api/v1/jobs", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = fixture.get_with_token("/api/v1/jobs/x", Some("wrong")).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_jobs_with_filters() {
    let fixture = TestFixture::new().await;

    for video in ["a", "b", "c"] {
        let response = fixture.submit(fixtures::job_payload(video)).await;
        let job_id = response.body["job_id"].as_str().unwrap().to_string();
        fixture.wait_for_terminal(&job_id).await;
    }

    let response = fixture.get("/api/v1/jobs?limit=2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(response.body["total"], 3);
    assert_eq!(response.body["limit"], 2);

    let response = fixture.get("/api/v1/jobs?state=succeeded").await;
    assert_eq!(response.body["total"], 3);

    let response = fixture.get("/api/v1/jobs?state=failed").await;
    assert_eq!(response.body["total"], 0);

    let response = fixture.get("/api/v1/jobs?state=bogus").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_media_route_serves_sink_root() {
    let fixture = TestFixture::new().await;
    let dir = fixture.media_root().join("ffmpeg").join("clip-1");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("out.mp4"), b"video-bytes").unwrap();

    let (status, body) = fixture.raw("/media/ffmpeg/clip-1/out.mp4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"video-bytes");

    let (status, _) = fixture.raw("/media/ffmpeg/clip-1/missing.mp4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let (status, body) = fixture.raw("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("transflow_http_requests_total"));
    assert!(text.contains("transflow_jobs_by_state"));
}
