//! Render API tests over the in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use sketchloop_core::{
    testing::{SessionScript, FAKE_LOOP, FAKE_PNG},
    transcoder::TranscodeError,
    Job, JobStatus, JobStore,
};
use tokio_test::assert_ok;
use tower::ServiceExt;

use common::{fixtures::sample_image, render_request, Part, TestFixture};

#[tokio::test]
async fn test_health_reports_idle_renderer() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["busy"], false);
}

#[tokio::test]
async fn test_submit_returns_finished_job() {
    let fixture = TestFixture::new();

    let response = fixture
        .post_render(&[
            Part::image("cat.png", &sample_image()),
            Part::text("demoIndex", "2"),
        ])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let job = &response.body;
    assert_eq!(job["status"], "done");
    assert_eq!(job["demoIndex"], 2);
    assert_eq!(job["videoUrl"], "https://assets.example.com/XYZ/foo.mp4");
    assert!(job["error"].is_null());

    let id = job["id"].as_str().unwrap();
    let typed: Job = assert_ok!(serde_json::from_value(job.clone()));
    assert_eq!(typed.status, JobStatus::Done);
    assert_eq!(
        job["outputUrl"],
        format!("http://localhost:3000/files/outputs/{}.webp", id)
    );
    assert!(fixture.storage(&format!("inputs/{}.png", id)).exists());

    // The finished loop is served statically
    let file = fixture.get_raw(&format!("/files/outputs/{}.webp", id)).await;
    assert_eq!(file.status, StatusCode::OK);
    assert_eq!(file.body.as_ref(), FAKE_LOOP);
}

#[tokio::test]
async fn test_submit_without_image_is_rejected() {
    let fixture = TestFixture::new();

    let response = fixture.post_render(&[Part::text("demoIndex", "1")]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "No image uploaded");
    assert!(fixture.mocks.store.is_empty());
    assert_eq!(fixture.mocks.launcher.launch_count().await, 0);
}

#[tokio::test]
async fn test_submit_with_empty_image_is_rejected() {
    let fixture = TestFixture::new();

    let response = fixture.post_render(&[Part::image("empty.png", b"")]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(fixture.mocks.store.is_empty());
}

#[tokio::test]
async fn test_concurrent_submit_gets_429() {
    let fixture = TestFixture::new();
    fixture
        .mocks
        .retriever
        .set_delay(Duration::from_millis(300))
        .await;

    let router = fixture.router.clone();
    let request = render_request(&[Part::image("a.png", &sample_image())]);
    let first = tokio::spawn(async move { router.oneshot(request).await.unwrap().status() });

    // Wait for the first job to take the slot
    let mut waited = 0;
    while fixture.get("/api/health").await.body["busy"] != true {
        tokio::time::sleep(Duration::from_millis(5)).await;
        waited += 1;
        assert!(waited < 200, "first job never became active");
    }

    let response = fixture
        .post_render(&[Part::image("b.png", &sample_image())])
        .await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.body["error"], "Renderer busy");

    assert_eq!(assert_ok!(first.await), StatusCode::OK);
    assert_eq!(fixture.mocks.store.len(), 1);
}

#[tokio::test]
async fn test_download_failure_serves_screenshot() {
    let fixture = TestFixture::new();
    fixture.mocks.retriever.set_fail_status(Some(404)).await;

    let response = fixture
        .post_render(&[Part::image("cat.png", &sample_image())])
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "done");
    let id = response.body["id"].as_str().unwrap().to_string();
    assert!(response.body["outputUrl"]
        .as_str()
        .unwrap()
        .ends_with(&format!("{}.png", id)));

    let file = fixture.get_raw(&format!("/files/outputs/{}.png", id)).await;
    assert_eq!(file.status, StatusCode::OK);
    assert_eq!(file.body.as_ref(), FAKE_PNG);
}

#[tokio::test]
async fn test_transcode_failure_returns_500_and_records_error() {
    let fixture = TestFixture::new();
    fixture
        .mocks
        .transcoder
        .set_next_error(TranscodeError::failed("ffmpeg exited with code 1", None))
        .await;

    let response = fixture
        .post_render(&[Part::image("cat.png", &sample_image())])
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("ffmpeg exited with code 1"));

    let listed = fixture.get("/api/renders").await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body[0]["status"], "error");
}

#[tokio::test]
async fn test_driver_failure_returns_500() {
    let fixture = TestFixture::with_script(SessionScript {
        fail_upload: true,
        ..SessionScript::happy("XYZ", "foo")
    });

    let response = fixture
        .post_render(&[Part::image("cat.png", &sample_image())])
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("Upload failed"));
    assert_eq!(fixture.mocks.store.all()[0].status, JobStatus::Error);
}

#[tokio::test]
async fn test_get_render_by_id() {
    let fixture = TestFixture::new();
    let submitted = fixture
        .post_render(&[Part::image("cat.png", &sample_image())])
        .await;
    let id = submitted.body["id"].as_str().unwrap();

    let response = fixture.get(&format!("/api/render/{}", id)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, submitted.body);

    let stored = assert_ok!(fixture.mocks.store.get(id)).unwrap();
    assert_eq!(serde_json::to_value(&stored).unwrap(), submitted.body);
}

#[tokio::test]
async fn test_get_unknown_render_is_404() {
    let fixture = TestFixture::new();

    let response = fixture.get("/api/render/does-not-exist").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("does-not-exist"));
}

#[tokio::test]
async fn test_list_renders_newest_first_with_limit() {
    let fixture = TestFixture::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        let response = fixture
            .post_render(&[Part::image("cat.png", &sample_image())])
            .await;
        ids.push(response.body["id"].as_str().unwrap().to_string());
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let response = fixture.get("/api/renders?limit=2").await;

    assert_eq!(response.status, StatusCode::OK);
    let listed: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_pipeline_metrics() {
    let fixture = TestFixture::new();
    fixture
        .post_render(&[Part::image("cat.png", &sample_image())])
        .await;

    let response = fixture.get_raw("/metrics").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response
        .content_type
        .as_deref()
        .unwrap()
        .starts_with("text/plain"));
    let text = String::from_utf8(response.body.to_vec()).unwrap();
    assert!(text.contains("sketchloop_jobs_total"));
    assert!(text.contains("sketchloop_renderer_busy"));
    assert!(text.contains("sketchloop_http_requests_total"));
}
