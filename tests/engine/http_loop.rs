use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crawl_admission::catalog::{ResidentTask, TaskCategory};
use crawl_admission::engine::{CollectorSnapshot, CrawlLoop, HttpCrawlLoop};
use crawl_admission::error::EngineError;

fn review_task() -> ResidentTask {
    ResidentTask {
        name: "review".into(),
        category: TaskCategory::Review,
        period_secs: 86_400,
        batch_id: "b1".into(),
    }
}

fn engine(server: &MockServer) -> HttpCrawlLoop {
    HttpCrawlLoop::new(&format!("{}/", server.uri()), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn open_collectors_decodes_engine_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collectors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "ASIN-asin-1", "externalSize": 120},
            {"name": "weekly", "category": "BEST_SELLERS", "externalSize": 3}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let collectors = engine(&server).open_collectors().await.unwrap();

    assert_eq!(
        collectors,
        vec![
            CollectorSnapshot::new("ASIN-asin-1", 120),
            CollectorSnapshot::tagged("weekly", TaskCategory::BestSellers, 3),
        ]
    );
    server.verify().await;
}

#[tokio::test]
async fn submit_posts_task_and_force_flag() {
    let server = MockServer::start().await;
    let task = review_task();
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_json(json!({
            "task": {
                "name": "review",
                "category": "REVIEW",
                "period_secs": 86_400,
                "batch_id": "b1"
            },
            "force": true
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    engine(&server).submit(&task, true).await.unwrap();
    server.verify().await;
}

#[tokio::test]
async fn conflict_maps_to_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let err = engine(&server)
        .submit(&review_task(), false)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Rejected { ref task, .. } if task == "review"));
}

#[tokio::test]
async fn server_error_maps_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collectors"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = engine(&server).open_collectors().await.unwrap_err();

    assert!(matches!(err, EngineError::Status { status: 503, .. }));
}

#[tokio::test]
async fn malformed_snapshot_maps_to_decode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collectors"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = engine(&server).open_collectors().await.unwrap_err();

    assert!(matches!(err, EngineError::Decode(_)));
}

#[tokio::test]
async fn retire_sends_names_and_returns_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/collectors/retire"))
        .and(body_json(json!({"names": ["ASIN-a", "ASIN-b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retired": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let retired = engine(&server)
        .retire(&["ASIN-a".to_string(), "ASIN-b".to_string()])
        .await
        .unwrap();

    assert_eq!(retired, 2);
    server.verify().await;
}

#[tokio::test]
async fn retire_with_no_names_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/collectors/retire"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"retired": 0})))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(engine(&server).retire(&[]).await.unwrap(), 0);
    server.verify().await;
}

#[tokio::test]
async fn unreachable_engine_maps_to_transport() {
    let engine = HttpCrawlLoop::new("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();

    let err = engine.open_collectors().await.unwrap_err();

    assert!(matches!(err, EngineError::Transport { .. }));
}
