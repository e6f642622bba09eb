mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::ScriptedSource;
use richness_core::server::{router, AppState};
use richness_core::{AnalysisOptions, InequalityAnalyzer};
use std::sync::Arc;
use tower::ServiceExt;

fn app(source: ScriptedSource) -> Router {
    let analyzer = InequalityAnalyzer::new(Arc::new(source), AnalysisOptions::default());
    router(Arc::new(AppState::new(analyzer)))
}

async fn get(app: Router, uri: &str) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .uri(uri)
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

#[tokio::test]
async fn test_gini_unbounded() {
    let app = app(ScriptedSource::staircase(10));
    let (status, headers, body) = get(app, "/api/gini?entity=Q5").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!((json["gini"].as_f64().unwrap() - 0.3).abs() < 1e-9);
    assert_eq!(json["data"].as_array().unwrap().len(), 10);
    assert_eq!(json["data"][0], 0.0);
    assert_eq!(json["data"][9], 1.0);
    assert_eq!(json["entities"][0], serde_json::json!(["Q1"]));
}

#[tokio::test]
async fn test_gini_bounded_with_bracket_list() {
    let source = ScriptedSource::new(&[
        ("A", &["P31", "P279"]),
        ("B", &["P31"]),
        ("C", &[]),
    ]);
    let uri = "/api/gini?entity=Q5&properties=%5BP31,P279%5D";
    let (status, _, body) = get(app(source), uri).await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["entities"], serde_json::json!([["C"], ["B"], ["A"]]));
    // cumulative 0, 1, 3
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert!((data[1].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_missing_entity_param() {
    let (status, _, body) = get(app(ScriptedSource::staircase(3)), "/api/gini").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(String::from_utf8(body).unwrap(), "Url Param 'entity' is missing");
}

#[tokio::test]
async fn test_degenerate_class_is_unprocessable() {
    let source = ScriptedSource::new(&[("A", &["P1"]), ("B", &["P1"])]);
    let (status, _, body) = get(app(source), "/api/gini?entity=Q5&properties=P2").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8(body).unwrap().contains("Degenerate"));
}

#[tokio::test]
async fn test_source_failure_is_server_error() {
    let source = ScriptedSource::staircase(4).failing_on("Q2");
    let (status, _, body) = get(app(source), "/api/gini?entity=Q5").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(String::from_utf8(body).unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_home() {
    let (status, _, body) = get(app(ScriptedSource::default()), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Welcome home!");
}
