//! HTTP surface, driven in-process with `tower::ServiceExt::oneshot`.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use common::*;
use coursemate::assistant::CourseAssistant;
use coursemate::llm::ModelTurn;
use coursemate::server::router;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn build_app(turns: Vec<ModelTurn>) -> (Router, Arc<CourseAssistant>) {
    let (store, _) = fixture_store(5).await;
    let assistant = Arc::new(assistant_with(
        Arc::new(ScriptedModel::new(turns)),
        store,
        2,
        2,
    ));
    (router(assistant.clone()), assistant)
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (app, _) = build_app(vec![]).await;
    let (status, body) = send(app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_query_returns_answer_sources_and_session() {
    let (app, _) = build_app(vec![
        tool_turn(vec![(
            "call_1",
            "get_course_outline",
            json!({ "course_title": "MCP" }),
        )]),
        ModelTurn::text_only("It has two lessons."),
    ])
    .await;

    let (status, body) = send(
        app,
        Method::POST,
        "/api/query",
        Some(json!({ "query": "What is in the MCP course?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "It has two lessons.");
    assert_eq!(
        body["sources"],
        json!([{ "text": MCP_TITLE, "url": "https://example.com/mcp" }])
    );
    assert!(!body["session_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_query_keeps_supplied_session() {
    let (app, assistant) = build_app(vec![ModelTurn::text_only("hello")]).await;

    let (status, body) = send(
        app,
        Method::POST,
        "/api/query",
        Some(json!({ "query": "hi", "session_id": "client-session" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "client-session");
    assert_eq!(assistant.sessions().exchanges("client-session").len(), 1);
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let (app, _) = build_app(vec![]).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/query",
        Some(json!({ "query": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_model_failure_is_upstream_error() {
    // Empty script: the first model call fails.
    let (app, _) = build_app(vec![]).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/api/query",
        Some(json!({ "query": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn test_index_failure_is_upstream_error() {
    let model = Arc::new(ScriptedModel::new(vec![tool_turn(vec![(
        "call_1",
        "search_course_content",
        json!({ "query": "transport" }),
    )])]));
    let assistant = Arc::new(assistant_with(model, down_store(), 2, 2));

    let (status, body) = send(
        router(assistant),
        Method::POST,
        "/api/query",
        Some(json!({ "query": "What is transport?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn test_courses() {
    let (app, _) = build_app(vec![]).await;
    let (status, body) = send(app, Method::GET, "/api/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_courses"], 2);
    assert_eq!(body["course_titles"], json!([MCP_TITLE, CHROMA_TITLE]));
}

#[tokio::test]
async fn test_clear_session() {
    let (app, assistant) = build_app(vec![]).await;
    let id = assistant.sessions().create_session();
    assistant.sessions().add_exchange(&id, "q", "a");

    let (status, _) = send(
        app.clone(),
        Method::DELETE,
        &format!("/api/session/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(assistant.sessions().exchanges(&id).is_empty());
    assert!(assistant.sessions().contains(&id));

    let (status, body) = send(app, Method::DELETE, "/api/session/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}
