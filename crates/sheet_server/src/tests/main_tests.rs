use super::*;
use axum::{body, body::Body, http::Request};
use tower::ServiceExt;

async fn test_app() -> (Router, Storage) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let app = build_router(AppState {
        api: ApiContext {
            storage: storage.clone(),
        },
    });
    (app, storage)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn get_probe_returns_status_object() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::get("/exec").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn post_json_entry_appends_row() {
    let (app, storage) = test_app().await;
    let request = Request::post("/exec")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"intent":"I'm curious what this is about","userType":"Student","phone":"+919876543210","timestamp":"2025-03-14T09:26:53.000Z"}"#,
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Entry saved successfully");

    let rows = storage.list_sheet_rows().await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].row.phone, "+919876543210");
}

#[tokio::test]
async fn post_form_style_request_uses_query_parameters() {
    let (app, storage) = test_app().await;
    let request = Request::post("/exec?intent=Loan&userType=Other&phone=%2B911234567890")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(json_body(response).await["success"], true);

    let rows = storage.list_sheet_rows().await.expect("rows");
    assert_eq!(rows[0].row.user_type, "Other");
    assert!(!rows[0].row.timestamp.is_empty());
}

#[tokio::test]
async fn post_without_data_reports_failure_with_ok_status() {
    let (app, storage) = test_app().await;
    let response = app
        .oneshot(Request::post("/exec").body(Body::from("{}")).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No data provided");
    assert!(storage.list_sheet_rows().await.expect("rows").is_empty());
}

#[tokio::test]
async fn preflight_returns_empty_ok() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(
            Request::options("/exec")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let (app, storage) = test_app().await;
    let request = Request::post("/exec")
        .header(header::CONTENT_LENGTH, MAX_ENTRY_BODY_BYTES + 1)
        .body(Body::from(vec![b'x'; MAX_ENTRY_BODY_BYTES + 1]))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(storage.list_sheet_rows().await.expect("rows").is_empty());
}

#[tokio::test]
async fn healthz_is_plain_ok() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn healthz_reports_closed_storage() {
    let (app, storage) = test_app().await;
    storage.pool().close().await;

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
