use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use masa_core::error::{ActionError, ApiResponse, ErrorKind, FieldError};
use masa_core::i18n::MessageKey;
use masa_core::layers::localize_errors;
use tower::ServiceExt;

async fn parts(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn kinds_map_to_fixed_statuses() {
    let cases = [
        (ActionError::new(ErrorKind::Validation), StatusCode::BAD_REQUEST, "validation"),
        (ActionError::not_found(MessageKey::TableNotFound), StatusCode::NOT_FOUND, "not_found"),
        (ActionError::permission_denied(), StatusCode::FORBIDDEN, "permission_denied"),
        (ActionError::database("pool timed out"), StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        (ActionError::rate_limited(120), StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        (ActionError::unknown("boom"), StatusCode::INTERNAL_SERVER_ERROR, "unknown_error"),
    ];
    for (error, status, code) in cases {
        let (actual, body) = parts(error.into_response()).await;
        assert_eq!(actual, status);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], code);
    }
}

#[tokio::test]
async fn unauthenticated_is_401_but_permission_denied() {
    let (status, body) = parts(ActionError::unauthenticated().into_response()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "permission_denied");
}

#[tokio::test]
async fn database_details_are_not_leaked() {
    let (_, body) = parts(ActionError::database("relation \"x\" does not exist").into_response()).await;
    assert!(body["error"].get("details").is_none());
    assert_eq!(body["error"]["message"], "A database error occurred. Please try again.");
}

#[tokio::test]
async fn rate_limited_sets_retry_after() {
    let response = ActionError::rate_limited(42).into_response();
    assert_eq!(response.headers()["retry-after"], "42");
    let (_, body) = parts(response).await;
    assert_eq!(body["error"]["retry_after_secs"], 42);
}

#[tokio::test]
async fn field_errors_are_listed() {
    let error = ActionError::invalid_fields(vec![FieldError {
        field: "message".into(),
        message: "length is greater than 500".into(),
    }]);
    let (_, body) = parts(error.into_response()).await;
    assert_eq!(body["error"]["fields"][0]["field"], "message");
}

#[tokio::test]
async fn success_envelope_carries_status() {
    let (status, body) = parts(ApiResponse::created(serde_json::json!({"id": 1})).into_response()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, serde_json::json!({"success": true, "data": {"id": 1}}));
}

#[tokio::test]
async fn middleware_localizes_error_messages() {
    let app: Router = Router::new()
        .route(
            "/",
            get(|| async { ActionError::not_found(MessageKey::TableNotFound) }),
        )
        .layer(axum::middleware::from_fn(localize_errors));

    let request = Request::get("/")
        .header("accept-language", "tr-TR,tr;q=0.9")
        .body(Body::empty())
        .unwrap();
    let (status, body) = parts(app.clone().oneshot(request).await.unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Masa bulunamadı.");

    let request = Request::get("/").body(Body::empty()).unwrap();
    let (_, body) = parts(app.oneshot(request).await.unwrap()).await;
    assert_eq!(body["error"]["message"], "Table not found.");
}
