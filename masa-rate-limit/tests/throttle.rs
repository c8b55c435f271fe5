use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use masa_rate_limit::{client_key, throttle_clients, ClientThrottle};
use tower::ServiceExt;

fn app(throttle: ClientThrottle) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn_with_state(throttle, throttle_clients))
}

fn from(ip: &str) -> Request<Body> {
    Request::get("/")
        .header("x-forwarded-for", format!("{ip}, 10.0.0.1"))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn clients_over_budget_get_429() {
    let app = app(ClientThrottle::per_minute(2));

    assert_eq!(app.clone().oneshot(from("1.1.1.1")).await.unwrap().status(), StatusCode::OK);
    assert_eq!(app.clone().oneshot(from("1.1.1.1")).await.unwrap().status(), StatusCode::OK);

    let limited = app.clone().oneshot(from("1.1.1.1")).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    assert_eq!(app.oneshot(from("2.2.2.2")).await.unwrap().status(), StatusCode::OK);
}

#[test]
fn client_key_prefers_forwarded_header() {
    let request = from("203.0.113.9");
    assert_eq!(client_key(&request), "203.0.113.9");

    let request = Request::get("/").header("x-real-ip", "198.51.100.4").body(Body::empty()).unwrap();
    assert_eq!(client_key(&request), "198.51.100.4");

    let request = Request::get("/").body(Body::empty()).unwrap();
    assert_eq!(client_key(&request), "unknown");
}
