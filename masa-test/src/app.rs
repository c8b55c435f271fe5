use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, IntoHeaderName, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use masa_core::ErrorKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::util::ServiceExt;

/// In-process HTTP test client wrapping the application router.
///
/// Requests are dispatched with `tower::ServiceExt::oneshot`; no port is bound.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    pub fn get(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::GET, path)
    }

    pub fn post(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::POST, path)
    }

    pub fn put(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::PATCH, path)
    }

    pub fn delete(&self, path: &str) -> TestRequest<'_> {
        TestRequest::new(self, Method::DELETE, path)
    }
}

/// Builder for one request.
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: Method, path: &str) -> Self {
        Self {
            app,
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        self
    }

    pub fn header(mut self, name: impl IntoHeaderName, value: impl AsRef<str>) -> Self {
        self.headers.insert(name, value.as_ref().parse().unwrap());
        self
    }

    /// Send `Accept-Language`.
    pub fn locale(self, language: &str) -> Self {
        self.header(ACCEPT_LANGUAGE, language)
    }

    /// Pretend the request comes from `ip` (sets `X-Forwarded-For`).
    pub fn from_ip(self, ip: &str) -> Self {
        self.header("x-forwarded-for", ip)
    }

    /// JSON body; also sets `Content-Type`.
    pub fn json(mut self, body: &impl Serialize) -> Self {
        self.body = Some(serde_json::to_vec(body).unwrap());
        self.headers
            .insert(CONTENT_TYPE, "application/json".parse().unwrap());
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub async fn send(self) -> TestResponse {
        let body = match self.body {
            Some(b) => Body::from(b),
            None => Body::empty(),
        };
        let mut builder = Request::builder().method(self.method).uri(&self.path);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        let request = builder.body(body).unwrap();

        let response = self
            .app
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("failed to read response body")
            .to_bytes();

        TestResponse { status, headers, body }
    }
}

/// Resolve a dotted path with `[n]` indices and a trailing `len()`.
///
/// ```ignore
/// resolve_path(&body, "data.categories[0].products.len()")
/// ```
pub fn resolve_path(root: &Value, path: &str) -> Value {
    let mut current = root.clone();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        if segment == "len()" {
            let len = match &current {
                Value::Array(a) => a.len(),
                Value::Object(o) => o.len(),
                Value::String(s) => s.chars().count(),
                other => panic!("len() applied to non-collection at \"{path}\": {other}"),
            };
            current = Value::from(len);
            continue;
        }
        let (field, indices) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };
        if !field.is_empty() {
            current = current.get(field).cloned().unwrap_or(Value::Null);
        }
        for index in indices.split('[').filter(|s| !s.is_empty()) {
            let index: usize = index
                .trim_end_matches(']')
                .parse()
                .unwrap_or_else(|_| panic!("non-numeric index in JSON path \"{path}\""));
            current = current.get(index).cloned().unwrap_or(Value::Null);
        }
    }
    current
}

/// Response with status, envelope and JSON-path assertions.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn assert_ok(self) -> Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn assert_created(self) -> Self {
        self.assert_status(StatusCode::CREATED)
    }

    pub fn assert_accepted(self) -> Self {
        self.assert_status(StatusCode::ACCEPTED)
    }

    pub fn assert_unauthorized(self) -> Self {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    pub fn assert_status(self, expected: StatusCode) -> Self {
        assert_eq!(
            self.status,
            expected,
            "Expected {expected}, got {}\nBody: {}",
            self.status,
            self.text()
        );
        self
    }

    /// Assert a `{"success": true, ...}` body.
    pub fn assert_success(self) -> Self {
        self.assert_json_path("success", true)
    }

    /// Assert a tagged error of `kind` with its canonical status.
    pub fn assert_error(self, kind: ErrorKind) -> Self {
        self.assert_status(kind.status())
            .assert_json_path("success", false)
            .assert_json_path("error.code", kind.as_str())
    }

    pub fn assert_json_path(self, path: &str, expected: impl Into<Value>) -> Self {
        let root: Value = self.json();
        let actual = resolve_path(&root, path);
        let expected = expected.into();
        assert_eq!(
            actual, expected,
            "JSON path \"{path}\" assertion failed\n  Expected: {expected}\n  Actual:   {actual}\n  Body: {root}",
        );
        self
    }

    pub fn assert_json_path_fn(self, path: &str, predicate: impl FnOnce(&Value) -> bool) -> Self {
        let root: Value = self.json();
        let actual = resolve_path(&root, path);
        assert!(
            predicate(&actual),
            "JSON path \"{path}\" predicate failed\n  Value: {actual}\n  Body: {root}",
        );
        self
    }

    pub fn json_path<T: DeserializeOwned>(&self, path: &str) -> T {
        let root: Value = self.json();
        let value = resolve_path(&root, path);
        serde_json::from_value(value.clone())
            .unwrap_or_else(|e| panic!("Failed to deserialize JSON path \"{path}\": {e}\n  Value: {value}"))
    }

    /// Deserialize the envelope's `data`.
    pub fn data<T: DeserializeOwned>(&self) -> T {
        self.json_path("data")
    }

    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        let name: HeaderName = name.as_ref().parse().ok()?;
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body)
            .unwrap_or_else(|e| panic!("Failed to parse JSON: {e}\nBody: {}", self.text()))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_resolve_fields_indices_and_len() {
        let body = json!({"data": {"items": [{"name": "a"}, {"name": "b"}]}});
        assert_eq!(resolve_path(&body, "data.items[1].name"), json!("b"));
        assert_eq!(resolve_path(&body, "data.items.len()"), json!(2));
        assert_eq!(resolve_path(&body, "data.missing"), Value::Null);
    }
}
