use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use smart_devices::config::ServerConfig;
use smart_devices::db::init_in_memory;
use smart_devices::session::MemorySessionStore;
use smart_devices::storage::{BlobStore, FsBlobStore, StorageError};
use smart_devices::{build_router, ServerState};

/// 삭제는 항상 실패하고, 업로드는 `fail_put`에 따라 실패하는 오브젝트 스토리지
struct FailingBlobStore {
    fail_put: bool,
}

fn unavailable(name: &str) -> StorageError {
    StorageError::Remote {
        object: name.to_string(),
        message: "service unavailable".to_string(),
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, name: &str, _data: Vec<u8>, _content_type: &str) -> Result<String, StorageError> {
        if self.fail_put {
            return Err(unavailable(name));
        }
        Ok(format!("/images/{}", name))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        Err(unavailable(name))
    }

    fn object_name(&self, url: &str) -> Option<String> {
        url.strip_prefix("/images/").map(str::to_string)
    }
}

struct TestApp {
    router: Router,
    state: ServerState,
    _dir: tempfile::TempDir,
}

async fn setup_with(blobs: Option<Arc<dyn BlobStore>>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_in_memory().await.unwrap();
    let blobs: Arc<dyn BlobStore> = match blobs {
        Some(blobs) => blobs,
        None => Arc::new(FsBlobStore::new(dir.path(), "/images")),
    };
    let state = ServerState::new(
        pool,
        Arc::new(MemorySessionStore::new()),
        blobs,
        ServerConfig::default(),
    );
    state.clients.seed_moderator("moderator", "moderator-pw").await.unwrap();

    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

async fn setup() -> TestApp {
    setup_with(None).await
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, session: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn register_and_login(&self, username: &str) -> String {
        let (status, _) = self
            .call(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({ "username": username, "password": "pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        self.login(username, "pw").await
    }

    async fn upload_image(&self, moderator: &str, device: i64, file_name: &str, data: &[u8]) -> (StatusCode, Value) {
        let (content_type, body) = multipart_image(file_name, data);
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/catalog/{}/image", device))
            .header(header::AUTHORIZATION, format!("Bearer {}", moderator))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn create_device(&self, moderator: &str, name: &str, data_per_hour: f64) -> i64 {
        let (status, body) = self
            .call(
                Method::POST,
                "/catalog",
                Some(moderator),
                Some(json!({ "name": name, "data_per_hour": data_per_hour, "protocol": "Wi-Fi" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().unwrap()
    }
}

fn multipart_image(file_name: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "X-SMART-DEVICES-BOUNDARY";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_order_lifecycle() {
    let app = setup().await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let client = app.register_and_login("alice").await;

    let hub = app.create_device(&moderator, "Hub A", 10.0).await;
    let sensor = app.create_device(&moderator, "Sensor X", 5.0).await;

    // 카탈로그 쓰기는 모더레이터 전용
    let (status, _) = app
        .call(Method::POST, "/catalog", Some(&client), Some(json!({ "name": "Hub B" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, cart) = app.call(Method::GET, "/orders/cart", Some(&client), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart, json!({ "order_id": 0, "count": 0 }));

    app.call(Method::POST, &format!("/order-items/{}", hub), Some(&client), None).await;
    app.call(Method::POST, &format!("/order-items/{}", hub), Some(&client), None).await;
    let (status, cart) = app
        .call(Method::POST, &format!("/order-items/{}", sensor), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["count"], 3);
    let order_id = cart["order_id"].as_i64().unwrap();

    // 주소 없이 확정 불가
    let (status, body) = app
        .call(Method::PUT, &format!("/orders/{}/form", order_id), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/orders/{}", order_id),
            Some(&client),
            Some(json!({ "address": "Main st. 1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estimated_traffic"], 25.0);
    assert_eq!(body["total_traffic"], Value::Null);

    let (status, body) = app
        .call(Method::PUT, &format!("/orders/{}/form", order_id), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "formed");
    assert!(body["formed_at"].is_string());

    // 일반 클라이언트는 완료 불가
    let (status, _) = app
        .call(Method::PUT, &format!("/orders/{}/complete", order_id), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listed) = app.call(Method::GET, "/orders", Some(&moderator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(Method::PUT, &format!("/orders/{}/complete", order_id), Some(&moderator), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["moderator_name"], "moderator");
    assert!((body["total_traffic"].as_f64().unwrap() - 29.5).abs() < 1e-9);

    let (status, body) = app
        .call(Method::PUT, &format!("/orders/{}/complete", order_id), Some(&moderator), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_STATE");

    let (_, body) = app
        .call(Method::GET, &format!("/orders/{}", order_id), Some(&client), None)
        .await;
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_order_item_errors() {
    let app = setup().await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let client = app.register_and_login("bob").await;
    let bulb = app.create_device(&moderator, "Smart bulb", 1.0).await;

    // 장바구니가 없으면 404
    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/order-items/{}", bulb),
            Some(&client),
            Some(json!({ "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.call(Method::POST, &format!("/order-items/{}", bulb), Some(&client), None).await;

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/order-items/{}", bulb),
            Some(&client),
            Some(json!({ "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/order-items/{}", bulb),
            Some(&client),
            Some(json!({ "quantity": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 4);

    let (status, _) = app
        .call(Method::POST, "/order-items/not-a-number", Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.call(Method::POST, "/order-items/9999", Some(&client), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::DELETE, &format!("/order-items/{}", bulb), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, cart) = app.call(Method::GET, "/orders/cart", Some(&client), None).await;
    assert_eq!(cart["count"], 0);
}

#[tokio::test]
async fn test_auth_errors() {
    let app = setup().await;

    let (status, body) = app.call(Method::GET, "/orders/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHENTICATED");

    let (status, _) = app.call(Method::GET, "/orders/cart", Some("unknown-session"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.register_and_login("carol").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "carol", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "CONFLICT");

    let (status, _) = app
        .call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "carol", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::POST, "/auth/register", None, Some(json!({ "username": "dave" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cookie_session_and_logout() {
    let app = setup().await;
    app.register_and_login("erin").await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "username": "erin", "password": "pw" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_id="));
    assert!(cookie.contains("HttpOnly"));

    let session_cookie = cookie.split(';').next().unwrap().to_string();
    let me = Request::builder()
        .uri("/users/me")
        .header(header::COOKIE, &session_cookie)
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(me).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "erin");
    assert!(body.get("password_hash").is_none());

    let logout = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, &session_cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(logout).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let me = Request::builder()
        .uri("/users/me")
        .header(header::COOKIE, &session_cookie)
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.send(me).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_order_list_filters() {
    let app = setup().await;
    let client = app.register_and_login("frank").await;

    let (status, body) = app
        .call(Method::GET, "/orders?date_from=2024-13-01", Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");

    let (status, _) = app.call(Method::GET, "/orders?status=archived", Some(&client), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::GET,
            "/orders?status=&date_from=2024-01-01&date_to=2024-01-01",
            Some(&client),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_deleted_order_and_device_are_hidden() {
    let app = setup().await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let client = app.register_and_login("grace").await;
    let outlet = app.create_device(&moderator, "Smart outlet", 2.0).await;

    let (_, cart) = app
        .call(Method::POST, &format!("/order-items/{}", outlet), Some(&client), None)
        .await;
    let order_id = cart["order_id"].as_i64().unwrap();

    let (status, _) = app
        .call(Method::DELETE, &format!("/orders/{}", order_id), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app
        .call(Method::GET, &format!("/orders/{}", order_id), Some(&client), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .call(Method::DELETE, &format!("/catalog/{}", outlet), Some(&moderator), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.call(Method::GET, &format!("/catalog/{}", outlet), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, devices) = app.call(Method::GET, "/catalog", None, None).await;
    assert_eq!(devices, json!([]));
}

#[tokio::test]
async fn test_image_upload_and_delete() {
    let app = setup().await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let device = app.create_device(&moderator, "Motion sensor", 0.4).await;

    let (status, upload) = app.upload_image(&moderator, device, "sensor.JPG", b"fake-jpeg-bytes").await;
    assert_eq!(status, StatusCode::OK, "{}", upload);
    assert_eq!(upload["file_size"], 15);
    let file_name = upload["file_name"].as_str().unwrap();
    assert!(file_name.starts_with(&format!("device_{}_", device)));
    assert!(file_name.ends_with(".jpg"));

    let (_, stored) = app.call(Method::GET, &format!("/catalog/{}", device), None, None).await;
    assert_eq!(stored["image_url"], upload["image_url"]);

    let (status, _) = app
        .call(Method::DELETE, &format!("/catalog/{}/image", device), Some(&moderator), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, stored) = app.call(Method::GET, &format!("/catalog/{}", device), None, None).await;
    assert_eq!(stored["image_url"], Value::Null);
}

#[tokio::test]
async fn test_image_upload_failure_leaves_device_unchanged() {
    let app = setup_with(Some(Arc::new(FailingBlobStore { fail_put: true }))).await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let device = app.create_device(&moderator, "Smart hub", 7.5).await;

    let (status, body) = app.upload_image(&moderator, device, "hub.png", b"png").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "BACKING_STORE_FAILURE");
    assert!(!body["message"].as_str().unwrap().contains("unavailable"));

    let stored = app.state.catalog.get(device).await.unwrap();
    assert_eq!(stored.image_url, None);
}

#[tokio::test]
async fn test_image_delete_failure_keeps_url() {
    let app = setup_with(Some(Arc::new(FailingBlobStore { fail_put: false }))).await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let device = app.create_device(&moderator, "Smart outlet", 1.2).await;

    let (status, upload) = app.upload_image(&moderator, device, "outlet.png", b"png").await;
    assert_eq!(status, StatusCode::OK, "{}", upload);
    let image_url = upload["image_url"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::DELETE, &format!("/catalog/{}/image", device), Some(&moderator), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "BACKING_STORE_FAILURE");

    let stored = app.state.catalog.get(device).await.unwrap();
    assert_eq!(stored.image_url.as_deref(), Some(image_url.as_str()));
}

#[tokio::test]
async fn test_cors_preflight_is_ok() {
    let app = setup().await;

    for uri in ["/orders/cart", "/catalog/1", "/order-items/3"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}

#[tokio::test]
async fn test_pages() {
    let app = setup().await;
    let moderator = app.login("moderator", "moderator-pw").await;
    let client = app.register_and_login("heidi").await;
    let switch = app.create_device(&moderator, "Smart switch <3>", 0.7).await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/smart-devices");

    let (status, html) = app.call(Method::GET, "/smart-devices?search=SWITCH", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.as_str().unwrap().contains("Smart switch &lt;3&gt;"));

    let (_, count) = app.call(Method::GET, "/smart-cart/count", None, None).await;
    assert_eq!(count, json!({ "count": 0 }));

    let add = Request::builder()
        .method(Method::POST)
        .uri("/smart-cart/add")
        .header(header::AUTHORIZATION, format!("Bearer {}", client))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("device_id={}", switch)))
        .unwrap();
    let response = app.router.clone().oneshot(add).await.unwrap();
    assert_eq!(response.headers()[header::LOCATION], "/smart-cart");

    let (_, count) = app.call(Method::GET, "/smart-cart/count", Some(&client), None).await;
    assert_eq!(count, json!({ "count": 1 }));

    let (status, html) = app.call(Method::GET, "/request/9999", Some(&client), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.as_str().unwrap().contains("<h1>404</h1>"));

    let (status, _) = app.call(Method::GET, "/smart-devices/9999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
