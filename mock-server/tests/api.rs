use std::io::Read;

use axum::http::{self, Request, StatusCode};
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use mock_server::{app, ERR_NOT_AUTHENTICATED, ERR_UNKNOWN_METHOD, HOST_ID, PASSWORD};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).unwrap()
}

fn rpc_request(id: u64, method: &str, params: Value, cookie: Option<&str>) -> Request<String> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/json")
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(http::header::COOKIE, cookie);
    }
    let body = json!({"id": id, "method": method, "params": params}).to_string();
    builder.body(body).unwrap()
}

fn set_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get(http::header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

// --- protocol ---

#[tokio::test]
async fn list_methods_without_login() {
    let resp = app()
        .oneshot(rpc_request(0, "system.listMethods", json!([]), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["id"], 0);
    assert!(body["error"].is_null());
    assert!(body["result"]
        .as_array()
        .unwrap()
        .contains(&json!("web.update_ui")));
}

#[tokio::test]
async fn unknown_method_returns_error_object() {
    let resp = app()
        .oneshot(rpc_request(7, "foo.bar", json!([]), None))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["id"], 7);
    assert!(body["result"].is_null());
    assert_eq!(body["error"]["code"], ERR_UNKNOWN_METHOD);
    assert_eq!(body["error"]["message"], "Unknown method");
}

#[tokio::test]
async fn protected_method_without_session_is_rejected() {
    let resp = app()
        .oneshot(rpc_request(0, "web.get_hosts", json!([]), None))
        .await
        .unwrap();

    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], ERR_NOT_AUTHENTICATED);
}

#[tokio::test]
async fn malformed_body_returns_400() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/json")
                .body("not json".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gzip_is_used_when_accepted() {
    let request = Request::builder()
        .method("POST")
        .uri("/json")
        .header(http::header::ACCEPT_ENCODING, "gzip;q=1.0, compress;q=0.5")
        .body(json!({"id": 0, "method": "auth.check_session", "params": []}).to_string())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();

    assert_eq!(
        resp.headers().get(http::header::CONTENT_ENCODING).unwrap(),
        "gzip"
    );
    let compressed = body_bytes(resp).await;
    let mut text = String::new();
    GzDecoder::new(&compressed[..]).read_to_string(&mut text).unwrap();
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["result"], false);
}

// --- auth ---

#[tokio::test]
async fn login_with_wrong_password_returns_false() {
    let resp = app()
        .oneshot(rpc_request(0, "auth.login", json!(["wrong"]), None))
        .await
        .unwrap();

    assert!(set_cookie(&resp).is_none());
    let body = body_json(resp).await;
    assert_eq!(body["result"], false);
}

// --- full session lifecycle ---

#[tokio::test]
async fn session_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // login
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(0, "auth.login", json!([PASSWORD]), None))
        .await
        .unwrap();
    let cookie = set_cookie(&resp).expect("login sets a session cookie");
    assert!(cookie.starts_with("_session_id="));
    let cookie = cookie.split(';').next().unwrap().to_string();
    assert_eq!(body_json(resp).await["result"], true);

    // check session with the cookie
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(1, "auth.check_session", json!([]), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["result"], true);

    // hosts
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(2, "web.get_hosts", json!([]), Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["result"][0][0], HOST_ID);
    assert_eq!(body["result"][0][3], "Online");

    // connect returns null
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(3, "web.connect", json!([HOST_ID]), Some(&cookie)))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert!(body["result"].is_null());
    assert!(body["error"].is_null());

    // update ui
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(
            4,
            "web.update_ui",
            json!([["name", "state"], {}]),
            Some(&cookie),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["result"]["connected"], true);
    assert_eq!(body["result"]["torrents"].as_object().unwrap().len(), 2);

    // delete session
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(5, "auth.delete_session", json!([]), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["result"], true);

    // session is gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(rpc_request(6, "auth.check_session", json!([]), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["result"], false);
}
