#![allow(clippy::unwrap_used)]
// Integration tests for `TuyaClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tuyamon_api::{AppCredentials, DataPoints, Error, TuyaClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, TuyaClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = TuyaClient::with_client(
        reqwest::Client::new(),
        base_url,
        AppCredentials {
            key: "app-key".into(),
            secret: "app-secret".to_string().into(),
        },
    );
    (server, client)
}

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "result": result,
        "t": 1_700_000_000_000_i64
    }))
}

fn failure(code: &str, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": false,
        "errorCode": code,
        "errorMsg": msg
    }))
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_session_for_later_calls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.user.email.password.login"))
        .respond_with(ok(json!({ "sid": "sess-123", "uid": "u1" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.location.list"))
        .and(body_string_contains("sid=sess-123"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "hunter2".to_string().into();
    client.login("me@example.com", &secret).await.unwrap();
    assert!(client.has_session());

    let locations = client.list_locations().await.unwrap();
    assert!(locations.is_empty());
}

#[tokio::test]
async fn test_login_failure_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(failure("USER_PASSWD_WRONG", "wrong password"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "nope".to_string().into();
    let result = client.login("me@example.com", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { ref message }) if message.contains("USER_PASSWD_WRONG")),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.has_session());
}

#[tokio::test]
async fn test_signature_is_sent() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("clientId=app-key"))
        .and(body_string_contains("sign="))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.list_locations().await.unwrap();
}

// ── Discovery tests ─────────────────────────────────────────────────

#[tokio::test]
async fn test_list_locations_and_devices() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.location.list"))
        .respond_with(ok(json!([
            { "groupId": 1001, "name": "Home" },
            { "groupId": "1002", "name": "Office" }
        ])))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.my.group.device.list"))
        .and(body_string_contains("gid=1001"))
        .respond_with(ok(json!([{
            "devId": "bf0123",
            "name": "Kitchen Plug",
            "productId": "pLrthS5AKLKbAQ77",
            "dpMaxTime": 1_700_000_000_000_i64
        }])))
        .mount(&server)
        .await;

    let locations = client.list_locations().await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].group_id, "1001");
    assert_eq!(locations[1].name, "Office");

    let devices = client.list_group_devices("1001").await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].dev_id, "bf0123");
    assert_eq!(devices[0].product_id, "pLrthS5AKLKbAQ77");
    assert_eq!(devices[0].dp_max_time, Some(1_700_000_000_000));
}

// ── Data point tests ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_data_points() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.device.dp.get"))
        .and(body_string_contains("devId%22%3A%22bf0123"))
        .respond_with(ok(json!({ "1": true, "4": 500, "5": 100, "6": 2300 })))
        .mount(&server)
        .await;

    let dps = client.get_data_points("1001", "bf0123").await.unwrap();
    assert_eq!(dps.get("4"), Some(&json!(500)));
    assert_eq!(dps.get("1"), Some(&json!(true)));
}

#[tokio::test]
async fn test_publish_data_points() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .and(body_string_contains("a=tuya.m.device.dp.publish"))
        .and(body_string_contains("dps%22%3A%7B%221%22%3Afalse%7D"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let mut dps = DataPoints::new();
    dps.insert("1".into(), json!(false));
    client.publish_data_points("1001", "bf0123", &dps).await.unwrap();
}

// ── Error tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_session_error_maps_to_expired() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(failure("USER_SESSION_INVALID", "session invalid"))
        .mount(&server)
        .await;

    let err = client.list_locations().await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
}

#[tokio::test]
async fn test_api_error_keeps_code() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(failure("PERMISSION_DENIED", "no access"))
        .mount(&server)
        .await;

    let err = client.get_data_points("1", "2").await.unwrap_err();
    assert!(
        matches!(err, Error::Api { code: Some(ref code), .. } if code == "PERMISSION_DENIED"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_http_error_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client.list_locations().await.unwrap_err();
    assert!(
        matches!(err, Error::Api { ref message, .. } if message.contains("maintenance")),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_locations().await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.list_locations().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body.contains("oops")));
}
