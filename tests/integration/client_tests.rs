//! Client integration tests.
//!
//! Tests verify:
//! - Requests are signed and the mock API accepts the signature
//! - Successful responses are returned as parsed JSON
//! - API errors, empty bodies and unrecognized bodies map to the right errors
//! - Transport failures surface unchanged

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde_json::json;

use luno_client::{Client, Error, Params, Signer, USER_AGENT};

use super::test_utils::{closed_address, test_signer, MockApi, TEST_KEY, TEST_SECRET};

// =============================================================================
// Successful Requests
// =============================================================================

#[tokio::test]
async fn test_get_returns_parsed_body() {
    let api = MockApi::json(StatusCode::OK, json!({"id": "u1", "name": "Ada"})).await;

    let body = api
        .client()
        .get("/users/u1", &Params::new())
        .await
        .unwrap();

    assert_eq!(body, json!({"id": "u1", "name": "Ada"}));
}

#[tokio::test]
async fn test_get_request_shape() {
    let api = MockApi::json(StatusCode::OK, json!({"list": []})).await;

    api.client()
        .get("/users", &Params::new().with("limit", 10))
        .await
        .unwrap();

    let request = api.last_request();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/v1/users");
    assert_eq!(request.param("limit"), Some("10"));
    assert_eq!(request.param("key"), Some(TEST_KEY));
    assert_eq!(request.user_agent.as_deref(), Some(USER_AGENT));
    assert!(request.body.is_empty());
    assert!(request.param("sandbox").is_none());

    let timestamp = request.param("timestamp").unwrap();
    assert!(timestamp.ends_with('Z'));
    let parsed: DateTime<Utc> = timestamp.parse().unwrap();
    assert!((Utc::now() - parsed).num_seconds().abs() < 60);

    let sign = request.param("sign").unwrap();
    assert_eq!(sign.len(), 128);
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_post_sends_signed_json_body() {
    let api = MockApi::json(StatusCode::CREATED, json!({"id": "u2"})).await;
    let body = json!({"email": "ada@example.com", "tags": ["a", "b"]});

    let result = api
        .client()
        .post("/users", &Params::new(), Some(&body))
        .await
        .unwrap();
    assert_eq!(result, json!({"id": "u2"}));

    let request = api.last_request();
    assert_eq!(request.method, "POST");
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert_eq!(request.json_body(), body);
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_verb_helpers_use_their_methods() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = api.client();
    let body = json!({"name": "x"});

    client.put("/things/1", &Params::new(), Some(&body)).await.unwrap();
    client.patch("/things/1", &Params::new(), Some(&body)).await.unwrap();
    client.delete("/things/1", &Params::new()).await.unwrap();
    client.post("/things", &Params::new(), None).await.unwrap();

    let methods: Vec<String> = api.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec!["PUT", "PATCH", "DELETE", "POST"]);

    for request in api.requests() {
        assert_eq!(request.verify(&test_signer()), Ok(()));
    }

    let requests = api.requests();
    assert!(requests[2].body.is_empty());
    assert!(requests[3].body.is_empty());
}

#[tokio::test]
async fn test_request_accepts_method_string() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    api.client()
        .request("PATCH", "/things/1", &Params::new(), Some(&json!([1, 2])))
        .await
        .unwrap();

    let request = api.last_request();
    assert_eq!(request.method, "PATCH");
    assert_eq!(request.json_body(), json!([1, 2]));
}

#[tokio::test]
async fn test_null_body_is_sent_without_body() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    api.client()
        .post("/users", &Params::new(), Some(&serde_json::Value::Null))
        .await
        .unwrap();

    let request = api.last_request();
    assert_eq!(request.method, "POST");
    assert!(request.body.is_empty());
    assert!(request.content_type.is_none());
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_empty_route_targets_version_root() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    api.client().get("", &Params::new()).await.unwrap();

    let request = api.last_request();
    assert_eq!(request.path, "/v1");
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_special_characters_in_params_verify() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let params = Params::new()
        .with("q", "name:Ada Lovelace & co/+")
        .with("ids", json!(["a b", "c"]))
        .with("unicode", "café")
        .with("flag", true);

    api.client().get("/search", &params).await.unwrap();

    let request = api.last_request();
    assert_eq!(request.param("q"), Some("name:Ada Lovelace & co/+"));
    assert_eq!(request.params("ids"), vec!["a b", "c"]);
    assert_eq!(request.param("unicode"), Some("café"));
    assert!(request.raw_query.contains("q=name%3AAda%20Lovelace%20%26%20co%2F%2B"));
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_route_with_version_prefix_is_not_doubled() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    api.client().get("/v1/users", &Params::new()).await.unwrap();
    assert_eq!(api.last_request().path, "/v1/users");
}

#[tokio::test]
async fn test_api_version_is_configurable() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = Client::new(api.config().with_version(2)).unwrap();

    client.get("/users", &Params::new()).await.unwrap();

    let request = api.last_request();
    assert_eq!(request.path, "/v2/users");
    assert_eq!(request.verify(&Signer::new(TEST_KEY, TEST_SECRET, 2)), Ok(()));
}

#[tokio::test]
async fn test_host_with_trailing_slash() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = Client::new(api.config().with_host(format!("{}/", api.url()))).unwrap();

    client.get("/users", &Params::new()).await.unwrap();
    assert_eq!(api.last_request().path, "/v1/users");
}

#[tokio::test]
async fn test_wrong_secret_fails_verification() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    api.client().get("/users", &Params::new()).await.unwrap();

    let other = Signer::new(TEST_KEY, "another-secret", 1);
    assert!(api.last_request().verify(&other).is_err());
}

#[tokio::test]
async fn test_repeat_calls_sign_different_instants() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = api.client();

    client.get("/users", &Params::new()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    client.get("/users", &Params::new()).await.unwrap();

    let requests = api.requests();
    assert_ne!(requests[0].param("timestamp"), requests[1].param("timestamp"));
    assert_ne!(requests[0].param("sign"), requests[1].param("sign"));
}

// =============================================================================
// Sandbox
// =============================================================================

#[tokio::test]
async fn test_sandbox_flag_is_injected() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = Client::new(api.config().with_sandbox(true)).unwrap();

    client.get("/users", &Params::new()).await.unwrap();

    let request = api.last_request();
    assert_eq!(request.param("sandbox"), Some("true"));
    assert_eq!(request.verify(&test_signer()), Ok(()));
}

#[tokio::test]
async fn test_sandbox_explicit_value_wins() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;
    let client = Client::new(api.config().with_sandbox(true)).unwrap();

    client
        .get("/users", &Params::new().with("sandbox", false))
        .await
        .unwrap();

    assert_eq!(api.last_request().param("sandbox"), Some("false"));
}

// =============================================================================
// Error Responses
// =============================================================================

#[tokio::test]
async fn test_not_found_error_is_normalized() {
    let api = MockApi::json(
        StatusCode::NOT_FOUND,
        json!({"message": "x", "code": "not_found", "status": 404}),
    )
    .await;

    let err = api
        .client()
        .get("/users/missing", &Params::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "x");
    assert_eq!(err.code(), Some("not_found"));
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.origin(), Some("luno"));
}

#[tokio::test]
async fn test_api_error_keeps_extra_fields() {
    let api = MockApi::json(
        StatusCode::BAD_REQUEST,
        json!({
            "message": "Validation failed",
            "code": "validation",
            "status": 400,
            "extra": {"field": "email"},
            "request_id": "req-1"
        }),
    )
    .await;

    let err = api
        .client()
        .post("/users", &Params::new(), Some(&json!({})))
        .await
        .unwrap_err();

    assert_eq!(err.extra(), Some(&json!({"field": "email"})));
    match err {
        Error::Api(api_err) => {
            assert_eq!(api_err.fields.get("request_id"), Some(&json!("req-1")));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_response_body() {
    let api = MockApi::start(|_| (StatusCode::OK, String::new())).await;

    let err = api.client().get("/users", &Params::new()).await.unwrap_err();

    assert_eq!(err.code(), Some("empty_response"));
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn test_null_response_body_is_empty() {
    let api = MockApi::start(|_| (StatusCode::OK, "null".to_string())).await;

    let err = api.client().get("/users", &Params::new()).await.unwrap_err();

    assert!(matches!(err, Error::EmptyResponse { status: 200 }));
}

#[tokio::test]
async fn test_error_without_message_is_passed_through() {
    let api = MockApi::json(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "boom"})).await;

    let err = api.client().get("/users", &Params::new()).await.unwrap_err();

    match err {
        Error::Unrecognized { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, json!({"error": "boom"}));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Invalid Arguments
// =============================================================================

#[tokio::test]
async fn test_invalid_method_is_returned_not_sent() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    let err = api
        .client()
        .request("TRACE", "/users", &Params::new(), None)
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("invalid_argument"));
    assert_eq!(err.argument(), Some("method"));
    assert_eq!(api.request_count(), 0);
}

#[tokio::test]
async fn test_invalid_body_is_returned_not_sent() {
    let api = MockApi::json(StatusCode::OK, json!({"ok": true})).await;

    let err = api
        .client()
        .put("/users/1", &Params::new(), Some(&json!(42)))
        .await
        .unwrap_err();

    assert_eq!(err.argument(), Some("body"));
    assert_eq!(api.request_count(), 0);
}

#[test]
fn test_construction_requires_credentials() {
    for (key, secret, missing) in [("", "s", "key"), ("k", "", "secret")] {
        let err = Client::new(luno_client::Config::new(key, secret)).unwrap_err();
        assert_eq!(err.code(), Some("invalid_argument"));
        assert_eq!(err.argument(), Some(missing));
    }
}

// =============================================================================
// Transport Failures
// =============================================================================

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let addr = closed_address().await;
    let client = Client::new(
        luno_client::Config::new(TEST_KEY, TEST_SECRET).with_host(format!("http://{}", addr)),
    )
    .unwrap();

    let err = client.get("/users", &Params::new()).await.unwrap_err();

    match &err {
        Error::Transport(inner) => assert!(inner.is_connect() || inner.is_request()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.origin().is_none());
    assert!(err.code().is_none());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let api = MockApi::start_with_delay(Duration::from_millis(500), |_| {
        (StatusCode::OK, json!({"ok": true}).to_string())
    })
    .await;
    let client = Client::new(api.config().with_timeout(Duration::from_millis(50))).unwrap();

    let err = client.get("/slow", &Params::new()).await.unwrap_err();

    match err {
        Error::Transport(inner) => assert!(inner.is_timeout()),
        other => panic!("unexpected error: {:?}", other),
    }
}
