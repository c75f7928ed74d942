//! Replay the JSON test vectors stored in `test-vectors/`.
//!
//! Each auth-flow vector describes the starting tokens, an operation, the
//! scripted server responses, the requests the client must issue and the
//! tokens it must hold afterwards. Request bodies are compared as parsed JSON
//! so field order does not matter.

use std::sync::Arc;

use serde_json::Value;
use todo_client::testing::ScriptedTransport;
use todo_client::{
    json, ApiClient, ApiError, ClientConfig, HttpMethod, MemoryTokenStore, TodoItem, TokenKey,
    TokenStore, UpdateTodoItem,
};

const BASE_URL: &str = "http://localhost:5000/api";

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn opt_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Run the vector's operation, reducing its result to `Ok(())` or the error.
async fn run_operation(client: &ApiClient, operation: &Value) -> Result<(), ApiError> {
    match operation["kind"].as_str().unwrap() {
        "get_todo_lists" => client.get_todo_lists().await.map(|_| ()),
        "toggle_item" => {
            let item: TodoItem = json::decode_json(&operation["item"].to_string()).unwrap();
            client
                .update_todo_item(item.id, &UpdateTodoItem::completion_toggle(&item))
                .await
                .map(|_| ())
        }
        other => panic!("unknown operation: {other}"),
    }
}

fn check_outcome(name: &str, expected: &str, result: Result<(), ApiError>) {
    match (expected, result) {
        ("ok", Ok(())) => {}
        ("AuthExpired", Err(ApiError::AuthExpired { .. })) => {}
        (expected, Err(ApiError::HttpStatus { status, .. }))
            if expected.strip_prefix("HttpStatus:") == Some(status.to_string().as_str()) => {}
        (expected, actual) => panic!("{name}: expected {expected}, got {actual:?}"),
    }
}

// ---------------------------------------------------------------------------
// Auth flow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn auth_flow_test_vectors() {
    let raw = include_str!("../../test-vectors/auth_flow.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let store = MemoryTokenStore::new();
        if let Some(access) = case["initial_tokens"]["access"].as_str() {
            store.set(TokenKey::AccessToken, access);
        }
        if let Some(refresh) = case["initial_tokens"]["refresh"].as_str() {
            store.set(TokenKey::RefreshToken, refresh);
        }

        let transport = Arc::new(ScriptedTransport::new());
        for response in case["responses"].as_array().unwrap() {
            transport.respond(
                response["status"].as_u64().unwrap() as u16,
                response["body"].as_str().unwrap(),
            );
        }

        let client = ApiClient::new(
            ClientConfig::new(BASE_URL),
            transport.clone(),
            Arc::new(store.clone()),
        );
        let result = run_operation(&client, &case["operation"]).await;
        check_outcome(name, case["expected_outcome"].as_str().unwrap(), result);

        // Verify requests
        let requests = transport.requests();
        let expected_requests = case["expected_requests"].as_array().unwrap();
        assert_eq!(requests.len(), expected_requests.len(), "{name}: request count");
        for (i, (req, expected)) in requests.iter().zip(expected_requests).enumerate() {
            assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}[{i}]: method");
            assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}[{i}]: url");
            assert_eq!(
                req.authorization().map(str::to_string),
                opt_str(&expected["authorization"]),
                "{name}[{i}]: authorization"
            );
            let body: Value = match req.body.as_deref() {
                Some(body) => serde_json::from_str(body).unwrap(),
                None => Value::Null,
            };
            assert_eq!(body, expected["body"], "{name}[{i}]: body");
        }
        assert_eq!(transport.remaining(), 0, "{name}: unused responses");

        // Verify tokens, in memory and in storage
        let session = client.session().await;
        let expected_access = opt_str(&case["expected_tokens"]["access"]);
        let expected_refresh = opt_str(&case["expected_tokens"]["refresh"]);
        assert_eq!(session.access_token, expected_access, "{name}: access token");
        assert_eq!(session.refresh_token, expected_refresh, "{name}: refresh token");
        assert_eq!(store.get(TokenKey::AccessToken), expected_access, "{name}: stored access token");
        assert_eq!(store.get(TokenKey::RefreshToken), expected_refresh, "{name}: stored refresh token");
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

#[test]
fn decode_test_vectors() {
    let raw = include_str!("../../test-vectors/decode.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let items: Vec<TodoItem> = json::decode_body(case["body"].as_str().unwrap())
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(serde_json::to_value(&items).unwrap(), case["expected"], "{name}: decoded items");
    }
}
