mod common;

use common::{client_with, MockTransport};
use reqwest::StatusCode;
use routecall::contract::MethodId;
use routecall::{Args, ClientErrorKind, ClientSettings, HttpResult, RetryPolicy};
use serde::Deserialize;
use serde_json::json;

const GET: MethodId = MethodId::new("Users", "Get");
const GET_RESULT: MethodId = MethodId::new("Users", "GetResult");
const DELETE: MethodId = MethodId::new("Users", "Delete");
const GET_BLOCKING: MethodId = MethodId::new("Users", "GetBlocking");
const GET_RESULT_BLOCKING: MethodId = MethodId::new("Users", "GetResultBlocking");
const DELETE_BLOCKING: MethodId = MethodId::new("Users", "DeleteBlocking");

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

fn no_retry() -> ClientSettings {
    ClientSettings::default().with_retry(RetryPolicy::none())
}

#[tokio::test]
async fn wrapped_result_never_raises_for_404() {
    let transport = MockTransport::new();
    transport.push_json(404, json!({"error": "missing"}));
    let client = client_with(transport.clone(), no_retry());

    let result: HttpResult<User> = client
        .call_result(GET_RESULT, Args::new().arg("id", &1))
        .await
        .expect("wrapped result");
    assert_eq!(result.status, StatusCode::NOT_FOUND);
    assert_eq!(result.reason, "Not Found");
    assert!(!result.is_success());
    assert!(result.content.is_none());
    assert_eq!(&result.body[..], br#"{"error":"missing"}"#);
}

#[tokio::test]
async fn payload_shape_raises_for_404() {
    let transport = MockTransport::new();
    transport.push_json(404, json!({"error": "missing"}));
    let client = client_with(transport.clone(), no_retry());

    let err = client
        .call::<User>(GET, Args::new().arg("id", &1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ClientErrorKind::HttpStatus);
    assert_eq!(err.status, Some(404));
    assert_eq!(err.reason.as_deref(), Some("Not Found"));
    let preview = err
        .details
        .as_ref()
        .and_then(|d| d["body"].as_str())
        .unwrap_or_default();
    assert!(preview.contains("missing"));
}

#[tokio::test]
async fn payload_and_wrapped_results_decode_typed_content() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({"id": 1, "name": "Ada"}));
    transport.push_json(200, json!({"id": 2, "name": "Grace"}));
    let client = client_with(transport.clone(), no_retry());

    let user: User = client
        .call(GET, Args::new().arg("id", &1))
        .await
        .expect("user");
    assert_eq!(
        user,
        User {
            id: 1,
            name: "Ada".to_string()
        }
    );

    let result = client
        .call_result::<User>(GET_RESULT, Args::new().arg("id", &2))
        .await
        .expect("result");
    assert_eq!(result.status_code(), 200);
    assert_eq!(result.into_content().map(|u| u.name), Some("Grace".to_string()));
}

#[tokio::test]
async fn decode_failure_is_a_conversion_error() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({"unexpected": true}));
    let client = client_with(transport.clone(), no_retry());
    let err = client
        .call::<User>(GET, Args::new().arg("id", &1))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ClientErrorKind::Conversion);
    assert!(err.status.is_none());
}

#[tokio::test]
async fn empty_and_textual_bodies() {
    let transport = MockTransport::new();
    transport.push_status(200);
    transport.push_body(200, "42");
    transport.push_body(200, "not json at all");
    let client = client_with(transport.clone(), no_retry());

    let empty: Option<User> = client
        .call(GET, Args::new().arg("id", &1))
        .await
        .expect("empty");
    assert!(empty.is_none());

    let as_text: String = client
        .call(GET, Args::new().arg("id", &1))
        .await
        .expect("number as text");
    assert_eq!(as_text, "42");

    let raw: String = client
        .call(GET, Args::new().arg("id", &1))
        .await
        .expect("plain text");
    assert_eq!(raw, "not json at all");
}

#[tokio::test]
async fn unit_shape_completes_or_raises() {
    let transport = MockTransport::new();
    transport.push_status(204);
    transport.push_status(409);
    let client = client_with(transport.clone(), no_retry());

    client
        .call_unit(DELETE, Args::new().arg("id", &1))
        .await
        .expect("deleted");
    let err = client
        .call_unit(DELETE, Args::new().arg("id", &1))
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(409));
    assert_eq!(transport.last_request().method, reqwest::Method::DELETE);
}

#[tokio::test]
async fn mismatched_adapter_is_a_configuration_error() {
    let transport = MockTransport::new();
    let client = client_with(transport.clone(), no_retry());

    let err = client
        .call::<User>(GET_RESULT, Args::new().arg("id", &1))
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(err.message.contains("AsyncResult"));

    let err = client
        .call_blocking::<User>(GET, Args::new().arg("id", &1))
        .unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(transport.sends(), 0);
}

#[tokio::test]
async fn generic_invoke_applies_the_declared_converter() {
    let transport = MockTransport::new();
    transport.push_status(500);
    transport.push_status(500);
    let client = client_with(transport.clone(), no_retry());

    let err = client
        .invoke(GET, Args::new().arg("id", &1))
        .await
        .unwrap_err();
    assert!(err.is_http_status());

    let result = client
        .invoke(GET_RESULT, Args::new().arg("id", &1))
        .await
        .expect("result");
    assert_eq!(result.status_code(), 500);
}

#[test]
fn blocking_shapes_work_outside_a_runtime() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({"id": 7, "name": "Linus"}));
    transport.push_json(404, json!({"error": "gone"}));
    transport.push_status(204);
    let client = client_with(transport.clone(), no_retry());

    let user: User = client
        .call_blocking(GET_BLOCKING, Args::new().arg("id", &7))
        .expect("user");
    assert_eq!(user.id, 7);

    let result = client
        .call_result_blocking::<User>(GET_RESULT_BLOCKING, Args::new().arg("id", &8))
        .expect("result");
    assert_eq!(result.status, StatusCode::NOT_FOUND);

    client
        .call_unit_blocking(DELETE_BLOCKING, Args::new().arg("id", &9))
        .expect("deleted");
    assert_eq!(transport.sends(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_shapes_work_inside_a_multi_thread_runtime() {
    let transport = MockTransport::new();
    transport.push_json(200, json!({"id": 3, "name": "Barbara"}));
    let client = client_with(transport.clone(), no_retry());
    let user: User = client
        .call_blocking(GET_BLOCKING, Args::new().arg("id", &3))
        .expect("user");
    assert_eq!(user.name, "Barbara");
}

#[tokio::test(flavor = "current_thread")]
async fn blocking_shapes_work_inside_a_current_thread_runtime() {
    let transport = MockTransport::new();
    transport.push_status(500);
    let client = client_with(transport.clone(), no_retry());
    let err = client
        .call_unit_blocking(DELETE_BLOCKING, Args::new().arg("id", &3))
        .unwrap_err();
    assert_eq!(err.status, Some(500));
    assert_eq!(transport.sends(), 1);
}

#[tokio::test]
async fn concurrent_invocations_are_independent() {
    let transport = MockTransport::new();
    let client = client_with(transport.clone(), no_retry());
    let calls = (0..10).map(|i| {
        let client = client.clone();
        async move {
            client
                .invoke(GET_RESULT, Args::new().arg("id", &i))
                .await
                .map(|r| r.status_code())
        }
    });
    let statuses = futures::future::join_all(calls).await;
    assert!(statuses.iter().all(|s| matches!(s, Ok(200))));
    assert_eq!(transport.sends(), 10);
    assert_eq!(client.resolver().builds(), 1);
}

#[tokio::test]
async fn large_numeric_body_reads_back_as_exact_text() {
    let transport = MockTransport::new();
    transport.push_body(200, "12345678901234567890123");
    let client = client_with(transport.clone(), no_retry());
    let text: String = client
        .call(GET, Args::new().arg("id", &1))
        .await
        .expect("text");
    assert_eq!(text, "12345678901234567890123");
}
