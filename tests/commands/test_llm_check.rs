//! Tests for llm-check command

use httpmock::prelude::*;
use serde_json::json;
use tg_accounts::commands::llm_check;

#[tokio::test]
async fn test_llm_check_sends_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/api/v1/chat/completions")
            .header("Authorization", "Bearer token-1");
        then.status(200).json_body(json!({ "result": "Hi!" }));
    });

    let answer = llm_check::run(&server.url("/api/v1/chat/completions"), Some("token-1".into()))
        .await
        .unwrap();

    assert_eq!(answer, "Hi!");
    mock.assert_calls(1);
}

#[tokio::test]
async fn test_llm_check_reports_server_errors() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST);
        then.status(502).body("bad gateway");
    });

    let err = llm_check::run(&server.url("/x"), None).await.unwrap_err();
    assert!(err.to_string().contains("502"));
}
