//! HTTP client for a chat-completions style LLM endpoint
//! (text-generation-webui, Ollama's OpenAI API, OpenAI itself).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::{Error, Result};

/// Max characters of an error body kept in error messages
const ERROR_BODY_LIMIT: usize = 200;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const CHECK_MAX_TOKENS: u32 = 50;

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for Sampling {
    fn from(config: &LlmConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

/// LLM endpoint client.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl LlmClient {
    /// Create client for `api_url`; `api_key` is sent as a bearer token.
    pub fn new<S: Into<String>>(api_url: S, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(Error::InvalidArgument("LLM api_url is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent(concat!("tg_accounts/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            config.api_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Send the conversation and return the model's answer.
    pub async fn chat_completion(&self, messages: &[ChatMessage], sampling: Sampling) -> Result<String> {
        let request = CompletionRequest {
            messages,
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_tokens,
        };

        let mut builder = self.http.post(&self.api_url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.request_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.request_error(e))?;

        if !status.is_success() {
            return Err(Error::Llm(format!(
                "status {}: {}",
                status.as_u16(),
                truncate(&text, ERROR_BODY_LIMIT)
            )));
        }

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Llm(format!("Invalid response: {}", e)))?;
        parse_completion(&body)
    }

    /// One system prompt plus one user message.
    pub async fn ask(&self, system_prompt: &str, user_message: &str, sampling: Sampling) -> Result<String> {
        let messages = [ChatMessage::system(system_prompt), ChatMessage::user(user_message)];
        self.chat_completion(&messages, sampling).await
    }

    fn request_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Llm(format!(
                "request timed out (>{}s)",
                self.timeout.as_secs()
            ))
        } else {
            Error::Llm(format!("request failed: {}", err))
        }
    }
}

/// Extract the answer from either an OpenAI-compatible body
/// (`choices[0].message.content`) or a plain `{"result": "..."}` body.
pub fn parse_completion(body: &Value) -> Result<String> {
    if let Some(first) = body
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        let choice: Choice = serde_json::from_value(first.clone())?;
        return Ok(choice
            .message
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default());
    }

    if let Some(result) = body.get("result").and_then(Value::as_str) {
        return Ok(result.trim().to_string());
    }

    Err(Error::Llm(format!(
        "unexpected response format: {}",
        truncate(&body.to_string(), ERROR_BODY_LIMIT)
    )))
}

/// Send a short greeting to an endpoint and return the answer.
pub async fn check_connection(api_url: &str, api_key: Option<String>) -> Result<String> {
    let client = LlmClient::new(api_url, api_key, CHECK_TIMEOUT)?;
    let sampling = Sampling {
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: CHECK_MAX_TOKENS,
    };
    client
        .ask("You are a test assistant.", "Hello!", sampling)
        .await
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const SAMPLING: Sampling = Sampling {
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: 500,
    };

    fn client(server: &MockServer, api_key: Option<&str>) -> LlmClient {
        LlmClient::new(
            server.url("/v1/chat/completions"),
            api_key.map(String::from),
            Duration::from_secs(5),
        )
        .expect("client")
    }

    #[test]
    fn new_rejects_empty_url() {
        let err = LlmClient::new("  ", None, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn parse_completion_reads_openai_format() {
        let body = json!({ "choices": [ { "message": { "role": "assistant", "content": "  Hi!\n" } } ] });
        assert_eq!(parse_completion(&body).unwrap(), "Hi!");
    }

    #[test]
    fn parse_completion_reads_result_format() {
        let body = json!({ "result": " plain answer " });
        assert_eq!(parse_completion(&body).unwrap(), "plain answer");
    }

    #[test]
    fn parse_completion_null_content_is_empty() {
        let body = json!({ "choices": [ { "message": { "content": null } } ] });
        assert_eq!(parse_completion(&body).unwrap(), "");
    }

    #[test]
    fn parse_completion_rejects_unknown_shapes() {
        assert!(parse_completion(&json!({ "choices": [] })).is_err());
        assert!(parse_completion(&json!({ "text": "x" })).is_err());
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("привет", 3), "при");
        assert_eq!(truncate("ok", 10), "ok");
    }

    #[tokio::test]
    async fn ask_sends_prompts_and_sampling_and_returns_answer() {
        let server = MockServer::start_async().await;

        let completion_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("Authorization", "Bearer secret")
                .is_true(|req| {
                    let body: serde_json::Value =
                        serde_json::from_slice(req.body().as_ref()).unwrap();
                    body["messages"][0]["role"] == "system"
                        && body["messages"][0]["content"] == "Be brief."
                        && body["messages"][1]["content"] == "What is Rust?"
                        && body["max_tokens"] == 500
                        && body.get("top_p").is_some()
                        && body.get("temperature").is_some()
                });
            then.status(200).json_body(json!({
                "choices": [ { "message": { "role": "assistant", "content": "A language." } } ]
            }));
        });

        let reply = client(&server, Some("secret"))
            .ask("Be brief.", "What is Rust?", SAMPLING)
            .await
            .unwrap();

        assert_eq!(reply, "A language.");
        completion_mock.assert_calls(1);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error_with_body_excerpt() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503).body("model is loading");
        });

        let err = client(&server, None)
            .ask("sys", "hi", SAMPLING)
            .await
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("model is loading"));
    }

    #[tokio::test]
    async fn invalid_json_is_an_error() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body("<html>");
        });

        let err = client(&server, None)
            .ask("sys", "hi", SAMPLING)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Invalid response"));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/slow");
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(json!({ "result": "late" }));
        });

        let client = LlmClient::new(server.url("/slow"), None, Duration::from_secs(1)).unwrap();
        let err = client.ask("sys", "hi", SAMPLING).await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn check_connection_returns_answer() {
        let server = MockServer::start_async().await;

        let greeting = server.mock(|when, then| {
            when.method(POST).path("/api").is_true(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body().as_ref()).unwrap();
                body["max_tokens"] == 50 && body["messages"][1]["content"] == "Hello!"
            });
            then.status(200).json_body(json!({ "result": "Hi there" }));
        });

        let answer = check_connection(&server.url("/api"), None).await.unwrap();

        assert_eq!(answer, "Hi there");
        greeting.assert_calls(1);
    }
}
