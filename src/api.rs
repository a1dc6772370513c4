//! # API Module
//!
//! Talks to an OpenAI compatible chat-completions endpoint on behalf of the
//! HTTP layer. Every call is a single, non-streaming round trip:
//!
//! 1. pick the [`PromptTemplate`] for the request kind,
//! 2. render the style guide and markdown into a system and a user message,
//! 3. send one completion request with the template's temperature and token cap,
//! 4. fold the outcome into a [`CompletionResult`].
//!
//! Provider failures (bad key, rate limit, connection refused, ...) are not
//! errors from this module's point of view: they come back as
//! [`CompletionResult::Failure`] carrying the provider's message. So does a
//! reply with no choices or no usage. Nothing is retried. The only hard error
//! is using an adapter that was never configured.
//!
//! # Example
//!
//! ```no_run
//! use markdown_stylist::api::{CompletionResult, LlmAdapter, LlmSettings};
//! use markdown_stylist::template::PromptTemplates;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = LlmSettings {
//!     api_key: "sk-...".to_string(),
//!     api_base: "https://api.openai.com/v1".to_string(),
//!     model: "gpt-3.5-turbo".to_string(),
//!     request_timeout_secs: 120,
//! };
//! let adapter = LlmAdapter::new(&settings, PromptTemplates::default())?;
//! match adapter.rewrite("#Title", "Always put a space after #.").await? {
//!     CompletionResult::Success { text, tokens_used } => println!("{text} ({tokens_used})"),
//!     CompletionResult::Failure { message } => eprintln!("{message}"),
//! }
//! # Ok(()) }
//! ```
use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
};
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, error, info};

use crate::{
    error::LlmError,
    template::{PromptTemplate, PromptTemplates, TemplateKind},
};

const PING_PROMPT: &str = "Say 'API test successful'";
const PING_MAX_TOKENS: u32 = 10;

/// Outcome of one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    /// Generated text, verbatim, and the provider's total token count.
    Success { text: String, tokens_used: u32 },
    /// The provider call failed; `message` is the error's display string.
    Failure { message: String },
}

/// Connection details for the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
struct Connection {
    client: Client<OpenAIConfig>,
    model: String,
}

/// Handle to the completion provider, built once at startup.
///
/// An adapter created with [`LlmAdapter::uninitialized`] answers every call
/// with [`LlmError::NotInitialized`].
#[derive(Debug, Clone)]
pub struct LlmAdapter {
    connection: Option<Connection>,
    templates: PromptTemplates,
}

impl LlmAdapter {
    /// Build a configured adapter.
    ///
    /// # Errors
    /// Fails only if the underlying HTTP client cannot be constructed.
    pub fn new(settings: &LlmSettings, templates: PromptTemplates) -> Result<Self, LlmError> {
        let client = create_client(settings)?;
        info!(
            "OpenAI client initialized for model {} at {}",
            settings.model, settings.api_base
        );
        Ok(Self {
            connection: Some(Connection {
                client,
                model: settings.model.clone(),
            }),
            templates,
        })
    }

    /// An adapter with no credentials.
    pub fn uninitialized(templates: PromptTemplates) -> Self {
        Self {
            connection: None,
            templates,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.connection.is_some()
    }

    /// Rewrite `content` so it follows `style_guide`.
    pub async fn rewrite(
        &self,
        content: &str,
        style_guide: &str,
    ) -> Result<CompletionResult, LlmError> {
        self.complete(TemplateKind::Rewrite, content, style_guide)
            .await
    }

    /// Report how well `content` follows `style_guide`.
    pub async fn analyze(
        &self,
        content: &str,
        style_guide: &str,
    ) -> Result<CompletionResult, LlmError> {
        self.complete(TemplateKind::Analyze, content, style_guide)
            .await
    }

    /// Send a tiny prompt to confirm the key, base URL and model work.
    pub async fn ping(&self) -> Result<CompletionResult, LlmError> {
        let connection = self.connection()?;
        let request = build_request(
            &connection.model,
            vec![user_message(PING_PROMPT.to_string())],
            None,
            PING_MAX_TOKENS,
        )?;
        Ok(fetch_completion(&connection.client, request).await)
    }

    async fn complete(
        &self,
        kind: TemplateKind,
        content: &str,
        style_guide: &str,
    ) -> Result<CompletionResult, LlmError> {
        let connection = self.connection()?;
        let template: &PromptTemplate = self.templates.get(kind);
        let (system_prompt, user_prompt) = template.render(style_guide, content);

        let request = build_request(
            &connection.model,
            vec![system_message(system_prompt), user_message(user_prompt)],
            Some(template.temperature),
            template.max_tokens,
        )?;

        debug!(
            "Sending {} request to {} (temperature {}, max_tokens {})",
            kind, connection.model, template.temperature, template.max_tokens
        );

        Ok(fetch_completion(&connection.client, request).await)
    }

    fn connection(&self) -> Result<&Connection, LlmError> {
        self.connection.as_ref().ok_or(LlmError::NotInitialized)
    }
}

/// Creates a new OpenAI API client from the settings.
fn create_client(settings: &LlmSettings) -> Result<Client<OpenAIConfig>, LlmError> {
    let openai_config = OpenAIConfig::new()
        .with_api_key(settings.api_key.clone())
        .with_api_base(settings.api_base.clone());

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()?;

    Ok(Client::with_config(openai_config)
        .with_http_client(http_client)
        .with_backoff(single_attempt()))
}

/// A backoff that gives up after the first failure, so 5xx and 429 replies
/// are reported instead of resent.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn system_message(content: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content),
        name: None,
    })
}

fn user_message(content: String) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(content),
        name: None,
    })
}

#[allow(deprecated)]
fn build_request(
    model: &str,
    messages: Vec<ChatCompletionRequestMessage>,
    temperature: Option<f32>,
    max_tokens: u32,
) -> Result<CreateChatCompletionRequest, LlmError> {
    let mut args = CreateChatCompletionRequestArgs::default();
    args.model(model).messages(messages).max_tokens(max_tokens);
    if let Some(temperature) = temperature {
        args.temperature(temperature);
    }
    args.build().map_err(|e| LlmError::Request(e.to_string()))
}

/// Issue the request and fold the response or error into a [`CompletionResult`].
async fn fetch_completion(
    client: &Client<OpenAIConfig>,
    request: CreateChatCompletionRequest,
) -> CompletionResult {
    match client.chat().create(request).await {
        Ok(response) => {
            let Some(choice) = response.choices.into_iter().next() else {
                error!("OpenAI API error: response contained no choices");
                return CompletionResult::Failure {
                    message: "Response contained no choices".to_string(),
                };
            };
            let Some(usage) = response.usage else {
                error!("OpenAI API error: response contained no usage");
                return CompletionResult::Failure {
                    message: "Response contained no usage".to_string(),
                };
            };
            debug!("Completion received ({} tokens)", usage.total_tokens);
            CompletionResult::Success {
                text: choice.message.content.unwrap_or_default(),
                tokens_used: usage.total_tokens,
            }
        }
        Err(err) => {
            error!("OpenAI API error: {}", err);
            CompletionResult::Failure {
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn setup() {
        let _ = tracing_subscriber::fmt::try_init();
    }

    fn mock_settings(api_base: String) -> LlmSettings {
        LlmSettings {
            api_key: "mock_api_key".to_string(),
            api_base,
            model: "mock_model".to_string(),
            request_timeout_secs: 5,
        }
    }

    fn completion_body(content: &str, total_tokens: u32) -> serde_json::Value {
        json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "mock_model",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": {
                "prompt_tokens": total_tokens - 2,
                "completion_tokens": 2,
                "total_tokens": total_tokens
            }
        })
    }

    #[tokio::test]
    async fn test_uninitialized_adapter_refuses_calls() {
        setup();
        let adapter = LlmAdapter::uninitialized(PromptTemplates::default());
        assert!(!adapter.is_configured());

        assert!(matches!(
            adapter.rewrite("# Hi", "guide").await,
            Err(LlmError::NotInitialized)
        ));
        assert!(matches!(
            adapter.analyze("# Hi", "guide").await,
            Err(LlmError::NotInitialized)
        ));
        assert!(matches!(adapter.ping().await, Err(LlmError::NotInitialized)));
    }

    #[test]
    fn test_create_client() {
        let client = create_client(&mock_settings("http://mock.api.base".to_string()));
        assert!(client.is_ok(), "Failed to create client");
    }

    #[tokio::test]
    async fn test_rewrite_returns_text_and_tokens() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_includes("\"max_tokens\":4000")
                    .body_includes("mock_model")
                    .body_includes("Always use sentence case")
                    .body_includes("#Shouting Title");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("# Shouting title", 42));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter
            .rewrite("#Shouting Title", "Always use sentence case")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            CompletionResult::Success {
                text: "# Shouting title".to_string(),
                tokens_used: 42,
            }
        );
    }

    #[tokio::test]
    async fn test_analyze_uses_analysis_budget() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_includes("\"max_tokens\":2000")
                    .body_includes("Compliance Score");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("## Compliance Score: 9/10", 100));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.analyze("Some text.", "guide").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            CompletionResult::Success {
                text: "## Compliance Score: 9/10".to_string(),
                tokens_used: 100,
            }
        );
    }

    #[tokio::test]
    async fn test_provider_error_becomes_failure() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "Incorrect API key provided: mock_api_key.",
                            "type": "invalid_request_error",
                            "param": null,
                            "code": "invalid_api_key"
                        }
                    }));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.rewrite("text", "guide").await.unwrap();

        match result {
            CompletionResult::Failure { message } => {
                assert!(message.contains("Incorrect API key provided"), "{message}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_not_retried() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(500)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "The server had an error while processing your request.",
                            "type": "server_error",
                            "param": null,
                            "code": null
                        }
                    }));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = tokio::time::timeout(
            Duration::from_secs(4),
            adapter.rewrite("text", "guide"),
        )
        .await
        .expect("a 500 should be reported without waiting on retries")
        .unwrap();

        assert!(matches!(result, CompletionResult::Failure { .. }));
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        setup();
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": {
                            "message": "Rate limit reached for requests",
                            "type": "requests",
                            "param": null,
                            "code": "rate_limit_exceeded"
                        }
                    }));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.analyze("text", "guide").await.unwrap();

        match result {
            CompletionResult::Failure { message } => {
                assert!(message.contains("Rate limit reached"), "{message}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_empty_choices_becomes_failure() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "id": "chatcmpl-123",
                        "object": "chat.completion",
                        "created": 1_700_000_000,
                        "model": "mock_model",
                        "choices": [],
                        "usage": { "prompt_tokens": 5, "completion_tokens": 0, "total_tokens": 5 }
                    }));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.rewrite("text", "guide").await.unwrap();

        assert_eq!(
            result,
            CompletionResult::Failure {
                message: "Response contained no choices".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_usage_becomes_failure() {
        setup();
        let server = MockServer::start_async().await;
        let mut body = completion_body("# Title", 10);
        body.as_object_mut().unwrap().remove("usage");
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(body);
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.rewrite("text", "guide").await.unwrap();

        assert!(matches!(result, CompletionResult::Failure { .. }));
    }

    #[test]
    fn test_single_attempt_backoff_gives_up() {
        use backoff::backoff::Backoff;

        let mut policy = single_attempt();
        assert_eq!(policy.next_backoff(), None);
    }

    #[tokio::test]
    async fn test_unreachable_provider_becomes_failure() {
        setup();
        let adapter = LlmAdapter::new(
            &mock_settings("http://127.0.0.1:1".to_string()),
            PromptTemplates::default(),
        )
        .unwrap();

        let result = adapter.analyze("text", "guide").await.unwrap();
        assert!(matches!(result, CompletionResult::Failure { .. }));
    }

    #[tokio::test]
    async fn test_ping() {
        setup();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .body_includes("API test successful")
                    .body_includes("\"max_tokens\":10");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("API test successful", 12));
            })
            .await;

        let adapter =
            LlmAdapter::new(&mock_settings(server.base_url()), PromptTemplates::default()).unwrap();
        let result = adapter.ping().await.unwrap();

        assert_eq!(
            result,
            CompletionResult::Success {
                text: "API test successful".to_string(),
                tokens_used: 12,
            }
        );
    }
}
