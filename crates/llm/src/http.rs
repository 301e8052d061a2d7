//! HTTP-based text-generation providers.
//!
//! Speaks OpenAI-compatible chat APIs (OpenAI, Google Gemini, DeepSeek, etc.)
//! and Anthropic's native Messages API. Text in, text out; no tool use.

use crate::provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, Role};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Inferred provider kind from model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
    Google,
    DeepSeek,
    /// Falls back to OpenAI-compatible format.
    Unknown,
}

impl ProviderKind {
    /// Infer provider from model name prefix.
    pub fn from_model(model: &str) -> Self {
        let m = model.to_lowercase();
        if m.starts_with("gpt-") || m.starts_with("o3-") || m.starts_with("o4-") {
            Self::OpenAi
        } else if m.starts_with("claude-") {
            Self::Anthropic
        } else if m.starts_with("gemini-") {
            Self::Google
        } else if m.starts_with("deepseek-") {
            Self::DeepSeek
        } else {
            Self::Unknown
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi | Self::Unknown => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::DeepSeek => "https://api.deepseek.com",
        }
    }
}

// ── OpenAI-compatible wire types ──

#[derive(Serialize)]
struct OaiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OaiResponse {
    choices: Vec<OaiChoice>,
    usage: Option<OaiUsage>,
}

#[derive(Deserialize)]
struct OaiChoice {
    message: OaiChoiceMessage,
}

#[derive(Deserialize)]
struct OaiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OaiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ── Anthropic Messages API wire types ──

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ── Provider ──

/// HTTP-based provider. Handles both OpenAI-compatible and Anthropic APIs.
pub struct HttpProvider {
    kind: ProviderKind,
    model: String,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProvider {
    /// Build from model name + API key + optional base URL override.
    pub fn new(model: String, api_key: String, base_url: Option<String>) -> Self {
        let kind = ProviderKind::from_model(&model);
        let base = base_url.unwrap_or_else(|| kind.default_base_url().to_owned());
        Self {
            kind,
            model,
            client: reqwest::Client::new(),
            base_url: base.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        if self.kind == ProviderKind::Anthropic {
            format!("{}/v1/messages", self.base_url)
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Map a non-success status to an error, returning RateLimited for 429.
/// Error bodies can echo the prompt, so only the status is kept.
fn check_error(status: reqwest::StatusCode) -> LlmError {
    if status.as_u16() == 429 {
        LlmError::RateLimited
    } else if status.is_server_error() {
        LlmError::Unavailable(format!("{status}"))
    } else {
        LlmError::RequestFailed(format!("{status}"))
    }
}

impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        match self.kind {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Unknown => "unknown",
        }
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        if self.kind == ProviderKind::Anthropic {
            Box::pin(self.complete_anthropic(request))
        } else {
            Box::pin(self.complete_openai(request))
        }
    }
}

impl HttpProvider {
    async fn complete_openai(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = OaiRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage { role: role_str(m.role), content: &m.content })
                .collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_len = resp.text().await.map(|t| t.len()).unwrap_or(0);
            tracing::warn!(
                provider = self.name(),
                model = %self.model,
                status = status.as_u16(),
                body_len,
                "completion request rejected"
            );
            return Err(check_error(status));
        }

        let api: OaiResponse = resp.json().await.map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content = api.choices.into_iter().next().and_then(|c| c.message.content).unwrap_or_default();
        let (input_tokens, output_tokens) =
            api.usage.map(|u| (u.prompt_tokens, u.completion_tokens)).unwrap_or((0, 0));

        tracing::debug!(
            provider = self.name(),
            model = %self.model,
            status = status.as_u16(),
            input_tokens,
            output_tokens,
            "completion received"
        );
        Ok(CompletionResponse { content, input_tokens, output_tokens })
    }

    async fn complete_anthropic(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        // Anthropic takes the system prompt at top level.
        let system = request.messages.iter().find(|m| m.role == Role::System).map(|m| m.content.as_str());
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage { role: role_str(m.role), content: &m.content })
            .collect();

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            system,
            messages,
            temperature: request.temperature,
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_len = resp.text().await.map(|t| t.len()).unwrap_or(0);
            tracing::warn!(
                provider = self.name(),
                model = %self.model,
                status = status.as_u16(),
                body_len,
                "completion request rejected"
            );
            return Err(check_error(status));
        }

        let api: AnthropicResponse = resp.json().await.map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let content: String = api
            .content
            .into_iter()
            .filter_map(|b| match b {
                AnthropicBlock::Text { text } => Some(text),
                AnthropicBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let (input_tokens, output_tokens) =
            api.usage.map(|u| (u.input_tokens, u.output_tokens)).unwrap_or((0, 0));

        tracing::debug!(
            provider = self.name(),
            model = %self.model,
            status = status.as_u16(),
            input_tokens,
            output_tokens,
            "completion received"
        );
        Ok(CompletionResponse { content, input_tokens, output_tokens })
    }
}

/// Build a provider from environment variables.
/// Reads `VELURIA_LLM_MODEL`, `VELURIA_LLM_API_KEY`, optionally `VELURIA_LLM_BASE_URL`.
/// Returns `None` if model or key is not set.
pub fn from_env() -> Option<HttpProvider> {
    let model = std::env::var("VELURIA_LLM_MODEL").ok()?;
    let api_key = std::env::var("VELURIA_LLM_API_KEY").ok()?;
    let base_url = std::env::var("VELURIA_LLM_BASE_URL").ok();
    Some(HttpProvider::new(model, api_key, base_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_provider_kinds() {
        assert_eq!(ProviderKind::from_model("gpt-4o"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("o4-mini"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("claude-sonnet-4-5"), ProviderKind::Anthropic);
        assert_eq!(ProviderKind::from_model("gemini-2.0-flash"), ProviderKind::Google);
        assert_eq!(ProviderKind::from_model("deepseek-chat"), ProviderKind::DeepSeek);
        assert_eq!(ProviderKind::from_model("llama-3"), ProviderKind::Unknown);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(ProviderKind::from_model("GPT-4o"), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_model("Claude-3-opus"), ProviderKind::Anthropic);
    }

    #[test]
    fn openai_endpoint() {
        let p = HttpProvider::new("gpt-4o".into(), "sk-test".into(), None);
        assert_eq!(p.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(p.name(), "openai");
    }

    #[test]
    fn anthropic_endpoint() {
        let p = HttpProvider::new("claude-sonnet-4-5".into(), "sk-ant-test".into(), None);
        assert_eq!(p.endpoint(), "https://api.anthropic.com/v1/messages");
        assert_eq!(p.name(), "anthropic");
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let p = HttpProvider::new("gpt-4o".into(), "sk-test".into(), Some("https://proxy.local/v1/".into()));
        assert_eq!(p.endpoint(), "https://proxy.local/v1/chat/completions");
    }

    #[test]
    fn server_errors_count_as_unavailable() {
        let err = check_error(reqwest::StatusCode::BAD_GATEWAY);
        assert!(matches!(err, LlmError::Unavailable(_)));
        let err = check_error(reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[test]
    fn client_errors_carry_only_the_status() {
        let err = check_error(reqwest::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "request failed: 400 Bad Request");
    }
}
