//! Anthropic Messages API provider.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use stepwise_core::error::ProviderError;
use stepwise_core::message::{ContentBlock, Role, Turn};
use stepwise_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const HEALTH_CHECK_MODEL: &str = "claude-3-5-haiku-20241022";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert conversation turns to Anthropic API messages.
    ///
    /// Tool-result turns are sent with the `user` role. Empty text blocks
    /// are dropped since the API rejects them.
    fn to_api_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
        turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::Assistant => "assistant",
                    Role::User | Role::ToolResult => "user",
                };
                let content = match turn.content.as_slice() {
                    [ContentBlock::Text { text }] if turn.role == Role::User => {
                        AnthropicContent::Text(text.clone())
                    }
                    blocks => AnthropicContent::Blocks(
                        blocks.iter().filter_map(Self::to_api_block).collect(),
                    ),
                };
                AnthropicMessage {
                    role: role.into(),
                    content,
                }
            })
            .collect()
    }

    fn to_api_block(block: &ContentBlock) -> Option<ApiBlock> {
        match block {
            ContentBlock::Text { text } if text.is_empty() => None,
            ContentBlock::Text { text } => Some(ApiBlock::Text { text: text.clone() }),
            ContentBlock::ToolUse { id, name, input } => Some(ApiBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some(ApiBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content.clone(),
                is_error: *is_error,
            }),
        }
    }

    /// Convert tool definitions to Anthropic format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.parameters.clone(),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.turns),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        if let Some(ref sys) = request.system {
            body["system"] = serde_json::json!(sys);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }

        body
    }

    /// Convert Anthropic API response to our ProviderResponse.
    fn response_to_provider_response(resp: AnthropicResponse) -> ProviderResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                ResponseContentBlock::Other => None,
            })
            .collect();

        ProviderResponse {
            id: resp.id,
            content,
            stop_reason: StopReason::parse(resp.stop_reason.as_deref().unwrap_or("end_turn")),
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = request.turns.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_resp: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse Anthropic response: {e}"),
            })?;

        Ok(Self::response_to_provider_response(api_resp))
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = serde_json::json!({
            "model": HEALTH_CHECK_MODEL,
            "messages": [{"role": "user", "content": "hi"}],
            "max_tokens": 1,
        });

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        // Anything but an auth rejection means the endpoint answered
        Ok(!matches!(response.status().as_u16(), 401 | 403))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: AnthropicContent,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AnthropicContent {
    Text(String),
    Blocks(Vec<ApiBlock>),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ApiBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    id: String,
    model: String,
    content: Vec<ResponseContentBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Thinking and any block types we do not act on
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn constructor() {
        let provider = AnthropicProvider::new("sk-ant-test");
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider =
            AnthropicProvider::new("sk-ant-test").with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn user_turn_is_plain_text() {
        let api_msgs = AnthropicProvider::to_api_messages(&[Turn::user("Hello")]);
        assert_eq!(api_msgs.len(), 1);
        assert_eq!(api_msgs[0].role, "user");
        assert!(matches!(&api_msgs[0].content, AnthropicContent::Text(t) if t == "Hello"));
    }

    #[test]
    fn assistant_turn_with_tool_use() {
        let turn = Turn::assistant(vec![
            ContentBlock::text("Let me look"),
            ContentBlock::ToolUse {
                id: "toolu_123".into(),
                name: "shell".into(),
                input: json!({"action": "exec", "command": "ls", "session": "s"}),
            },
        ]);

        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert_eq!(api_msgs[0].role, "assistant");
        match &api_msgs[0].content {
            AnthropicContent::Blocks(blocks) => {
                assert_eq!(blocks.len(), 2);
                match &blocks[1] {
                    ApiBlock::ToolUse { id, name, input } => {
                        assert_eq!(id, "toolu_123");
                        assert_eq!(name, "shell");
                        assert_eq!(input["command"], "ls");
                    }
                    _ => panic!("Expected tool_use block"),
                }
            }
            _ => panic!("Expected blocks content"),
        }
    }

    #[test]
    fn empty_text_blocks_are_dropped() {
        let turn = Turn::assistant(vec![
            ContentBlock::text(""),
            ContentBlock::ToolUse {
                id: "toolu_1".into(),
                name: "plan".into(),
                input: json!({}),
            },
        ]);
        match &AnthropicProvider::to_api_messages(&[turn])[0].content {
            AnthropicContent::Blocks(blocks) => assert_eq!(blocks.len(), 1),
            _ => panic!("Expected blocks content"),
        }
    }

    #[test]
    fn tool_result_turn_goes_as_user() {
        let turn = Turn::tool_result("toolu_123", r#"{"status":"error"}"#, true);
        let api_msgs = AnthropicProvider::to_api_messages(&[turn]);
        assert_eq!(api_msgs[0].role, "user");

        let json = serde_json::to_value(&api_msgs[0]).unwrap();
        assert_eq!(json["content"][0]["type"], "tool_result");
        assert_eq!(json["content"][0]["tool_use_id"], "toolu_123");
        assert_eq!(json["content"][0]["is_error"], true);
    }

    #[test]
    fn successful_tool_result_omits_is_error() {
        let turn = Turn::tool_result("toolu_9", "{}", false);
        let json = serde_json::to_value(&AnthropicProvider::to_api_messages(&[turn])[0]).unwrap();
        assert!(json["content"][0].get("is_error").is_none());
    }

    #[test]
    fn request_body_carries_system_and_tools() {
        let request = ProviderRequest {
            model: "claude-3-5-sonnet-20241022".into(),
            system: Some("You are Stepwise".into()),
            turns: vec![Turn::user("hi")],
            temperature: 0.7,
            max_tokens: 8192,
            tools: vec![ToolDefinition {
                name: "file".into(),
                description: "Read and write files".into(),
                parameters: json!({"type": "object", "properties": {}, "required": ["action", "path"]}),
            }],
        };

        let body = AnthropicProvider::request_body(&request);
        assert_eq!(body["system"], "You are Stepwise");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["tools"][0]["name"], "file");
        assert_eq!(body["tools"][0]["input_schema"]["required"][1], "path");
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-3-5-sonnet-20241022",
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.content, vec![ContentBlock::text("Hello!")]);
        assert_eq!(pr.stop_reason, StopReason::EndTurn);
        assert_eq!(pr.usage.unwrap().total_tokens, 15);
        assert_eq!(pr.model, "claude-3-5-sonnet-20241022");
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "text", "text": "Let me check"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "shell", "input": {"action": "exec", "command": "pwd", "session": "main"}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.stop_reason, StopReason::ToolUse);
        assert_eq!(pr.tool_use_count(), 1);
        match &pr.content[1] {
            ContentBlock::ToolUse { id, input, .. } => {
                assert_eq!(id, "toolu_abc");
                assert_eq!(input["command"], "pwd");
            }
            other => panic!("Expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn unknown_blocks_and_stop_reasons_are_tolerated() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_03",
                "model": "claude-3-5-sonnet-20241022",
                "content": [
                    {"type": "thinking", "thinking": "I need to consider...", "signature": "x"},
                    {"type": "text", "text": "Partial"}
                ],
                "usage": {"input_tokens": 15, "output_tokens": 25},
                "stop_reason": "max_tokens"
            }"#,
        )
        .unwrap();

        let pr = AnthropicProvider::response_to_provider_response(resp);
        assert_eq!(pr.content.len(), 1);
        assert_eq!(pr.stop_reason, StopReason::MaxTokens);
    }
}
