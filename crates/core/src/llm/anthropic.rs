use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::json;
use crate::llm::{LlmClient, Provider, StructuredRequest};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MODEL_FAMILY_PREFIX: &str = "claude";

const TOOL_NAME_EMIT_RESULT: &str = "emit_result";

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    /// Model ids from another vendor's catalogue fall back to the configured model.
    fn resolve_model(&self, requested: &str) -> String {
        if requested.starts_with(MODEL_FAMILY_PREFIX) {
            requested.to_string()
        } else {
            self.model.clone()
        }
    }

    async fn create_message(
        &self,
        task: &'static str,
        req: CreateMessageRequest,
    ) -> anyhow::Result<(Value, CreateMessageResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                task,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("failed to parse Anthropic response JSON: {text}"))?;
        let parsed = serde_json::from_value::<CreateMessageResponse>(raw_json.clone())
            .context("failed to decode Anthropic response into CreateMessageResponse")?;
        Ok((raw_json, parsed))
    }

    fn tools(task: &'static str, schema: Value) -> Vec<Tool> {
        vec![Tool {
            name: TOOL_NAME_EMIT_RESULT,
            description: format!("Emit the {task} result as structured JSON"),
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_RESULT,
        }
    }

    fn system_prompt() -> String {
        [
            "You are a financial analysis assistant that answers through the emit_result tool.",
            "If you answer in text instead, return ONLY valid JSON matching the tool schema.",
            "Do not wrap in markdown. Do not include any extra keys.",
        ]
        .join("\n")
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_input(res: &CreateMessageResponse) -> Option<Value> {
        res.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse { name, input } if name == TOOL_NAME_EMIT_RESULT => {
                Some(input.clone())
            }
            _ => None,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_json(&self, req: StructuredRequest) -> anyhow::Result<Value> {
        let body = CreateMessageRequest {
            model: self.resolve_model(&req.model),
            max_tokens: self.max_tokens,
            system: Some(Self::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: req.prompt,
            }],
            temperature: Some(req.temperature),
            tools: Some(Self::tools(req.task, req.schema)),
            tool_choice: Some(Self::tool_choice()),
        };

        let (raw_json, res) = self.create_message(req.task, body).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                task: req.task,
                stage: "max_tokens",
                detail: format!("output truncated at max_tokens={}", self.max_tokens),
                raw_output: Some(Self::response_text(&res)),
                raw_response_json: Some(raw_json),
            }
            .into());
        }

        // Tool output path.
        if let Some(input) = Self::response_tool_input(&res) {
            anyhow::ensure!(
                input.is_object(),
                "Anthropic tool_use.input for {} is not a JSON object",
                req.task
            );
            return Ok(input);
        }

        // Fallback to text (should be rare).
        let text = Self::response_text(&res);
        json::parse_json_object(&text).map_err(|err| {
            LlmDiagnosticsError {
                provider: Provider::Anthropic,
                task: req.task,
                stage: "parse",
                detail: format!("{err:#}"),
                raw_output: Some(text),
                raw_response_json: Some(raw_json),
            }
            .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prefers_tool_use_input() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "...", "signature": "sig"},
                {"type": "tool_use", "id": "toolu_1", "name": TOOL_NAME_EMIT_RESULT, "input": {"summary": "ok"}},
                {"type": "text", "text": "{\"summary\": \"ignored\"}"}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        assert_eq!(
            AnthropicClient::response_tool_input(&res),
            Some(json!({"summary": "ok"}))
        );
    }

    #[test]
    fn text_blocks_are_joined_when_no_tool_was_used() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "```json"},
                {"type": "text", "text": "{\"summary\": \"ok\"}\n```"}
            ]
        }))
        .unwrap();

        assert!(AnthropicClient::response_tool_input(&res).is_none());
        let text = AnthropicClient::response_text(&res);
        assert_eq!(json::parse_json_object(&text).unwrap(), json!({"summary": "ok"}));
    }

    #[test]
    fn tool_carries_task_schema() {
        let schema = json!({"type": "object", "properties": {}});
        let tools = AnthropicClient::tools("profile", schema.clone());
        assert_eq!(tools[0].input_schema, schema);
        assert!(tools[0].description.contains("profile"));
    }
}
