pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;

/// One structured-output call: a prompt plus the JSON schema the answer must follow.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    /// Short label used in logs and diagnostics (e.g. "news").
    pub task: &'static str,
    pub model: String,
    pub prompt: String,
    pub schema: serde_json::Value,
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Anthropic,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_json(&self, req: StructuredRequest) -> anyhow::Result<serde_json::Value>;
}
