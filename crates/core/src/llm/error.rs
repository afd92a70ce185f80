use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

const EXCERPT_CHARS: usize = 500;

/// Failure of one structured call, with whatever the vendor sent back.
#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub task: &'static str,
    /// "http", "empty_response", "max_tokens" or "parse".
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// First characters of the raw model output, for logs.
    pub fn raw_output_excerpt(&self) -> Option<String> {
        let raw = self.raw_output.as_deref()?;
        let mut excerpt: String = raw.chars().take(EXCERPT_CHARS).collect();
        if raw.chars().nth(EXCERPT_CHARS).is_some() {
            excerpt.push_str("...");
        }
        Some(excerpt)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} call failed at {}: {}",
            self.provider, self.task, self.stage, self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}
