pub mod fake;
pub mod fallback;
pub mod orchestrator;
pub mod prompts;
pub mod provider;

pub use orchestrator::{
    AnalysisOrchestrator, AnalysisOutcome, BundleSource, FetchState, ProgressReporter,
};
pub use provider::{AnalysisProvider, LlmAnalysisProvider};

use crate::config::{ProviderKind, Settings};
use crate::llm::anthropic::AnthropicClient;
use crate::llm::gemini::GeminiClient;
use std::sync::Arc;

/// Builds the provider named by `ANALYSIS_PROVIDER`.
pub fn provider_from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn AnalysisProvider>> {
    let provider: Arc<dyn AnalysisProvider> = match settings.analysis_provider {
        ProviderKind::Gemini => Arc::new(LlmAnalysisProvider::new(Arc::new(
            GeminiClient::from_settings(settings)?,
        ))),
        ProviderKind::Anthropic => Arc::new(LlmAnalysisProvider::new(Arc::new(
            AnthropicClient::from_settings(settings)?,
        ))),
        ProviderKind::Fake => Arc::new(fake::FakeAnalysisProvider::new()),
    };
    Ok(provider)
}
