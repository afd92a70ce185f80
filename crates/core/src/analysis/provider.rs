use crate::analysis::prompts;
use crate::domain::analysis::{
    CompanyProfile, Decision, NewsSentimentResult, Platform, PriceData, Sentiment, SocialPost,
    VerifiedSocialResult,
};
use crate::domain::company::Company;
use crate::domain::contract::{
    LlmCompany, LlmDecision, LlmNews, LlmPrices, LlmProfile, LlmSocialPosts, LlmVerifiedSocial,
};
use crate::llm::{LlmClient, StructuredRequest};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// The remote calls an analysis cycle is made of.
#[async_trait::async_trait]
pub trait AnalysisProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn company_profile(&self, company: &Company, model: &str) -> Result<CompanyProfile>;

    async fn news_and_sentiment(
        &self,
        company: &Company,
        model: &str,
    ) -> Result<NewsSentimentResult>;

    async fn social_posts(
        &self,
        company: &Company,
        platform: Platform,
        model: &str,
    ) -> Result<Vec<SocialPost>>;

    async fn verify_social(
        &self,
        company: &Company,
        x_posts: &[SocialPost],
        reddit_posts: &[SocialPost],
        model: &str,
    ) -> Result<VerifiedSocialResult>;

    async fn trading_decision(
        &self,
        company: &Company,
        news_sentiment: Sentiment,
        social: &VerifiedSocialResult,
        model: &str,
    ) -> Result<Decision>;

    async fn price_history(&self, company: &Company, model: &str) -> Result<Vec<PriceData>>;

    /// `Ok(None)` when the service reports no matching company.
    async fn find_company(&self, query: &str, model: &str) -> Result<Option<Company>>;
}

/// Answers every call with one structured-output request to an LLM.
#[derive(Clone)]
pub struct LlmAnalysisProvider {
    llm: Arc<dyn LlmClient>,
}

impl LlmAnalysisProvider {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        task: &'static str,
        model: &str,
        prompt: String,
        schema: serde_json::Value,
        temperature: f32,
    ) -> Result<T> {
        let t0 = std::time::Instant::now();
        let value = self
            .llm
            .generate_json(StructuredRequest {
                task,
                model: model.to_string(),
                prompt,
                schema,
                temperature,
            })
            .await?;

        tracing::debug!(
            task,
            model,
            provider = ?self.llm.provider(),
            elapsed_ms = t0.elapsed().as_millis(),
            "structured LLM call finished"
        );

        serde_json::from_value::<T>(value)
            .with_context(|| format!("LLM output does not match the {task} schema"))
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for LlmAnalysisProvider {
    fn provider_name(&self) -> &'static str {
        match self.llm.provider() {
            crate::llm::Provider::Gemini => "gemini",
            crate::llm::Provider::Anthropic => "anthropic",
        }
    }

    async fn company_profile(&self, company: &Company, model: &str) -> Result<CompanyProfile> {
        let raw: LlmProfile = self
            .call(
                "profile",
                model,
                prompts::profile_prompt(company),
                prompts::profile_schema(),
                prompts::TEMPERATURE_PROFILE,
            )
            .await?;
        raw.validate_and_into_profile()
    }

    async fn news_and_sentiment(
        &self,
        company: &Company,
        model: &str,
    ) -> Result<NewsSentimentResult> {
        let raw: LlmNews = self
            .call(
                "news",
                model,
                prompts::news_prompt(company),
                prompts::news_schema(),
                prompts::TEMPERATURE_NEWS,
            )
            .await?;
        raw.validate_and_into_result()
    }

    async fn social_posts(
        &self,
        company: &Company,
        platform: Platform,
        model: &str,
    ) -> Result<Vec<SocialPost>> {
        let task = match platform {
            Platform::X => "social_x",
            Platform::Reddit => "social_reddit",
            Platform::Other => "social_other",
        };
        let raw: LlmSocialPosts = self
            .call(
                task,
                model,
                prompts::social_prompt(company, platform),
                prompts::social_schema(),
                prompts::TEMPERATURE_SOCIAL,
            )
            .await?;
        raw.validate_and_into_posts(platform)
    }

    async fn verify_social(
        &self,
        company: &Company,
        x_posts: &[SocialPost],
        reddit_posts: &[SocialPost],
        model: &str,
    ) -> Result<VerifiedSocialResult> {
        let raw: LlmVerifiedSocial = self
            .call(
                "verify_social",
                model,
                prompts::verify_prompt(company, x_posts, reddit_posts)?,
                prompts::verify_schema(),
                prompts::TEMPERATURE_VERIFY,
            )
            .await?;
        raw.validate_and_into_result()
    }

    async fn trading_decision(
        &self,
        company: &Company,
        news_sentiment: Sentiment,
        social: &VerifiedSocialResult,
        model: &str,
    ) -> Result<Decision> {
        let raw: LlmDecision = self
            .call(
                "decision",
                model,
                prompts::decision_prompt(company, news_sentiment, social),
                prompts::decision_schema(),
                prompts::TEMPERATURE_DECISION,
            )
            .await?;
        raw.validate_and_into_decision()
    }

    async fn price_history(&self, company: &Company, model: &str) -> Result<Vec<PriceData>> {
        let raw: LlmPrices = self
            .call(
                "prices",
                model,
                prompts::prices_prompt(company),
                prompts::prices_schema(),
                prompts::TEMPERATURE_PRICES,
            )
            .await?;
        raw.validate_and_into_series()
    }

    async fn find_company(&self, query: &str, model: &str) -> Result<Option<Company>> {
        let raw: LlmCompany = self
            .call(
                "find_company",
                model,
                prompts::lookup_prompt(query),
                prompts::lookup_schema(),
                prompts::TEMPERATURE_LOOKUP,
            )
            .await?;
        Ok(raw.into_company())
    }
}
