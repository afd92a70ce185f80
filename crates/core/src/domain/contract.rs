use crate::domain::analysis::{
    CompanyProfile, Decision, DecisionPerspective, DecisionType, NewsItem, NewsSentimentResult,
    Platform, PriceData, Sentiment, SocialPost, VerifiedSocialResult,
};
use crate::domain::company::Company;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

pub const MAX_HEADLINES: usize = 8;
pub const MAX_VERIFIED_POSTS: usize = 5;
pub const PRICE_POINTS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProfile {
    pub summary: String,
}

impl LlmProfile {
    pub fn validate_and_into_profile(self) -> anyhow::Result<CompanyProfile> {
        let summary = self.summary.trim().to_string();
        ensure!(!summary.is_empty(), "profile summary must be non-empty");
        Ok(CompanyProfile { summary })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmNews {
    pub headlines: Vec<LlmHeadline>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmHeadline {
    pub headline: String,
    pub source: String,
    pub summary: String,
}

impl LlmNews {
    /// Drops blank headlines, caps the list and attaches search links.
    pub fn validate_and_into_result(self) -> anyhow::Result<NewsSentimentResult> {
        let headlines: Vec<NewsItem> = self
            .headlines
            .into_iter()
            .filter(|h| !h.headline.trim().is_empty())
            .take(MAX_HEADLINES)
            .map(|h| NewsItem::new(h.headline.trim(), h.source.trim(), h.summary.trim()))
            .collect();

        Ok(NewsSentimentResult {
            headlines,
            sentiment: self.sentiment,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSocialPosts {
    pub posts: Vec<LlmPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmPost {
    #[serde(default)]
    pub platform: Option<Platform>,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl LlmPost {
    fn into_post(self, platform: Platform) -> SocialPost {
        SocialPost {
            platform,
            author: self.author.trim().to_string(),
            content: self.content.trim().to_string(),
            url: self
                .url
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

impl LlmSocialPosts {
    /// Every post is attributed to the platform that was asked for.
    pub fn validate_and_into_posts(self, platform: Platform) -> anyhow::Result<Vec<SocialPost>> {
        let posts: Vec<SocialPost> = self
            .posts
            .into_iter()
            .filter(|p| !p.content.trim().is_empty())
            .map(|p| p.into_post(platform))
            .collect();
        Ok(posts)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmVerifiedSocial {
    pub posts: Vec<LlmPost>,
    pub sentiment: Sentiment,
    pub verification_summary: String,
}

impl LlmVerifiedSocial {
    pub fn validate_and_into_result(self) -> anyhow::Result<VerifiedSocialResult> {
        let verification_summary = self.verification_summary.trim().to_string();
        ensure!(
            !verification_summary.is_empty(),
            "verificationSummary must be non-empty"
        );

        let posts = self
            .posts
            .into_iter()
            .filter(|p| !p.content.trim().is_empty())
            .take(MAX_VERIFIED_POSTS)
            .map(|p| {
                let platform = p.platform.unwrap_or(Platform::Other);
                p.into_post(platform)
            })
            .collect();

        Ok(VerifiedSocialResult {
            posts,
            sentiment: self.sentiment,
            verification_summary,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmDecision {
    pub decision: DecisionType,
    pub rationale: String,
    pub perspectives: Vec<LlmPerspective>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmPerspective {
    pub name: String,
    pub decision: DecisionType,
    pub rationale: String,
}

impl LlmPerspective {
    fn validate_and_into_perspective(self) -> anyhow::Result<DecisionPerspective> {
        let name = self.name.trim().to_string();
        ensure!(!name.is_empty(), "perspective name must be non-empty");
        Ok(DecisionPerspective {
            name,
            decision: self.decision,
            rationale: self.rationale.trim().to_string(),
        })
    }
}

impl LlmDecision {
    pub fn validate_and_into_decision(self) -> anyhow::Result<Decision> {
        ensure!(
            self.perspectives.len() == 2,
            "decision must contain exactly 2 perspectives (got {})",
            self.perspectives.len()
        );
        let rationale = self.rationale.trim().to_string();
        ensure!(!rationale.is_empty(), "decision rationale must be non-empty");

        let mut perspectives = self.perspectives.into_iter();
        let (Some(first), Some(second)) = (perspectives.next(), perspectives.next()) else {
            anyhow::bail!("decision perspectives missing");
        };

        Ok(Decision {
            decision: self.decision,
            rationale,
            perspectives: [
                first.validate_and_into_perspective()?,
                second.validate_and_into_perspective()?,
            ],
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmPrices {
    pub prices: Vec<PriceData>,
}

impl LlmPrices {
    pub fn validate_and_into_series(self) -> anyhow::Result<Vec<PriceData>> {
        ensure!(
            self.prices.len() == PRICE_POINTS,
            "price series must have exactly {PRICE_POINTS} points (got {})",
            self.prices.len()
        );
        for point in &self.prices {
            ensure!(
                point.price.is_finite() && point.price > 0.0,
                "price for {} must be a positive number (got {})",
                point.name,
                point.price
            );
        }
        Ok(self.prices)
    }
}

/// Lookup answer; the service signals "not found" with null fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmCompany {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl LlmCompany {
    pub fn into_company(self) -> Option<Company> {
        let non_blank = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let ticker = non_blank(self.ticker)?;
        let name = non_blank(self.name)?;
        let logo = non_blank(self.logo)?;
        Some(Company::new(&ticker, name, logo))
    }
}
