use crate::analysis::provider::AnalysisProvider;
use crate::domain::analysis::{
    CompanyProfile, Decision, DecisionPerspective, DecisionType, NewsItem, NewsSentimentResult,
    Platform, PriceData, Sentiment, SocialPost, VerifiedSocialResult,
};
use crate::domain::company::{seed_companies, Company};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Profile,
    News,
    XPosts,
    RedditPosts,
    VerifySocial,
    Decision,
    Prices,
    FindCompany,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: HashMap<Operation, usize>,
    failing: HashSet<Operation>,
}

/// Deterministic provider with canned answers, call counters and failure injection.
#[derive(Debug)]
pub struct FakeAnalysisProvider {
    state: Mutex<FakeState>,
    known_companies: Vec<Company>,
}

impl Default for FakeAnalysisProvider {
    fn default() -> Self {
        let mut known_companies = seed_companies();
        known_companies.push(Company::new(
            "NFLX",
            "Netflix, Inc.",
            "https://companiesmarketcap.com/img/company-logos/64/NFLX.png",
        ));
        Self {
            state: Mutex::new(FakeState::default()),
            known_companies,
        }
    }
}

impl FakeAnalysisProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail.
    pub fn fail_on(&self, op: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(op);
        }
    }

    pub fn recover(&self, op: Operation) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.remove(&op);
        }
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.get(&op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.calls.values().sum())
            .unwrap_or(0)
    }

    fn record(&self, op: Operation) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("fake provider state poisoned"))?;
        *state.calls.entry(op).or_default() += 1;
        if state.failing.contains(&op) {
            anyhow::bail!("injected failure for {op:?}");
        }
        Ok(())
    }

    fn post(platform: Platform, author: &str, content: String) -> SocialPost {
        SocialPost {
            platform,
            author: author.to_string(),
            content,
            url: None,
        }
    }
}

#[async_trait::async_trait]
impl AnalysisProvider for FakeAnalysisProvider {
    fn provider_name(&self) -> &'static str {
        "fake"
    }

    async fn company_profile(&self, company: &Company, _model: &str) -> Result<CompanyProfile> {
        self.record(Operation::Profile)?;
        Ok(CompanyProfile {
            summary: format!("{} ({}) is a company under test.", company.name, company.ticker),
        })
    }

    async fn news_and_sentiment(
        &self,
        company: &Company,
        _model: &str,
    ) -> Result<NewsSentimentResult> {
        self.record(Operation::News)?;
        Ok(NewsSentimentResult {
            headlines: vec![
                NewsItem::new(
                    format!("{} beats quarterly estimates", company.name),
                    "Reuters",
                    "Revenue and subscribers came in above consensus.",
                ),
                NewsItem::new(
                    format!("{} announces price increase", company.name),
                    "Bloomberg",
                    "Higher prices take effect next month.",
                ),
            ],
            sentiment: Sentiment::Positive,
        })
    }

    async fn social_posts(
        &self,
        company: &Company,
        platform: Platform,
        _model: &str,
    ) -> Result<Vec<SocialPost>> {
        let op = match platform {
            Platform::Reddit => Operation::RedditPosts,
            _ => Operation::XPosts,
        };
        self.record(op)?;
        Ok(vec![
            Self::post(platform, "@bull", format!("{} looks strong into earnings.", company.ticker)),
            Self::post(platform, "@bear", format!("{} is priced for perfection.", company.ticker)),
        ])
    }

    async fn verify_social(
        &self,
        _company: &Company,
        x_posts: &[SocialPost],
        reddit_posts: &[SocialPost],
        _model: &str,
    ) -> Result<VerifiedSocialResult> {
        self.record(Operation::VerifySocial)?;
        let posts = x_posts
            .iter()
            .chain(reddit_posts.iter())
            .take(5)
            .cloned()
            .collect();
        Ok(VerifiedSocialResult {
            posts,
            sentiment: Sentiment::Positive,
            verification_summary: "X and Reddit broadly agree.".to_string(),
        })
    }

    async fn trading_decision(
        &self,
        company: &Company,
        news_sentiment: Sentiment,
        social: &VerifiedSocialResult,
        _model: &str,
    ) -> Result<Decision> {
        self.record(Operation::Decision)?;
        let decision = match (news_sentiment, social.sentiment) {
            (Sentiment::Positive, Sentiment::Positive) => DecisionType::Buy,
            (Sentiment::Negative, Sentiment::Negative) => DecisionType::Sell,
            _ => DecisionType::Hold,
        };
        Ok(Decision {
            decision,
            rationale: format!("News and social signals for {} line up.", company.ticker),
            perspectives: [
                DecisionPerspective {
                    name: "Growth Analyst".to_string(),
                    decision,
                    rationale: "Momentum is intact.".to_string(),
                },
                DecisionPerspective {
                    name: "Value Analyst".to_string(),
                    decision: DecisionType::Hold,
                    rationale: "Valuation is full.".to_string(),
                },
            ],
        })
    }

    async fn price_history(&self, _company: &Company, _model: &str) -> Result<Vec<PriceData>> {
        self.record(Operation::Prices)?;
        Ok((1..=30)
            .map(|day| PriceData {
                name: format!("Day {day}"),
                price: 100.0 + f64::from(day),
            })
            .collect())
    }

    async fn find_company(&self, query: &str, _model: &str) -> Result<Option<Company>> {
        self.record(Operation::FindCompany)?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        Ok(self
            .known_companies
            .iter()
            .find(|c| c.ticker.to_lowercase() == needle || c.name.to_lowercase().contains(&needle))
            .cloned())
    }
}
