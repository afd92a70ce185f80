use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::company::Company;

const NEWS_SEARCH_URL: &str = "https://www.google.com/search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionType {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    X,
    Reddit,
    Other,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::X => "X",
            Platform::Reddit => "Reddit",
            Platform::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub source: String,
    pub url: String,
    pub summary: String,
}

impl NewsItem {
    /// Builds an item whose url is a news search for the headline.
    pub fn new(
        headline: impl Into<String>,
        source: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        let headline = headline.into();
        let url = news_search_url(&headline);
        Self {
            headline,
            source: source.into(),
            url,
            summary: summary.into(),
        }
    }
}

/// Spaces encode as `%20`, not `+`.
pub fn news_search_url(query: &str) -> String {
    format!("{NEWS_SEARCH_URL}?q={}&tbm=nws", urlencoding::encode(query))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsSentimentResult {
    pub headlines: Vec<NewsItem>,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPost {
    pub platform: Platform,
    pub author: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedSocialResult {
    pub posts: Vec<SocialPost>,
    pub sentiment: Sentiment,
    pub verification_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionPerspective {
    pub name: String,
    pub decision: DecisionType,
    pub rationale: String,
}

/// Final call plus the two analyst personas it was synthesized from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: DecisionType,
    pub rationale: String,
    pub perspectives: [DecisionPerspective; 2],
}

/// Everything shown for one company after a fetch cycle.
///
/// A bundle is either entirely live or entirely fallback data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisBundle {
    pub company_profile: CompanyProfile,
    pub news_items: Vec<NewsItem>,
    pub social_posts: Vec<SocialPost>,
    pub verified_social_result: VerifiedSocialResult,
    pub decision: Decision,
    pub price_data: Vec<PriceData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalDecision {
    #[serde(flatten)]
    pub decision: Decision,
    pub company_ticker: String,
    pub company_name: String,
    pub company_logo: String,
    pub date: DateTime<Utc>,
}

impl HistoricalDecision {
    pub fn new(decision: Decision, company: &Company, date: DateTime<Utc>) -> Self {
        Self {
            decision,
            company_ticker: company.ticker.clone(),
            company_name: company.name.clone(),
            company_logo: company.logo.clone(),
            date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_decision() -> Decision {
        Decision {
            decision: DecisionType::Hold,
            rationale: "Mixed signals.".to_string(),
            perspectives: [
                DecisionPerspective {
                    name: "Growth Analyst".to_string(),
                    decision: DecisionType::Buy,
                    rationale: "Momentum.".to_string(),
                },
                DecisionPerspective {
                    name: "Value Analyst".to_string(),
                    decision: DecisionType::Hold,
                    rationale: "Fair value.".to_string(),
                },
            ],
        }
    }

    #[test]
    fn news_item_url_is_a_news_search_for_the_headline() {
        let item = NewsItem::new("Netflix beats estimates", "Reuters", "Summary.");
        assert!(item.url.starts_with("https://www.google.com/search?q=Netflix"));
        assert!(item.url.ends_with("&tbm=nws"));
        assert!(!item.url.contains(' '));
    }

    #[test]
    fn news_search_url_percent_encodes_spaces_and_ampersands() {
        assert_eq!(
            news_search_url("Netflix Q3 Earnings & Outlook"),
            "https://www.google.com/search?q=Netflix%20Q3%20Earnings%20%26%20Outlook&tbm=nws"
        );
    }

    #[test]
    fn historical_decision_flattens_decision_fields() {
        let company = Company::new("nflx", "Netflix, Inc.", "https://example.com/nflx.png");
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let record = HistoricalDecision::new(sample_decision(), &company, date);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["decision"], json!("HOLD"));
        assert_eq!(value["companyTicker"], json!("NFLX"));
        assert_eq!(value["perspectives"].as_array().unwrap().len(), 2);

        let back: HistoricalDecision = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn decision_rejects_wrong_perspective_count() {
        let value = json!({
            "decision": "BUY",
            "rationale": "r",
            "perspectives": [{"name": "Only", "decision": "BUY", "rationale": "r"}],
        });
        assert!(serde_json::from_value::<Decision>(value).is_err());
    }
}
