//! Fixed prompts and response schemas for each remote analysis call.

use crate::domain::analysis::{Platform, Sentiment, SocialPost, VerifiedSocialResult};
use crate::domain::company::Company;
use serde_json::{json, Value};

pub const TEMPERATURE_DECISION: f32 = 0.6;
pub const TEMPERATURE_NEWS: f32 = 0.7;
pub const TEMPERATURE_SOCIAL: f32 = 0.9;
pub const TEMPERATURE_VERIFY: f32 = 0.5;
pub const TEMPERATURE_PROFILE: f32 = 0.3;
pub const TEMPERATURE_LOOKUP: f32 = 0.1;
pub const TEMPERATURE_PRICES: f32 = 0.8;

const SENTIMENTS: [&str; 3] = ["Positive", "Negative", "Neutral"];
const DECISIONS: [&str; 3] = ["BUY", "SELL", "HOLD"];

fn sentiment_label(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "Positive",
        Sentiment::Negative => "Negative",
        Sentiment::Neutral => "Neutral",
    }
}

pub fn profile_prompt(company: &Company) -> String {
    format!(
        "You are a company intelligence assistant.\n\
Company: {} ({}).\n\n\
Write a concise, one-paragraph professional summary of this company covering its main \
business, its market position and its recent strategic focus.",
        company.name, company.ticker
    )
}

pub fn profile_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["summary"],
        "properties": {
            "summary": {"type": "string", "description": "One-paragraph professional summary."}
        }
    })
}

pub fn news_prompt(company: &Company) -> String {
    format!(
        "You are a news analysis assistant that only reports recent, real news from major \
financial outlets.\n\
Company: {}.\n\n\
List up to 8 recent headlines that could plausibly move this company's stock price. For each \
give the outlet, the headline and a 2-3 sentence summary, noting anything uncorroborated.\n\
Then judge the overall market sentiment (Positive, Negative or Neutral) from a critical reading \
of those headlines.",
        company.name
    )
}

pub fn news_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["headlines", "sentiment"],
        "properties": {
            "headlines": {
                "type": "array",
                "description": "Up to 8 recent, real headlines.",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["headline", "source", "summary"],
                    "properties": {
                        "headline": {"type": "string"},
                        "source": {"type": "string", "description": "News outlet, e.g. Reuters."},
                        "summary": {"type": "string"}
                    }
                }
            },
            "sentiment": {"type": "string", "enum": SENTIMENTS}
        }
    })
}

fn post_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["platform", "author", "content"],
        "properties": {
            "platform": {"type": "string", "enum": ["X", "Reddit", "Other"]},
            "author": {"type": "string", "description": "Plausible but fictional handle."},
            "content": {"type": "string"},
            "url": {
                "type": "string",
                "description": "Optional link to a search page, article or community page. Never a user profile."
            }
        }
    })
}

pub fn social_prompt(company: &Company, platform: Platform) -> String {
    let platform = platform.as_str();
    format!(
        "You are a social media analysis assistant for {platform}.\n\
Company: {}.\n\n\
Produce 7 recent, representative and plausible {platform} posts that capture the current buzz \
about this company. Invent plausible authors (never real handles) and summarize a common \
viewpoint in each post. Optionally add a relevant URL such as a platform search for the ticker, \
an article being discussed, or a community page; never link to individual users or posts.\n\
Always return content, using hypothetical but realistic examples when needed.",
        company.name
    )
}

pub fn social_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["posts"],
        "properties": {
            "posts": {
                "type": "array",
                "description": "7 representative posts.",
                "items": post_schema()
            }
        }
    })
}

pub fn verify_prompt(
    company: &Company,
    x_posts: &[SocialPost],
    reddit_posts: &[SocialPost],
) -> anyhow::Result<String> {
    Ok(format!(
        "You are a social sentiment verification assistant.\n\
Company: {}.\n\n\
X posts: {}\n\
Reddit posts: {}\n\n\
1. Compare the sentiment and topics on X and Reddit.\n\
2. Decide one verified overall sentiment (Positive, Negative or Neutral).\n\
3. Summarize the verification in one sentence: did the platforms agree, and was one more bullish?\n\
4. Pick up to 5 of the most relevant, representative posts from the combined list.",
        company.name,
        serde_json::to_string(x_posts)?,
        serde_json::to_string(reddit_posts)?,
    ))
}

pub fn verify_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["posts", "sentiment", "verificationSummary"],
        "properties": {
            "posts": {
                "type": "array",
                "description": "Up to 5 posts selected from both platforms.",
                "items": post_schema()
            },
            "sentiment": {"type": "string", "enum": SENTIMENTS},
            "verificationSummary": {"type": "string"}
        }
    })
}

pub fn decision_prompt(
    company: &Company,
    news_sentiment: Sentiment,
    social: &VerifiedSocialResult,
) -> String {
    format!(
        "You are a master trading assistant that synthesizes two analyst personas into one call.\n\n\
Company: {} ({})\n\
Recent news sentiment: {}\n\
Verified social media sentiment: {}\n\
Social media verification summary: {}\n\n\
Personas:\n\
1. Growth Analyst: follows hype, momentum and rapid-growth potential; high risk tolerance.\n\
2. Value Analyst: follows fundamentals, stability and long-term value; low risk tolerance.\n\n\
Give a decision (BUY, SELL or HOLD) and rationale for the Growth Analyst, then for the Value \
Analyst. Finally, weighing both personas and all data, give one final decision with a single \
concluding sentence of rationale.",
        company.name,
        company.ticker,
        sentiment_label(news_sentiment),
        sentiment_label(social.sentiment),
        social.verification_summary,
    )
}

pub fn decision_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["decision", "rationale", "perspectives"],
        "properties": {
            "decision": {"type": "string", "enum": DECISIONS},
            "rationale": {"type": "string", "description": "One sentence synthesizing both personas."},
            "perspectives": {
                "type": "array",
                "minItems": 2,
                "maxItems": 2,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "decision", "rationale"],
                    "properties": {
                        "name": {"type": "string"},
                        "decision": {"type": "string", "enum": DECISIONS},
                        "rationale": {"type": "string"}
                    }
                }
            }
        }
    })
}

pub fn prices_prompt(company: &Company) -> String {
    format!(
        "You are a financial data assistant.\n\
Generate a plausible 30-day daily price history for the stock with ticker {}. It should \
fluctuate like a real stock but does not need to be real data.\n\
Return 30 points, each with a \"name\" (\"Day 1\" .. \"Day 30\") and a \"price\".",
        company.ticker
    )
}

pub fn prices_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["prices"],
        "properties": {
            "prices": {
                "type": "array",
                "minItems": 30,
                "maxItems": 30,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "price"],
                    "properties": {
                        "name": {"type": "string"},
                        "price": {"type": "number"}
                    }
                }
            }
        }
    })
}

pub fn lookup_prompt(query: &str) -> String {
    format!(
        "You are a financial data assistant that identifies publicly traded companies.\n\
Query: {query:?}\n\n\
Return the official company name, its primary ticker symbol and a direct image URL for its logo \
from a reliable source such as companiesmarketcap.com.\n\
If the company or any of these fields cannot be found, return null for every field."
    )
}

pub fn lookup_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["ticker", "name", "logo"],
        "properties": {
            "ticker": {"type": ["string", "null"], "description": "Primary ticker, e.g. NFLX."},
            "name": {"type": ["string", "null"], "description": "Official name, e.g. Netflix, Inc."},
            "logo": {"type": ["string", "null"], "description": "Direct logo image URL."}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::SocialPost;

    fn netflix() -> Company {
        Company::new("NFLX", "Netflix, Inc.", "https://example.com/nflx.png")
    }

    #[test]
    fn decision_prompt_carries_both_sentiments() {
        let social = VerifiedSocialResult {
            posts: vec![],
            sentiment: Sentiment::Negative,
            verification_summary: "Reddit was more bearish than X.".to_string(),
        };
        let prompt = decision_prompt(&netflix(), Sentiment::Positive, &social);
        assert!(prompt.contains("Netflix, Inc. (NFLX)"));
        assert!(prompt.contains("Recent news sentiment: Positive"));
        assert!(prompt.contains("Verified social media sentiment: Negative"));
        assert!(prompt.contains("Reddit was more bearish than X."));
    }

    #[test]
    fn verify_prompt_embeds_posts_as_json() {
        let post = SocialPost {
            platform: Platform::X,
            author: "@a".to_string(),
            content: "bullish".to_string(),
            url: None,
        };
        let prompt = verify_prompt(&netflix(), &[post], &[]).unwrap();
        assert!(prompt.contains(r#"X posts: [{"platform":"X","author":"@a","content":"bullish"}]"#));
        assert!(prompt.contains("Reddit posts: []"));
    }

    #[test]
    fn social_prompt_names_the_platform() {
        let prompt = social_prompt(&netflix(), Platform::Reddit);
        assert!(prompt.contains("assistant for Reddit"));
        assert!(!prompt.contains("for X."));
    }
}
