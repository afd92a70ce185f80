//! Static demo-mode data used when a live analysis cycle fails.

use crate::domain::analysis::{
    AnalysisBundle, CompanyProfile, Decision, DecisionPerspective, DecisionType, NewsItem,
    Platform, PriceData, Sentiment, SocialPost, VerifiedSocialResult,
};
use crate::domain::company::Company;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEMO_MODE_MESSAGE: &str =
    "The AI bots encountered an error. This might be due to API rate limits.";

const PRICE_FLOOR: f64 = 50.0;

/// Full fallback bundle for a company. Deterministic per ticker.
pub fn fallback_bundle(company: &Company) -> AnalysisBundle {
    let verified = verified_social(&company.name);
    AnalysisBundle {
        company_profile: profile(&company.name),
        news_items: news(&company.name),
        social_posts: verified.posts.clone(),
        verified_social_result: verified,
        decision: decision(ticker_seed(&company.ticker)),
        price_data: price_series(ticker_seed(&company.ticker)),
    }
}

fn ticker_seed(ticker: &str) -> u64 {
    // FNV-1a
    ticker.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn profile(name: &str) -> CompanyProfile {
    CompanyProfile {
        summary: format!(
            "This is a sample profile for {name}. In a live environment this summary gives a \
professional overview of the company's main business, its position in the market and its recent \
strategic focus, so traders get a quick snapshot of the fundamentals without leaving the dashboard."
        ),
    }
}

fn news(name: &str) -> Vec<NewsItem> {
    vec![
        NewsItem::new(
            format!("{name} Unveils Next-Generation Product Line to High Praise"),
            "Tech Weekly",
            "The company revealed its new flagship products today to positive early reviews for their features and design.",
        ),
        NewsItem::new(
            format!("Analysts Raise Price Target for {name} Stock"),
            "Finance Today",
            "After a strong earnings report several analysts upgraded their rating, citing robust growth and market leadership.",
        ),
        NewsItem::new(
            "Regulatory Scrutiny Looms Over Tech Sector",
            "Global News",
            "Governments are discussing new rules that could affect major technology companies, adding market uncertainty.",
        ),
        NewsItem::new(
            format!("{name} Expands into New International Markets"),
            "Business Insider",
            "A strategic expansion into several key international markets aims at new revenue streams and global share.",
        ),
        NewsItem::new(
            "Supply Chain Issues Continue to Challenge Production",
            "Reuters",
            "Ongoing global supply chain disruptions are straining production lines and may affect future inventory.",
        ),
        NewsItem::new(
            format!("Partnership with AutoMaker to Bring {name} Tech to Cars"),
            "The Verge",
            "A landmark partnership will bring the company's software ecosystem to the next generation of connected vehicles.",
        ),
        NewsItem::new(
            "Competitor Launches Rival Product, Increasing Market Pressure",
            "Bloomberg",
            "A major competitor launched a product that directly challenges the company's core offerings.",
        ),
        NewsItem::new(
            format!("{name} Announces $10 Billion Stock Buyback Program"),
            "Wall Street Journal",
            "The board authorized a large buyback, signalling confidence in the company's finances and prospects.",
        ),
    ]
}

fn social_posts(name: &str) -> Vec<SocialPost> {
    let post = |platform, author: &str, content: String, url: &str| SocialPost {
        platform,
        author: author.to_string(),
        content,
        url: Some(url.to_string()),
    };
    vec![
        post(
            Platform::X,
            "@StockGuru",
            format!("Watching {name} closely this week. Looks like it's coiling for a big move. #trading"),
            "https://x.com/search?q=%23trading",
        ),
        post(
            Platform::Reddit,
            "u/DiamondHandz",
            format!("Is anyone else loading up on {name}? The fundamentals look solid."),
            "https://www.reddit.com/r/stocks/",
        ),
        post(
            Platform::X,
            "@TechObserver",
            format!("The latest feature drop from {name} is a game-changer. Competitors should be worried."),
            "https://x.com/search?q=%23technews",
        ),
        post(
            Platform::Reddit,
            "u/EconomyWatcher",
            format!("I'm a bit cautious on {name} until we see how these new regulations play out."),
            "https://www.reddit.com/r/investing/",
        ),
        post(
            Platform::X,
            "@DayTraderJane",
            format!("Seeing some bearish divergence on the {name} chart. Might be time for a pullback."),
            "https://x.com/search?q=%23daytrading",
        ),
    ]
}

fn verified_social(name: &str) -> VerifiedSocialResult {
    VerifiedSocialResult {
        posts: social_posts(name),
        sentiment: Sentiment::Positive,
        verification_summary:
            "Both X and Reddit show strong bullish sentiment, confirming positive market momentum."
                .to_string(),
    }
}

fn perspective(name: &str, decision: DecisionType, rationale: &str) -> DecisionPerspective {
    DecisionPerspective {
        name: name.to_string(),
        decision,
        rationale: rationale.to_string(),
    }
}

fn decision(seed: u64) -> Decision {
    match seed % 3 {
        0 => Decision {
            decision: DecisionType::Buy,
            rationale: "Synthesized analysis suggests a strong buy signal due to overwhelming positive sentiment and growth indicators.".to_string(),
            perspectives: [
                perspective("Growth Analyst", DecisionType::Buy, "Aggressive growth indicators and market hype point to a strong upward trajectory."),
                perspective("Value Analyst", DecisionType::Hold, "While sentiment is positive, fundamentals suggest waiting for a better entry point."),
            ],
        },
        1 => Decision {
            decision: DecisionType::Sell,
            rationale: "A combination of negative news and waning social media interest points towards a sell recommendation.".to_string(),
            perspectives: [
                perspective("Growth Analyst", DecisionType::Sell, "The negative shift in market narrative is a key indicator to exit the position."),
                perspective("Value Analyst", DecisionType::Sell, "Fundamental risks highlighted in recent news outweigh the current valuation."),
            ],
        },
        _ => Decision {
            decision: DecisionType::Hold,
            rationale: "Mixed signals from news and social media suggest a period of consolidation. It is best to hold and observe.".to_string(),
            perspectives: [
                perspective("Growth Analyst", DecisionType::Buy, "Despite some concerns, the long-term growth story remains intact."),
                perspective("Value Analyst", DecisionType::Hold, "The risk-reward ratio is currently balanced. Holding is the most prudent action."),
            ],
        },
    }
}

/// 30-day random walk starting in 150..200, never below the floor.
fn price_series(seed: u64) -> Vec<PriceData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 150.0 + rng.gen::<f64>() * 50.0;
    let mut out = Vec::with_capacity(30);
    for day in 1..=30 {
        out.push(PriceData {
            name: format!("Day {day}"),
            price: (price * 100.0).round() / 100.0,
        });
        price += (rng.gen::<f64>() - 0.5) * 10.0;
        price = price.max(PRICE_FLOOR);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(ticker: &str) -> Company {
        Company::new(ticker, format!("{ticker} Corp."), "https://example.com/logo.png")
    }

    #[test]
    fn bundle_is_deterministic_per_ticker() {
        assert_eq!(fallback_bundle(&company("NFLX")), fallback_bundle(&company("NFLX")));
    }

    #[test]
    fn bundle_shape_matches_live_contract() {
        let bundle = fallback_bundle(&company("NFLX"));
        assert_eq!(bundle.news_items.len(), 8);
        assert_eq!(bundle.verified_social_result.posts.len(), 5);
        assert_eq!(bundle.social_posts, bundle.verified_social_result.posts);
        assert_eq!(bundle.price_data.len(), 30);
        assert_eq!(bundle.price_data[0].name, "Day 1");
        assert_eq!(bundle.price_data[29].name, "Day 30");
        assert!(bundle.price_data.iter().all(|p| p.price >= PRICE_FLOOR));
        assert!(bundle.company_profile.summary.contains("NFLX Corp."));
    }

    #[test]
    fn every_ticker_gets_one_of_the_canned_decisions() {
        for ticker in ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA", "NVDA", "NFLX"] {
            let bundle = fallback_bundle(&company(ticker));
            assert_eq!(bundle.decision.perspectives[0].name, "Growth Analyst");
            assert_eq!(bundle.decision.perspectives[1].name, "Value Analyst");
        }
    }
}
