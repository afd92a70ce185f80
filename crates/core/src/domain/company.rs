use serde::{Deserialize, Serialize};

const LOGO_BASE_URL: &str = "https://companiesmarketcap.com/img/company-logos/64";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub ticker: String,
    pub name: String,
    pub logo: String,
}

impl Company {
    pub fn new(ticker: &str, name: impl Into<String>, logo: impl Into<String>) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            name: name.into(),
            logo: logo.into(),
        }
    }
}

/// Strips an exchange prefix (`NASDAQ:NFLX`) and uppercases the symbol.
pub fn normalize_ticker(raw: &str) -> String {
    let raw = raw.trim();
    let symbol = raw.rsplit(':').next().map(str::trim).unwrap_or_default();
    if symbol.is_empty() {
        raw.to_uppercase()
    } else {
        symbol.to_uppercase()
    }
}

/// Companies offered before any search has been made.
pub fn seed_companies() -> Vec<Company> {
    [
        ("AAPL", "Apple Inc.", "AAPL"),
        ("GOOGL", "Alphabet Inc.", "GOOG"),
        ("MSFT", "Microsoft Corp.", "MSFT"),
        ("AMZN", "Amazon.com, Inc.", "AMZN"),
        ("TSLA", "Tesla, Inc.", "TSLA"),
        ("NVDA", "NVIDIA Corp.", "NVDA"),
    ]
    .into_iter()
    .map(|(ticker, name, logo)| Company::new(ticker, name, format!("{LOGO_BASE_URL}/{logo}.png")))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_exchange_prefix_and_uppercases() {
        assert_eq!(normalize_ticker("NASDAQ:nflx"), "NFLX");
        assert_eq!(normalize_ticker(" tsla "), "TSLA");
        assert_eq!(normalize_ticker("NYSE: brk.b"), "BRK.B");
    }

    #[test]
    fn normalize_keeps_input_when_suffix_is_empty() {
        assert_eq!(normalize_ticker("nflx:"), "NFLX:");
    }

    #[test]
    fn seed_list_has_unique_uppercase_tickers() {
        let seeds = seed_companies();
        assert_eq!(seeds.len(), 6);
        let mut tickers: Vec<_> = seeds.iter().map(|c| c.ticker.clone()).collect();
        tickers.sort();
        tickers.dedup();
        assert_eq!(tickers.len(), 6);
        assert!(seeds.iter().all(|c| c.ticker == c.ticker.to_uppercase()));
        assert!(seeds[0].logo.ends_with("/AAPL.png"));
    }
}
