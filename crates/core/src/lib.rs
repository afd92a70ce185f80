pub mod accounts;
pub mod analysis;
pub mod companies;
pub mod dashboard;
pub mod domain;
pub mod llm;
pub mod preferences;
pub mod storage;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ProviderKind {
        Gemini,
        Anthropic,
        Fake,
    }

    impl std::str::FromStr for ProviderKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "gemini" => Ok(Self::Gemini),
                "anthropic" => Ok(Self::Anthropic),
                "fake" => Ok(Self::Fake),
                other => anyhow::bail!("unknown ANALYSIS_PROVIDER: {other}"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub gemini_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub analysis_provider: ProviderKind,
        pub cache_ttl: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let analysis_provider = match std::env::var("ANALYSIS_PROVIDER") {
                Ok(s) if !s.trim().is_empty() => s.parse()?,
                _ => ProviderKind::Gemini,
            };

            let cache_ttl_secs = std::env::var("ANALYSIS_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS);

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                analysis_provider,
                cache_ttl: Duration::from_secs(cache_ttl_secs),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_provider_kind_case_insensitively() {
            assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
            assert_eq!(" anthropic ".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
            assert_eq!("FAKE".parse::<ProviderKind>().unwrap(), ProviderKind::Fake);
            assert!("openai".parse::<ProviderKind>().is_err());
        }
    }
}
