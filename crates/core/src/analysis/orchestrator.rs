use crate::analysis::fallback::{fallback_bundle, DEMO_MODE_MESSAGE};
use crate::analysis::provider::AnalysisProvider;
use crate::domain::analysis::{AnalysisBundle, HistoricalDecision, Platform};
use crate::domain::company::Company;
use crate::llm::error::LlmDiagnosticsError;
use crate::storage::{cache, history, KvStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub const MSG_CACHE: &str = "Loading from cache...";
pub const MSG_PROFILE: &str = "Fetching company profile...";
pub const MSG_NEWS: &str = "Analyzing news headlines...";
pub const MSG_X: &str = "Scanning X (Twitter)...";
pub const MSG_REDDIT: &str = "Scanning Reddit...";
pub const MSG_PRICES: &str = "Fetching price history...";
pub const MSG_VERIFY: &str = "Verifying social sentiment...";
pub const MSG_DECISION: &str = "Bots are making a decision...";

/// Progress of one fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    Loading { message: &'static str },
    Success,
    DemoFallback,
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, state: FetchState);
}

impl ProgressReporter for () {
    fn report(&self, _state: FetchState) {}
}

impl ProgressReporter for tokio::sync::watch::Sender<FetchState> {
    fn report(&self, state: FetchState) {
        self.send_replace(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleSource {
    Cache,
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub company: Company,
    pub bundle: AnalysisBundle,
    pub source: BundleSource,
    pub demo_mode: bool,
    /// Banner text shown in demo mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn final_state(&self) -> FetchState {
        if self.demo_mode {
            FetchState::DemoFallback
        } else {
            FetchState::Success
        }
    }
}

/// Resolves analysis bundles from cache, live provider calls, or fallback data.
pub struct AnalysisOrchestrator {
    provider: Arc<dyn AnalysisProvider>,
    store: Arc<dyn KvStore>,
    cache_ttl: Duration,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn AnalysisProvider>, store: Arc<dyn KvStore>) -> Self {
        Self {
            provider,
            store,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub async fn resolve(
        &self,
        username: Option<&str>,
        company: &Company,
        model: &str,
        progress: &dyn ProgressReporter,
    ) -> AnalysisOutcome {
        self.resolve_at(username, company, model, Utc::now(), progress)
            .await
    }

    /// Never fails: every error path ends in the fallback bundle.
    pub async fn resolve_at(
        &self,
        username: Option<&str>,
        company: &Company,
        model: &str,
        now: DateTime<Utc>,
        progress: &dyn ProgressReporter,
    ) -> AnalysisOutcome {
        let ticker = company.ticker.as_str();

        match cache::read_fresh(self.store.as_ref(), ticker, now, self.cache_ttl).await {
            Ok(Some(bundle)) => {
                progress.report(FetchState::Loading { message: MSG_CACHE });
                tracing::debug!(%ticker, "analysis served from cache");
                let outcome = AnalysisOutcome {
                    company: company.clone(),
                    bundle,
                    source: BundleSource::Cache,
                    demo_mode: false,
                    error: None,
                };
                progress.report(outcome.final_state());
                return outcome;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(%ticker, error = %err, "cache entry unreadable; refetching");
            }
        }

        let outcome = match self.fetch_live(company, model, progress).await {
            Ok(bundle) => {
                if let Err(err) = cache::write(self.store.as_ref(), ticker, &bundle, now).await {
                    tracing::warn!(%ticker, error = %err, "failed to write analysis cache");
                }
                tracing::info!(
                    %ticker,
                    model,
                    provider = self.provider.provider_name(),
                    decision = ?bundle.decision.decision,
                    "live analysis finished"
                );
                AnalysisOutcome {
                    company: company.clone(),
                    bundle,
                    source: BundleSource::Live,
                    demo_mode: false,
                    error: None,
                }
            }
            Err(err) => {
                tracing::error!(
                    %ticker,
                    model,
                    provider = self.provider.provider_name(),
                    error = %format!("{err:#}"),
                    "live analysis failed; switching to demo mode"
                );
                if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                    let raw_output = diag.raw_output_excerpt().unwrap_or_default();
                    tracing::debug!(
                        task = diag.task,
                        stage = diag.stage,
                        raw_output = %raw_output,
                        "llm diagnostics"
                    );
                }
                AnalysisOutcome {
                    company: company.clone(),
                    bundle: fallback_bundle(company),
                    source: BundleSource::Fallback,
                    demo_mode: true,
                    error: Some(DEMO_MODE_MESSAGE.to_string()),
                }
            }
        };

        if let Some(username) = username {
            let record = HistoricalDecision::new(outcome.bundle.decision.clone(), company, now);
            if let Err(err) = history::append(self.store.as_ref(), username, record).await {
                tracing::warn!(%ticker, username, error = %err, "failed to append decision history");
            }
        }

        progress.report(outcome.final_state());
        outcome
    }

    async fn fetch_live(
        &self,
        company: &Company,
        model: &str,
        progress: &dyn ProgressReporter,
    ) -> anyhow::Result<AnalysisBundle> {
        let provider = self.provider.as_ref();

        for message in [MSG_PROFILE, MSG_NEWS, MSG_X, MSG_REDDIT, MSG_PRICES] {
            progress.report(FetchState::Loading { message });
        }
        let (profile, news, x_posts, reddit_posts, prices) = tokio::try_join!(
            provider.company_profile(company, model),
            provider.news_and_sentiment(company, model),
            provider.social_posts(company, Platform::X, model),
            provider.social_posts(company, Platform::Reddit, model),
            provider.price_history(company, model),
        )?;

        progress.report(FetchState::Loading { message: MSG_VERIFY });
        let verified = provider
            .verify_social(company, &x_posts, &reddit_posts, model)
            .await?;

        progress.report(FetchState::Loading {
            message: MSG_DECISION,
        });
        let decision = provider
            .trading_decision(company, news.sentiment, &verified, model)
            .await?;

        Ok(AnalysisBundle {
            company_profile: profile,
            news_items: news.headlines,
            social_posts: verified.posts.clone(),
            verified_social_result: verified,
            decision,
            price_data: prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fake::{FakeAnalysisProvider, Operation};
    use crate::domain::analysis::DecisionType;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;
    use std::sync::Mutex;

    struct Harness {
        fake: Arc<FakeAnalysisProvider>,
        store: Arc<MemoryStore>,
        orchestrator: AnalysisOrchestrator,
    }

    fn harness() -> Harness {
        let fake = Arc::new(FakeAnalysisProvider::new());
        let store = Arc::new(MemoryStore::new());
        let orchestrator = AnalysisOrchestrator::new(fake.clone(), store.clone());
        Harness {
            fake,
            store,
            orchestrator,
        }
    }

    fn netflix() -> Company {
        Company::new("NFLX", "Netflix, Inc.", "https://example.com/nflx.png")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<FetchState>>);

    impl ProgressReporter for Recorder {
        fn report(&self, state: FetchState) {
            self.0.lock().unwrap().push(state);
        }
    }

    #[tokio::test]
    async fn live_cycle_produces_two_perspectives_and_caches() {
        let h = harness();
        let outcome = h
            .orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
            .await;

        assert_eq!(outcome.source, BundleSource::Live);
        assert!(!outcome.demo_mode);
        assert_eq!(outcome.bundle.decision.perspectives.len(), 2);
        assert!(matches!(
            outcome.bundle.decision.decision,
            DecisionType::Buy | DecisionType::Sell | DecisionType::Hold
        ));
        assert_eq!(outcome.bundle.social_posts, outcome.bundle.verified_social_result.posts);
        assert_eq!(h.fake.total_calls(), 7);
        assert!(h.store.get("company_data_NFLX").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_fetch_within_the_hour_makes_no_remote_calls() {
        let h = harness();
        let first = h
            .orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        let calls_after_first = h.fake.total_calls();

        let later = t0() + chrono::Duration::minutes(59);
        let second = h
            .orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", later, &())
            .await;

        assert_eq!(h.fake.total_calls(), calls_after_first);
        assert_eq!(second.source, BundleSource::Cache);
        assert_eq!(second.bundle, first.bundle);
    }

    #[tokio::test]
    async fn expired_cache_triggers_refetch() {
        let h = harness();
        h.orchestrator
            .resolve_at(None, &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        let later = t0() + chrono::Duration::hours(1);
        let outcome = h
            .orchestrator
            .resolve_at(None, &netflix(), "gemini-2.5-flash", later, &())
            .await;

        assert_eq!(outcome.source, BundleSource::Live);
        assert_eq!(h.fake.total_calls(), 14);
    }

    #[tokio::test]
    async fn any_single_failure_yields_the_full_fallback_bundle() {
        for op in [
            Operation::Profile,
            Operation::News,
            Operation::XPosts,
            Operation::RedditPosts,
            Operation::Prices,
            Operation::VerifySocial,
            Operation::Decision,
        ] {
            let h = harness();
            h.fake.fail_on(op);
            let outcome = h
                .orchestrator
                .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
                .await;

            assert_eq!(outcome.source, BundleSource::Fallback, "{op:?}");
            assert!(outcome.demo_mode);
            assert_eq!(outcome.error.as_deref(), Some(DEMO_MODE_MESSAGE));
            assert_eq!(outcome.bundle, fallback_bundle(&netflix()), "{op:?}");
            assert!(h.store.get("company_data_NFLX").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn history_records_live_and_fallback_but_not_cache_hits() {
        let h = harness();
        let store: &dyn KvStore = h.store.as_ref();

        h.orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        h.orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        assert_eq!(history::load(store, "ada").await.unwrap().len(), 1);

        let tesla = Company::new("TSLA", "Tesla, Inc.", "https://example.com/tsla.png");
        h.fake.fail_on(Operation::News);
        let later = t0() + chrono::Duration::minutes(5);
        h.orchestrator
            .resolve_at(Some("ada"), &tesla, "gemini-2.5-flash", later, &())
            .await;

        let records = history::load(store, "ada").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company_ticker, "TSLA");
        assert_eq!(records[0].decision, fallback_bundle(&tesla).decision);
        assert_eq!(records[1].company_ticker, "NFLX");
    }

    #[tokio::test]
    async fn corrupt_history_does_not_swallow_later_decisions() {
        let h = harness();
        h.store.set("trading_history_ada", "{broken").await.unwrap();
        let tesla = Company::new("TSLA", "Tesla, Inc.", "https://example.com/tsla.png");

        h.orchestrator
            .resolve_at(Some("ada"), &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        h.orchestrator
            .resolve_at(Some("ada"), &tesla, "gemini-2.5-flash", t0(), &())
            .await;

        let records = history::load(h.store.as_ref(), "ada").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company_ticker, "TSLA");
        assert_eq!(records[1].company_ticker, "NFLX");
    }

    #[tokio::test]
    async fn unreadable_cache_entry_is_treated_as_missing() {
        let h = harness();
        h.store.set("company_data_NFLX", "{broken").await.unwrap();
        let outcome = h
            .orchestrator
            .resolve_at(None, &netflix(), "gemini-2.5-flash", t0(), &())
            .await;
        assert_eq!(outcome.source, BundleSource::Live);
    }

    #[tokio::test]
    async fn reports_stage_messages_in_order() {
        let h = harness();
        let recorder = Recorder::default();
        h.orchestrator
            .resolve_at(None, &netflix(), "gemini-2.5-flash", t0(), &recorder)
            .await;

        let states = recorder.0.into_inner().unwrap();
        assert_eq!(states.first(), Some(&FetchState::Loading { message: MSG_PROFILE }));
        assert_eq!(
            &states[states.len() - 3..],
            &[
                FetchState::Loading { message: MSG_VERIFY },
                FetchState::Loading { message: MSG_DECISION },
                FetchState::Success,
            ]
        );
    }

    #[tokio::test]
    async fn watch_channel_ends_in_demo_fallback() {
        let h = harness();
        h.fake.fail_on(Operation::Decision);
        let (tx, rx) = tokio::sync::watch::channel(FetchState::Idle);
        h.orchestrator
            .resolve_at(None, &netflix(), "gemini-2.5-flash", t0(), &tx)
            .await;
        assert_eq!(*rx.borrow(), FetchState::DemoFallback);
    }
}
