//! Selected company and the state of its fetch cycle.
//!
//! Every selection bumps a generation counter. A cycle that finishes after the
//! user has moved on to another company carries an old generation and its
//! outcome is dropped.

use crate::analysis::{AnalysisOrchestrator, AnalysisOutcome, FetchState, ProgressReporter};
use crate::domain::company::Company;
use serde::Serialize;
use std::sync::RwLock;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectionTicket {
    pub generation: u64,
    pub cycle_id: Uuid,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub selected: Option<Company>,
    pub cycle_id: Option<Uuid>,
    pub state: Option<FetchState>,
    pub outcome: Option<AnalysisOutcome>,
    pub demo_mode: bool,
}

struct Inner {
    generation: u64,
    view: DashboardView,
}

/// The generation check and every write it guards, including the watch
/// publish, happen under one lock.
pub struct Dashboard {
    inner: RwLock<Inner>,
    state_tx: watch::Sender<FetchState>,
}

impl Default for Dashboard {
    fn default() -> Self {
        let (state_tx, _) = watch::channel(FetchState::Idle);
        Self {
            inner: RwLock::new(Inner {
                generation: 0,
                view: DashboardView {
                    state: Some(FetchState::Idle),
                    ..DashboardView::default()
                },
            }),
            state_tx,
        }
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state_tx.subscribe()
    }

    pub fn is_current(&self, ticket: &SelectionTicket) -> bool {
        self.inner
            .read()
            .map(|inner| inner.generation == ticket.generation)
            .unwrap_or(false)
    }

    /// Makes `company` the selection and invalidates every earlier ticket.
    pub fn select(&self, company: Company) -> SelectionTicket {
        let mut inner = match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.generation += 1;
        let ticket = SelectionTicket {
            generation: inner.generation,
            cycle_id: Uuid::new_v4(),
        };
        inner.view = DashboardView {
            selected: Some(company),
            cycle_id: Some(ticket.cycle_id),
            state: Some(FetchState::Idle),
            outcome: None,
            demo_mode: false,
        };
        self.state_tx.send_replace(FetchState::Idle);
        ticket
    }

    fn set_state(&self, ticket: &SelectionTicket, state: FetchState) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        if inner.generation != ticket.generation {
            return;
        }
        inner.view.state = Some(state.clone());
        self.state_tx.send_replace(state);
    }

    /// Applies `outcome` if `ticket` is still current. Returns whether it was applied.
    pub fn complete(&self, ticket: &SelectionTicket, outcome: AnalysisOutcome) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            return false;
        };
        if inner.generation != ticket.generation {
            tracing::info!(
                cycle_id = %ticket.cycle_id,
                ticker = %outcome.company.ticker,
                "discarding stale analysis result"
            );
            return false;
        }
        let state = outcome.final_state();
        inner.view.state = Some(state.clone());
        inner.view.demo_mode = outcome.demo_mode;
        inner.view.outcome = Some(outcome);
        self.state_tx.send_replace(state);
        true
    }

    /// Runs one fetch cycle for the ticket's selection and applies the result.
    pub async fn run_cycle(
        &self,
        orchestrator: &AnalysisOrchestrator,
        ticket: SelectionTicket,
        company: &Company,
        username: Option<&str>,
        model: &str,
    ) -> bool {
        let reporter = TicketReporter {
            dashboard: self,
            ticket,
        };
        let outcome = orchestrator
            .resolve(username, company, model, &reporter)
            .await;
        self.complete(&ticket, outcome)
    }

    pub fn view(&self) -> DashboardView {
        self.inner
            .read()
            .map(|inner| inner.view.clone())
            .unwrap_or_default()
    }
}

/// Forwards progress only while its ticket is current.
pub struct TicketReporter<'a> {
    dashboard: &'a Dashboard,
    ticket: SelectionTicket,
}

impl ProgressReporter for TicketReporter<'_> {
    fn report(&self, state: FetchState) {
        self.dashboard.set_state(&self.ticket, state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fake::{FakeAnalysisProvider, Operation};
    use crate::analysis::fallback::fallback_bundle;
    use crate::analysis::BundleSource;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn company(ticker: &str) -> Company {
        Company::new(ticker, format!("{ticker} Inc."), "https://example.com/logo.png")
    }

    fn outcome_for(company: &Company) -> AnalysisOutcome {
        AnalysisOutcome {
            company: company.clone(),
            bundle: fallback_bundle(company),
            source: BundleSource::Live,
            demo_mode: false,
            error: None,
        }
    }

    #[test]
    fn stale_completion_is_discarded() {
        let dashboard = Dashboard::new();
        let aapl = company("AAPL");
        let tsla = company("TSLA");

        let old = dashboard.select(aapl.clone());
        let new = dashboard.select(tsla.clone());

        assert!(!dashboard.complete(&old, outcome_for(&aapl)));
        assert!(dashboard.view().outcome.is_none());

        assert!(dashboard.complete(&new, outcome_for(&tsla)));
        let view = dashboard.view();
        assert_eq!(view.selected, Some(tsla));
        assert_eq!(view.outcome.unwrap().company.ticker, "TSLA");
        assert_eq!(view.state, Some(FetchState::Success));
    }

    #[test]
    fn stale_progress_does_not_touch_state() {
        let dashboard = Dashboard::new();
        let old = dashboard.select(company("AAPL"));
        let _new = dashboard.select(company("TSLA"));

        TicketReporter {
            dashboard: &dashboard,
            ticket: old,
        }
        .report(FetchState::Loading {
            message: "Scanning Reddit...",
        });
        assert_eq!(dashboard.view().state, Some(FetchState::Idle));
        assert_eq!(*dashboard.subscribe().borrow(), FetchState::Idle);
    }

    #[test]
    fn racing_stale_cycle_never_overwrites_new_selection() {
        let dashboard = Dashboard::new();
        let aapl = company("AAPL");
        for _ in 0..200 {
            let old = dashboard.select(aapl.clone());
            let new = std::thread::scope(|scope| {
                scope.spawn(|| {
                    let reporter = TicketReporter {
                        dashboard: &dashboard,
                        ticket: old,
                    };
                    for _ in 0..20 {
                        reporter.report(FetchState::Loading {
                            message: "Scanning Reddit...",
                        });
                    }
                    dashboard.complete(&old, outcome_for(&aapl));
                });
                dashboard.select(company("TSLA"))
            });

            let view = dashboard.view();
            assert_eq!(view.cycle_id, Some(new.cycle_id));
            assert!(view.outcome.is_none());
            assert_eq!(view.state, Some(FetchState::Idle));
            assert_eq!(*dashboard.subscribe().borrow(), FetchState::Idle);
        }
    }

    #[tokio::test]
    async fn run_cycle_publishes_demo_fallback() {
        let fake = Arc::new(FakeAnalysisProvider::new());
        fake.fail_on(Operation::Prices);
        let orchestrator = AnalysisOrchestrator::new(fake, Arc::new(MemoryStore::new()));
        let dashboard = Dashboard::new();
        let rx = dashboard.subscribe();

        let nflx = company("NFLX");
        let ticket = dashboard.select(nflx.clone());
        let applied = dashboard
            .run_cycle(&orchestrator, ticket, &nflx, None, "gemini-2.5-flash")
            .await;

        assert!(applied);
        assert!(dashboard.view().demo_mode);
        assert_eq!(*rx.borrow(), FetchState::DemoFallback);
    }
}
