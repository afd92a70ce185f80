use anyhow::Context;
use clap::{Parser, Subcommand};
use signaldesk_core::analysis::{AnalysisOrchestrator, FetchState, ProgressReporter};
use signaldesk_core::companies::{not_found_message, CompanyDirectory};
use signaldesk_core::domain::company::{seed_companies, Company};
use signaldesk_core::preferences::Preferences;
use signaldesk_core::storage::{self, KvStore, MemoryStore, PgStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "signaldesk_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one analysis cycle and print the outcome as JSON.
    Analyze {
        ticker: String,
        /// Record the decision in this user's history.
        #[arg(long)]
        user: Option<String>,
        /// Model id. Defaults to the stored preference.
        #[arg(long)]
        model: Option<String>,
    },
    /// Look up a company by name or ticker.
    Find { query: String },
    /// Print a user's decision history, newest first.
    History {
        #[arg(long)]
        user: String,
    },
    /// Fill the cache for every seed company.
    Warm {
        #[arg(long)]
        user: Option<String>,
    },
}

struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, state: FetchState) {
        if let FetchState::Loading { message } = state {
            tracing::info!(stage = message, "analysis progress");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = signaldesk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn run(args: Args, settings: &signaldesk_core::config::Settings) -> anyhow::Result<()> {
    let store = open_store(settings).await?;
    let provider = signaldesk_core::analysis::provider_from_settings(settings)?;
    let directory = CompanyDirectory::new(provider.clone());
    let preferences = Preferences::new(store.clone());
    let orchestrator =
        AnalysisOrchestrator::new(provider, store.clone()).with_cache_ttl(settings.cache_ttl);

    match args.command {
        Command::Analyze {
            ticker,
            user,
            model,
        } => {
            let model = match model {
                Some(m) => m,
                None => preferences.model().await,
            };
            let company = resolve_company(&directory, &ticker, &model).await?;
            let outcome = orchestrator
                .resolve(user.as_deref(), &company, &model, &LogProgress)
                .await;
            if let Some(banner) = &outcome.error {
                tracing::warn!(ticker = %company.ticker, "{banner}");
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Find { query } => {
            let model = preferences.model().await;
            match directory.search(&query, &model).await {
                Some(company) => println!("{}", serde_json::to_string_pretty(&company)?),
                None => anyhow::bail!(not_found_message(&query)),
            }
        }
        Command::History { user } => {
            let records = storage::history::load(store.as_ref(), &user).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Command::Warm { user } => {
            let model = preferences.model().await;
            for company in seed_companies() {
                let outcome = orchestrator
                    .resolve(user.as_deref(), &company, &model, &())
                    .await;
                tracing::info!(
                    ticker = %company.ticker,
                    source = ?outcome.source,
                    decision = ?outcome.bundle.decision.decision,
                    "warmed"
                );
            }
        }
    }

    Ok(())
}

/// Known tickers come from the directory; anything else goes through a lookup.
async fn resolve_company(
    directory: &CompanyDirectory,
    ticker: &str,
    model: &str,
) -> anyhow::Result<Company> {
    if let Some(company) = directory.get(ticker).await {
        return Ok(company);
    }
    directory
        .search(ticker, model)
        .await
        .with_context(|| not_found_message(ticker))
}

async fn open_store(
    settings: &signaldesk_core::config::Settings,
) -> anyhow::Result<Arc<dyn KvStore>> {
    let Some(db_url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL missing; using in-memory store for this run");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;
    storage::migrate(&pool).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

fn init_sentry(settings: &signaldesk_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
