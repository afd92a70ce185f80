use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signaldesk_core::accounts::{Accounts, AuthError};
use signaldesk_core::analysis::{AnalysisOrchestrator, AnalysisOutcome};
use signaldesk_core::companies::{not_found_message, CompanyDirectory};
use signaldesk_core::dashboard::{Dashboard, DashboardView, SelectionTicket};
use signaldesk_core::domain::analysis::HistoricalDecision;
use signaldesk_core::domain::company::Company;
use signaldesk_core::domain::user::SessionUser;
use signaldesk_core::preferences::{
    model_catalogue, ModelInfo, PreferenceError, PreferenceSnapshot, Preferences, Theme,
};
use signaldesk_core::storage::{self, KvStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = signaldesk_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = open_store(&settings).await;
    let provider = signaldesk_core::analysis::provider_from_settings(&settings)?;

    let state = AppState {
        orchestrator: Arc::new(
            AnalysisOrchestrator::new(provider.clone(), store.clone())
                .with_cache_ttl(settings.cache_ttl),
        ),
        accounts: Accounts::new(store.clone()),
        preferences: Preferences::new(store.clone()),
        directory: Arc::new(CompanyDirectory::new(provider)),
        dashboard: Arc::new(Dashboard::new()),
        store,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/session", get(session))
        .route("/models", get(models))
        .route("/settings", get(get_settings).put(put_settings))
        .route("/companies", get(list_companies))
        .route("/companies/search", get(search_company))
        .route("/analysis/:ticker", get(get_analysis))
        .route("/selection", get(get_selection).post(post_selection))
        .route("/history", get(get_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Falls back to the in-memory store when the database is missing or unreachable.
async fn open_store(settings: &signaldesk_core::config::Settings) -> Arc<dyn KvStore> {
    let pool = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            None
        }
    };

    match pool {
        Some(pool) => Arc::new(PgStore::new(pool)),
        None => Arc::new(MemoryStore::new()),
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn KvStore>,
    orchestrator: Arc<AnalysisOrchestrator>,
    accounts: Accounts,
    preferences: Preferences,
    directory: Arc<CompanyDirectory>,
    dashboard: Arc<Dashboard>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Login required.")
    }

    fn internal(err: anyhow::Error) -> Self {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error.")
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => Self::internal(e),
            AuthError::InvalidCredentials => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            other => Self::new(StatusCode::BAD_REQUEST, other.to_string()),
        }
    }
}

impl From<PreferenceError> for ApiError {
    fn from(err: PreferenceError) -> Self {
        match err {
            PreferenceError::Store(e) => Self::internal(e),
            other => Self::new(StatusCode::BAD_REQUEST, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Body {
            error: String,
        }
        (self.status, Json(Body { error: self.message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

async fn require_user(state: &AppState) -> Result<SessionUser, ApiError> {
    state
        .accounts
        .current_user()
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(ApiError::unauthorized)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<SessionUser> {
    let user = state
        .accounts
        .register(&req.username, &req.full_name, &req.email, &req.password)
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<SessionUser> {
    let user = state.accounts.login(&req.username, &req.password).await?;
    Ok(Json(user))
}

async fn logout(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.accounts.logout().await.map_err(ApiError::internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session(State(state): State<AppState>) -> ApiResult<SessionUser> {
    Ok(Json(require_user(&state).await?))
}

async fn models() -> Json<Vec<ModelInfo>> {
    Json(model_catalogue())
}

async fn get_settings(State(state): State<AppState>) -> Json<PreferenceSnapshot> {
    Json(state.preferences.snapshot().await)
}

#[derive(Debug, Deserialize)]
struct SettingsUpdate {
    theme: Option<Theme>,
    model: Option<String>,
}

async fn put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<PreferenceSnapshot> {
    if let Some(model) = update.model.as_deref() {
        state.preferences.set_model(model).await?;
    }
    if let Some(theme) = update.theme {
        state
            .preferences
            .set_theme(theme)
            .await
            .map_err(ApiError::internal)?;
    }
    Ok(Json(state.preferences.snapshot().await))
}

async fn list_companies(State(state): State<AppState>) -> Json<Vec<Company>> {
    Json(state.directory.list().await)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search_company(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Company> {
    if query.q.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Query is required."));
    }
    let model = state.preferences.model().await;
    state
        .directory
        .search(&query.q, &model)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, not_found_message(query.q.trim())))
}

async fn find_company(state: &AppState, ticker: &str, model: &str) -> Result<Company, ApiError> {
    if let Some(company) = state.directory.get(ticker).await {
        return Ok(company);
    }
    state
        .directory
        .search(ticker, model)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, not_found_message(ticker)))
}

async fn get_analysis(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ApiResult<AnalysisOutcome> {
    let user = require_user(&state).await?;
    let model = state.preferences.model().await;
    let company = find_company(&state, &ticker, &model).await?;
    let outcome = state
        .orchestrator
        .resolve(Some(user.username.as_str()), &company, &model, &())
        .await;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct SelectionRequest {
    ticker: String,
}

async fn post_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<(StatusCode, Json<SelectionTicket>), ApiError> {
    let user = require_user(&state).await?;
    let model = state.preferences.model().await;
    let company = find_company(&state, &req.ticker, &model).await?;

    let ticket = state.dashboard.select(company.clone());
    let dashboard = state.dashboard.clone();
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let applied = dashboard
            .run_cycle(&orchestrator, ticket, &company, Some(user.username.as_str()), &model)
            .await;
        tracing::debug!(cycle_id = %ticket.cycle_id, applied, "selection cycle finished");
    });

    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

async fn get_selection(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.view())
}

async fn get_history(State(state): State<AppState>) -> ApiResult<Vec<HistoricalDecision>> {
    let user = require_user(&state).await?;
    let records = storage::history::load(state.store.as_ref(), &user.username)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(records))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
