use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sitesearch_core::config::AppConfig;
use sitesearch_core::morphology::Morphology;
use sitesearch_core::search::{SearchEngine, SearchHit, SearchRequest};
use sitesearch_core::stats::Statistics;
use sitesearch_core::store::IndexStore;
use sitesearch_core::Error;
use sitesearch_crawler::Fetcher;
use sitesearch_indexer::Orchestrator;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub search: Arc<SearchEngine>,
}

impl AppState {
    pub fn new(config: &AppConfig, store: Arc<dyn IndexStore>, fetcher: Arc<dyn Fetcher>, morphology: Morphology) -> Self {
        let search = SearchEngine::new(store.clone(), morphology.clone(), config.search.clone());
        let orchestrator = Orchestrator::new(config, store, fetcher, morphology);
        Self { orchestrator: Arc::new(orchestrator), search: Arc::new(search) }
    }
}

#[derive(Serialize)]
pub struct ActionResponse {
    pub result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: Statistics,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub result: bool,
    pub count: usize,
    pub data: Vec<SearchHit>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub site: Option<String>,
    #[serde(default)]
    pub offset: i64,
    #[serde(default)]
    pub limit: i64,
}

#[derive(Deserialize)]
pub struct IndexPageParams {
    #[serde(default)]
    pub url: String,
}

/// Core errors as `{result: false, error}`: 400 for bad input, 500 otherwise.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ActionResponse { result: false, error: Some(self.0.to_string()) };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn ok() -> ApiResult<ActionResponse> {
    Ok(Json(ActionResponse { result: true, error: None }))
}

/// Origins come from CORS_ALLOW_ORIGIN (comma separated); unset or unparsable means any origin.
fn cors_layer() -> CorsLayer {
    let origins: Vec<HeaderValue> = std::env::var("CORS_ALLOW_ORIGIN")
        .map(|raw| raw.split(',').filter_map(|s| s.trim().parse().ok()).collect())
        .unwrap_or_default();
    let allow = if origins.is_empty() { AllowOrigin::any() } else { AllowOrigin::list(origins) };
    CorsLayer::new().allow_origin(allow).allow_methods(Any).allow_headers(Any)
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/statistics", get(statistics_handler))
        .route("/api/startIndexing", get(start_indexing_handler))
        .route("/api/stopIndexing", get(stop_indexing_handler))
        .route("/api/indexPage", post(index_page_handler))
        .route("/api/search", get(search_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

pub async fn statistics_handler(State(state): State<AppState>) -> ApiResult<StatisticsResponse> {
    let statistics = state.orchestrator.statistics()?;
    Ok(Json(StatisticsResponse { result: true, statistics }))
}

pub async fn start_indexing_handler(State(state): State<AppState>) -> ApiResult<ActionResponse> {
    state.orchestrator.start_indexing().await?;
    ok()
}

pub async fn stop_indexing_handler(State(state): State<AppState>) -> ApiResult<ActionResponse> {
    state.orchestrator.stop_indexing()?;
    ok()
}

pub async fn index_page_handler(
    State(state): State<AppState>,
    Query(params): Query<IndexPageParams>,
) -> ApiResult<ActionResponse> {
    state.orchestrator.index_page(&params.url).await?;
    ok()
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchResponse> {
    let request = SearchRequest {
        query: params.query,
        site: params.site.filter(|s| !s.trim().is_empty()),
        offset: params.offset.max(0) as usize,
        limit: (params.limit > 0).then_some(params.limit as usize),
    };
    let engine = state.search.clone();
    let results = tokio::task::spawn_blocking(move || engine.search(&request))
        .await
        .map_err(|e| Error::Internal(format!("search task failed: {e}")))??;
    Ok(Json(SearchResponse { result: true, count: results.count, data: results.data }))
}
