use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    config::AppConfig,
    error::ServiceError,
    extract::effective_query,
    prompt::{DEFAULT_MODE, render},
    serializer::RequestSerializer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub serializer: Arc<RequestSerializer>,
}

#[derive(Debug, Default, Deserialize)]
struct PredictParams {
    mode: Option<String>,
    q: Option<String>,
}

pub fn build_router(config: Arc<AppConfig>, serializer: Arc<RequestSerializer>) -> Router {
    let state = AppState { config, serializer };

    Router::new()
        .route("/health", get(health))
        .route("/predict", get(predict).post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "ok"
}

/// `GET /predict?mode=<mode>&q=<query>` or `POST /predict?mode=<mode>` with
/// the query as the request body. The body takes precedence over `q`.
///
/// Extraction and templating failures are raised here, before the request
/// consumes a generation slot.
async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    body: Bytes,
) -> Result<Response, ServiceError> {
    let mode = params.mode.as_deref().unwrap_or(DEFAULT_MODE);
    // A body that fails to decode counts as absent and falls through to `q`.
    let body = std::str::from_utf8(&body).ok();
    let query = effective_query(body, params.q.as_deref())?;
    let prompt = render(mode, &query)?;

    tracing::debug!(mode, prompt_len = prompt.len(), "submitting generation");

    let completion = state
        .serializer
        .submit(prompt, state.config.generation())
        .await?;

    // Plain String responses are served as text/plain.
    Ok(completion.into_response())
}
