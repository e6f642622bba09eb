//! HTTP surface: `GET /api/gini`.

use crate::analyzer::{AnalysisMode, InequalityAnalyzer};
use crate::error::AnalysisError;
use crate::labels::parse_property_list;
use crate::stats::AnalysisResult;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared across handlers. Runs keep no state here beyond the analyzer.
pub struct AppState {
    pub analyzer: InequalityAnalyzer,
}

impl AppState {
    pub fn new(analyzer: InequalityAnalyzer) -> Self {
        Self { analyzer }
    }
}

#[derive(Debug, Deserialize)]
pub struct GiniParams {
    pub entity: Option<String>,
    pub properties: Option<String>,
}

/// Failure surfaced to HTTP clients as plain text.
#[derive(Debug)]
pub enum ApiError {
    MissingParam(&'static str),
    Analysis(AnalysisError),
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        ApiError::Analysis(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingParam(name) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Url Param '{}' is missing", name),
            ),
            ApiError::Analysis(err) if err.is_client_error() => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
            ApiError::Analysis(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, message).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/gini", get(gini))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn home() -> &'static str {
    "Welcome home!"
}

async fn gini(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GiniParams>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let class_id = params
        .entity
        .filter(|e| !e.trim().is_empty())
        .ok_or(ApiError::MissingParam("entity"))?;

    let labels = params
        .properties
        .as_deref()
        .map(parse_property_list)
        .unwrap_or_default();
    let mode = AnalysisMode::from_labels(labels);

    let result = state.analyzer.analyze(class_id.trim(), &mode).await?;
    Ok(Json(result))
}
