use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::llm::models::QueryExplanation;
use crate::pipeline::{ChartConfig, PipelineError, Row};
use crate::web::state::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub question: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    pub question: String,
    pub rows: Vec<Row>,
}

// Response types

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ExecuteResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanations: Vec<QueryExplanation>,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub config: ChartConfig,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub explanations: Vec<QueryExplanation>,
    pub config: ChartConfig,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub backend: String,
    pub model: String,
}

// Errors

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn invalid_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.to_string(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        let status = match &e {
            PipelineError::Generation(_) => StatusCode::BAD_GATEWAY,
            PipelineError::RejectedQuery(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Execution(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self {
            status,
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("{}: {}", self.kind, self.message);
        } else {
            warn!("{}: {}", self.kind, self.message);
        }
        let body = ErrorBody {
            kind: self.kind,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_request(&format!("{} must not be empty", field)));
    }
    Ok(())
}

// API Implementations

pub async fn generate_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    require("question", &payload.question)?;
    let query = state.generator.generate(&payload.question).await?;
    Ok(Json(GenerateResponse { query }))
}

pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<Json<ExecuteResponse>, ApiError> {
    require("query", &payload.query)?;
    let start_time = Instant::now();
    let result = state.executor.execute(&payload.query).await?;

    Ok(Json(ExecuteResponse {
        row_count: result.rows.len(),
        columns: result.columns,
        rows: result.rows,
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    }))
}

pub async fn explain_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    require("question", &payload.question)?;
    require("query", &payload.query)?;
    let explanations = state
        .explainer
        .explain(&payload.question, &payload.query)
        .await?;
    Ok(Json(ExplainResponse { explanations }))
}

pub async fn chart_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChartRequest>,
) -> Result<Json<ChartResponse>, ApiError> {
    require("question", &payload.question)?;
    let config = state
        .charts
        .choose_chart(&payload.rows, &payload.question)
        .await?;
    Ok(Json(ChartResponse { config }))
}

/// Generates, executes, then explains and charts the result concurrently.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QuestionRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    require("question", &payload.question)?;
    let question = payload.question.as_str();

    let query = state.generator.generate(question).await?;
    let result = state.executor.execute(&query).await?;

    let (explanations, config) = tokio::join!(
        state.explainer.explain(question, &query),
        state.charts.choose_chart(&result.rows, question),
    );
    let explanations = explanations?;
    let config = config?;

    info!("Answered question with {} rows", result.rows.len());
    Ok(Json(AskResponse {
        query,
        columns: result.columns,
        rows: result.rows,
        explanations,
        config,
    }))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        backend: state.llm_manager.backend().to_string(),
        model: state.llm_manager.model().to_string(),
    })
}
