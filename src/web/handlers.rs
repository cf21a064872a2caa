//! HTTP handlers and error mapping.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::AppContext;
use crate::core::models::{DockingParameters, JobRecord, JobStatus, PoseResult};
use crate::core::service;
use crate::error::JobError;

/// Wrapper so handlers can use `?` on [`JobError`].
pub struct ApiError(JobError);

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JobError::Validation(_) => StatusCode::BAD_REQUEST,
            JobError::NotFound(_) => StatusCode::NOT_FOUND,
            JobError::InvalidState { .. }
            | JobError::InvalidTransition { .. }
            | JobError::Conflict { .. }
            | JobError::NotReady { .. }
            | JobError::JobFailed { .. } => StatusCode::CONFLICT,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub protein_id: String,
    pub ligand_id: String,
    #[serde(default)]
    pub parameters: DockingParameters,
}

pub async fn submit_job(
    State(ctx): State<AppContext>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let record = ctx
        .service
        .submit(&req.protein_id, &req.ligand_id, req.parameters)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<JobStatus>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

pub async fn list_jobs(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> Json<Vec<JobRecord>> {
    Json(
        ctx.service
            .list(params.status, params.limit, params.offset)
            .await,
    )
}

pub async fn get_job(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    Ok(Json(ctx.service.get(&id).await?))
}

pub async fn cancel_job(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.service.cancel(&id).await?;
    Ok(Json(json!({ "accepted": true })))
}

pub async fn delete_job(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    ctx.service.delete(&id).await?;
    Ok(Json(json!({ "deleted": true })))
}

#[derive(Serialize)]
pub struct ResultsResponse {
    pub job_id: String,
    pub results: Vec<PoseResult>,
    pub parameters: DockingParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

pub async fn get_results(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ResultsResponse>> {
    let results = ctx.service.results(&id).await?;
    let job = ctx.service.get(&id).await?;
    Ok(Json(ResultsResponse {
        job_id: id,
        results,
        parameters: job.parameters,
        completed_at: job.completed_at,
    }))
}

pub async fn validate_parameters(
    Json(parameters): Json<DockingParameters>,
) -> Json<crate::core::models::ParameterReport> {
    Json(service::check_parameters(&parameters))
}

pub async fn stats(State(ctx): State<AppContext>) -> Json<crate::core::models::JobStats> {
    Json(ctx.service.stats().await)
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub active_jobs: usize,
    pub max_concurrent_jobs: usize,
}

pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let stats = ctx.service.stats().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: ctx.started.elapsed().as_secs(),
        active_jobs: stats.active_jobs,
        max_concurrent_jobs: ctx.config.max_concurrent_jobs,
    })
}
