// Copyright Cortex Authors
// SPDX-License-Identifier: Apache-2.0

//! Router and handlers for the decision API: one POST route per scheduler
//! family, plus `/up` and `/metrics`.

use crate::dto::{CinderRequestBody, ManilaRequestBody, NovaRequestBody, SchedulingResponse};
use crate::error::Error;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use cortex_engine::request::SchedulingRequest;
use cortex_engine::step::StepContext;
use cortex_controller::PipelineRegistry;
use cortex_telemetry::PipelineMetrics;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// The live pipeline registry, written by the controller.
    pub registry: Arc<PipelineRegistry>,
    /// Kubernetes namespace pipelines are looked up in.
    pub namespace: String,
    /// Context (inventory/reservations/knowledge) every pipeline run reads.
    pub step_context: StepContext,
    /// Shared metrics, including the API-layer request-duration histogram.
    pub metrics: Arc<PipelineMetrics>,
}

/// The scheduler family a running process serves. Each binary invocation
/// picks exactly one (per the `scheduler-nova`/`scheduler-cinder`/
/// `scheduler-manila` subcommands); the controller still reconciles every
/// `Pipeline`/`Step` regardless of family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Nova (compute) scheduling requests.
    Nova,
    /// Cinder (volume) scheduling requests.
    Cinder,
    /// Manila (share) scheduling requests.
    Manila,
}

impl Family {
    /// The path segment this family is mounted under.
    #[must_use]
    pub fn path_segment(self) -> &'static str {
        match self {
            Family::Nova => "nova",
            Family::Cinder => "cinder",
            Family::Manila => "manila",
        }
    }
}

/// Builds the router for a single scheduler family, plus `/up` and
/// `/metrics`.
#[must_use]
pub fn router(state: AppState, family: Family) -> Router {
    let scheduler_route = match family {
        Family::Nova => post(schedule_nova),
        Family::Cinder => post(schedule_cinder),
        Family::Manila => post(schedule_manila),
    };
    Router::new()
        .route(&format!("/scheduler/{}/{{pipeline}}", family.path_segment()), scheduler_route)
        .route("/up", get(up))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn up() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(err) => {
            warn!(error = %err, "failed to render metrics");
            Error::Internal(err.to_string()).into_response()
        }
    }
}

async fn run_pipeline(
    state: &AppState,
    pipeline: &str,
    request: &dyn SchedulingRequest,
) -> Result<SchedulingResponse, Error> {
    let engine = state
        .registry
        .get(&state.namespace, pipeline)
        .ok_or_else(|| Error::PipelineNotFound(pipeline.to_string()))?;

    let result = engine.run(&state.step_context, request).await?;
    Ok(result.into())
}

/// Records `api_request_duration` with the real outcome of a scheduler
/// request, then converts it into the handler's response. Runs for every
/// response path, not just success, so spec's `status`/`error` label
/// dimensions are populated.
fn observe_request(
    state: &AppState,
    method: &str,
    pipeline: &str,
    started: Instant,
    result: Result<SchedulingResponse, Error>,
) -> Result<Json<SchedulingResponse>, Error> {
    let path = format!("/scheduler/{method}/{pipeline}");
    let (status, error) = match &result {
        Ok(_) => ("200".to_string(), String::new()),
        Err(err) => (err.status().as_u16().to_string(), err.to_string()),
    };
    state
        .metrics
        .api_request_duration
        .with_label_values(&[method, &path, &status, &error])
        .observe(started.elapsed().as_secs_f64());
    result.map(Json)
}

async fn run_nova(
    state: &AppState,
    pipeline: &str,
    body: Result<Json<NovaRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<SchedulingResponse, Error> {
    let Json(body) = body.map_err(|err| Error::MalformedRequest(err.to_string()))?;
    let request = body.into_request().map_err(Error::MalformedRequest)?;
    run_pipeline(state, pipeline, &request).await
}

async fn schedule_nova(
    State(state): State<AppState>,
    Path(pipeline): Path<String>,
    body: Result<Json<NovaRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<SchedulingResponse>, Error> {
    let started = Instant::now();
    let result = run_nova(&state, &pipeline, body).await;
    observe_request(&state, "nova", &pipeline, started, result)
}

async fn run_cinder(
    state: &AppState,
    pipeline: &str,
    body: Result<Json<CinderRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<SchedulingResponse, Error> {
    let Json(body) = body.map_err(|err| Error::MalformedRequest(err.to_string()))?;
    let request = cortex_engine::CinderRequest::from(body);
    run_pipeline(state, pipeline, &request).await
}

async fn schedule_cinder(
    State(state): State<AppState>,
    Path(pipeline): Path<String>,
    body: Result<Json<CinderRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<SchedulingResponse>, Error> {
    let started = Instant::now();
    let result = run_cinder(&state, &pipeline, body).await;
    observe_request(&state, "cinder", &pipeline, started, result)
}

async fn run_manila(
    state: &AppState,
    pipeline: &str,
    body: Result<Json<ManilaRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<SchedulingResponse, Error> {
    let Json(body) = body.map_err(|err| Error::MalformedRequest(err.to_string()))?;
    let request = cortex_engine::ManilaRequest::from(body);
    run_pipeline(state, pipeline, &request).await
}

async fn schedule_manila(
    State(state): State<AppState>,
    Path(pipeline): Path<String>,
    body: Result<Json<ManilaRequestBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<SchedulingResponse>, Error> {
    let started = Instant::now();
    let result = run_manila(&state, &pipeline, body).await;
    observe_request(&state, "manila", &pipeline, started, result)
}
