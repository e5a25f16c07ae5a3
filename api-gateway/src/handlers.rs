// ==============================================================================
// handlers.rs - API Request Handlers
// ==============================================================================
// Description: HTTP request handlers for analysis job endpoints
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use analysis_worker::{Job, JobStatus, OrchestratorError};
use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use futures::stream::StreamExt;
use futures_util::sink::SinkExt;
use genomic_analysis::models::AnalysisRun;
use genomic_analysis::parsers::InputFormat;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{models::*, state::AppState};

/// Root endpoint - API information
pub async fn root() -> Json<ApiInfoResponse> {
    Json(ApiInfoResponse {
        service: "Genomic Analysis API Gateway",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "/api/analysis/health - Health check",
            "/api/analysis/ready - Readiness check",
            "/api/analysis/jobs - Submit job (POST)",
            "/api/analysis/jobs/{job_id} - Get status (GET) or cancel (DELETE)",
            "/api/analysis/jobs/{job_id}/result - Analysis result (GET)",
            "/api/analysis/jobs/{job_id}/ws - WebSocket progress updates",
        ],
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ready = match state.orchestrator().ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Store not ready: {}", e);
            false
        }
    };

    let status = if store_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: store_ready,
            store: store_ready,
        }),
    )
}

/// Submit job endpoint
pub async fn submit_job(
    State(state): State<AppState>,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::bad_request("Invalid request body", e.body_text()))?;

    request
        .validate()
        .map_err(|e| AppError::bad_request("Invalid submission", e.to_string()))?;

    // Unusable shapes are rejected here; deeper parse errors fail the job instead
    InputFormat::detect(&request.raw_input)
        .map_err(|e| AppError::bad_request("Malformed raw input", e.to_string()))?;

    if !state.allow_submission() {
        warn!("Submission rate limit exceeded");
        return Err(AppError::TooManyRequests);
    }

    let job_id = state
        .orchestrator()
        .submit(&request.patient_id, request.raw_input, request.options)
        .await?;

    info!("Accepted job {}", job_id);

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id,
            status: JobStatus::Queued,
            created_at: Utc::now(),
        }),
    ))
}

pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .orchestrator()
        .get_status(job_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(job))
}

/// Analysis result; 409 while the job is not completed
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<AnalysisRun>, AppError> {
    let job = state
        .orchestrator()
        .get_status(job_id)
        .await?
        .ok_or(AppError::NotFound)?;

    match (job.status, job.result) {
        (JobStatus::Completed, Some(run)) => Ok(Json(run)),
        (status, _) => Err(AppError::Conflict(format!("Job is {}", status))),
    }
}

/// Cancel endpoint
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, AppError> {
    info!("Cancelling job {}", job_id);
    let job = state.orchestrator().cancel(job_id).await?;
    Ok(Json(job))
}

/// WebSocket progress updates
pub async fn job_progress_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_progress_socket(socket, state, job_id))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    value: &impl serde::Serialize,
) -> bool {
    match serde_json::to_string(value) {
        Ok(text) => sender.send(Message::Text(text.into())).await.is_ok(),
        Err(e) => {
            error!("Failed to encode WebSocket message: {}", e);
            false
        }
    }
}

async fn handle_progress_socket(socket: WebSocket, state: AppState, job_id: Uuid) {
    info!("WebSocket connected for job {}", job_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let subscription = match state
        .orchestrator()
        .subscribe(job_id, move |job: Job| {
            let _ = tx.send(job.update());
        })
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            let (code, message) = match e {
                OrchestratorError::NotFound(_) => ("job_not_found", "Job does not exist or has been deleted"),
                _ => {
                    error!("Failed to subscribe to job {}: {}", job_id, e);
                    ("subscribe_failed", "Failed to subscribe to job updates")
                }
            };
            let error_msg = serde_json::json!({"type": "error", "error": code, "message": message});
            send_json(&mut sender, &error_msg).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let mut ping_interval = tokio::time::interval(tokio::time::Duration::from_secs(30));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                let terminal = update.status.is_terminal();
                if !send_json(&mut sender, &update).await {
                    break;
                }
                if terminal {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed progress socket for job {}", job_id);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    subscription.unsubscribe();
    info!("WebSocket disconnected for job {}", job_id);
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug)]
pub enum AppError {
    NotFound,
    BadRequest {
        error: String,
        details: Option<String>,
    },
    Conflict(String),
    TooManyRequests,
    Internal(String),
}

impl AppError {
    pub fn bad_request(error: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::BadRequest {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

impl From<OrchestratorError> for AppError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::NotFound(_) => AppError::NotFound,
            OrchestratorError::AlreadyTerminal { .. } | OrchestratorError::IllegalTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, ErrorResponse::new("Resource not found")),
            AppError::BadRequest { error, details } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse { error, details },
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(msg)),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorResponse::new("Too many submissions, retry later"),
            ),
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
