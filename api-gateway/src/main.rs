// ==============================================================================
// main.rs - Analysis API Gateway Entry Point
// ==============================================================================
// Description: Axum web server for submitting and tracking analysis jobs
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

mod handlers;
mod models;
mod state;

use state::AppState;

const DEFAULT_PORT: u16 = 8099;
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(false)
            .compact()
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting Analysis API Gateway v{}", env!("CARGO_PKG_VERSION"));

    let server_port = match std::env::var("SERVER_PORT") {
        Ok(raw) => raw.trim().parse::<u16>().context("SERVER_PORT must be a port number")?,
        Err(_) => DEFAULT_PORT,
    };

    let state = AppState::new()
        .await
        .context("Failed to initialize application state")?;

    // Expire old job records in the background
    let orchestrator = state.orchestrator().clone();
    let cleanup_interval = orchestrator.config().cleanup_interval;
    let retention_hours = orchestrator.config().retention_hours;
    tokio::spawn(async move {
        orchestrator.cleanup_loop(cleanup_interval, retention_hours).await;
    });

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_port));
    info!("API Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/jobs", post(handlers::submit_job))
        .route(
            "/jobs/{job_id}",
            get(handlers::get_job_status).delete(handlers::cancel_job),
        )
        .route("/jobs/{job_id}/result", get(handlers::get_job_result))
        .route("/jobs/{job_id}/ws", get(handlers::job_progress_ws))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check));

    // Comma-separated, e.g. CORS_ALLOWED_ORIGINS=https://clinic.example.com,http://localhost:3000
    let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());
    let allowed_origins: Vec<_> = cors_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_credentials(false)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/analysis", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_worker::{Job, JobStatus, Orchestrator, OrchestratorConfig};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use genomic_analysis::annotation::AnnotationTable;
    use genomic_analysis::models::{AnalysisOptions, AnalysisRun};
    use genomic_analysis::{AnalysisEngine, AnalysisError, Analyzer, MemoryStore, ProgressSender};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::models::{ErrorResponse, SubmitJobResponse};

    struct StalledAnalyzer;

    #[async_trait]
    impl Analyzer for StalledAnalyzer {
        async fn analyze(
            &self,
            _patient_id: &str,
            _raw_input: &Value,
            _options: &AnalysisOptions,
            _progress: Option<&ProgressSender>,
        ) -> Result<AnalysisRun, AnalysisError> {
            std::future::pending().await
        }
    }

    fn state_with(analyzer: Arc<dyn Analyzer>, per_second: u32) -> AppState {
        let orchestrator = Orchestrator::new(
            Arc::new(MemoryStore::new()),
            analyzer,
            OrchestratorConfig::default(),
        );
        AppState::with_orchestrator(orchestrator, per_second)
    }

    fn engine_state() -> AppState {
        state_with(Arc::new(AnalysisEngine::with_table(AnnotationTable::empty())), 100)
    }

    fn submission() -> Value {
        json!({
            "patient_id": "patient-1",
            "raw_input": {
                "format": "json",
                "variants": [
                    {"chromosome": "17", "position": 43044295, "reference": "A", "alternate": "G",
                     "gene": "BRCA1", "clinicalSignificance": "pathogenic", "quality": 25}
                ]
            }
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn submit(app: &Router) -> Uuid {
        let (status, body) = send(app, "POST", "/api/analysis/jobs", Some(submission())).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let response: SubmitJobResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.status, JobStatus::Queued);
        response.job_id
    }

    async fn wait_terminal(app: &Router, id: Uuid) -> Job {
        for _ in 0..500 {
            let (status, body) = send(app, "GET", &format!("/api/analysis/jobs/{}", id), None).await;
            assert_eq!(status, StatusCode::OK);
            let job: Job = serde_json::from_value(body).unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} did not finish", id);
    }

    #[tokio::test]
    async fn test_submit_and_fetch_result() {
        let app = build_router(engine_state());
        let id = submit(&app).await;

        let job = wait_terminal(&app, id).await;
        assert_eq!(job.status, JobStatus::Completed);

        let (status, body) = send(&app, "GET", &format!("/api/analysis/jobs/{}/result", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let run: AnalysisRun = serde_json::from_value(body).unwrap();
        assert_eq!(run.patient_id, "patient-1");
        assert_eq!(run.summary.pathogenic_variants, 1);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let app = build_router(engine_state());
        let id = Uuid::new_v4();

        for (method, uri) in [
            ("GET", format!("/api/analysis/jobs/{}", id)),
            ("GET", format!("/api/analysis/jobs/{}/result", id)),
            ("DELETE", format!("/api/analysis/jobs/{}", id)),
        ] {
            let (status, _) = send(&app, method, &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_result_conflict_and_cancel() {
        let app = build_router(state_with(Arc::new(StalledAnalyzer), 100));
        let id = submit(&app).await;

        let (status, _) = send(&app, "GET", &format!("/api/analysis/jobs/{}/result", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "DELETE", &format!("/api/analysis/jobs/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let job: Job = serde_json::from_value(body).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("cancelled"));

        let (status, _) = send(&app, "DELETE", &format!("/api/analysis/jobs/{}", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "GET", &format!("/api/analysis/jobs/{}/result", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_bad_submissions_are_400() {
        let app = build_router(engine_state());

        let mut unsupported = submission();
        unsupported["raw_input"]["format"] = json!("xml");
        let (status, body) = send(&app, "POST", "/api/analysis/jobs", Some(unsupported)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_value(body).unwrap();
        assert!(error.details.unwrap().contains("xml"));

        let mut blank_patient = submission();
        blank_patient["patient_id"] = json!("");
        let (status, _) = send(&app, "POST", "/api/analysis/jobs", Some(blank_patient)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/api/analysis/jobs", Some(json!({"patient_id": "p"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_variant_fails_job() {
        let app = build_router(engine_state());
        let body = json!({
            "patient_id": "p",
            "raw_input": {"format": "vcf", "variants": [{"chromosome": "1"}]}
        });
        let (status, body) = send(&app, "POST", "/api/analysis/jobs", Some(body)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let id = serde_json::from_value::<SubmitJobResponse>(body).unwrap().job_id;

        let job = wait_terminal(&app, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.is_some());
    }

    #[tokio::test]
    async fn test_submission_rate_limited() {
        let app = build_router(state_with(Arc::new(StalledAnalyzer), 1));
        submit(&app).await;

        let (status, _) = send(&app, "POST", "/api/analysis/jobs", Some(submission())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = build_router(engine_state());

        let (status, body) = send(&app, "GET", "/api/analysis/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(&app, "GET", "/api/analysis/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ready"], true);

        let (status, _) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
