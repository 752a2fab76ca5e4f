//! HTTP surface of the generator service

use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use bizgraph_data_api::DataApi;
use bizgraph_models::{GenerationConfig, GenerationReport, WorkflowReport};
use bizgraph_utils::{validate_model, BizGraphError, ErrorResponse, GenerationSettings};

use crate::batch::BatchGenerator;
use crate::workflow::LinearWorkflowRunner;

#[derive(Clone)]
pub struct AppState {
    pub batch: BatchGenerator,
    pub workflow: LinearWorkflowRunner,
}

impl AppState {
    pub fn new(api: Arc<dyn DataApi>, settings: GenerationSettings) -> Self {
        Self {
            batch: BatchGenerator::new(api.clone(), settings.clone()),
            workflow: LinearWorkflowRunner::new(api, settings),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowRequest {
    pub seed: Option<u64>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(error: BizGraphError) -> ApiError {
    let status = StatusCode::from_u16(error.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(error)))
}

/// An empty body means "all defaults"
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| reject(BizGraphError::validation("body", e.to_string())))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/generation/defaults", get(generation_defaults))
        .route("/api/v1/generation/batch", post(generate_batch))
        .route("/api/v1/generation/workflow", post(run_workflow))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "graph-generator",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn generation_defaults() -> Json<GenerationConfig> {
    Json(GenerationConfig::default())
}

async fn generate_batch(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerationReport>, ApiError> {
    let config: GenerationConfig = parse_body(&body)?;
    validate_model("generation config", &config).map_err(reject)?;

    info!(
        accounts = config.accounts,
        contacts = config.contacts,
        leads = config.leads,
        quotes = config.quotes,
        work_orders = config.work_orders,
        invoices = config.invoices,
        "Batch generation requested"
    );
    Ok(Json(state.batch.generate(&config).await))
}

async fn run_workflow(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<WorkflowReport>, ApiError> {
    let request: WorkflowRequest = parse_body(&body)?;
    info!(seed = ?request.seed, "Workflow run requested");
    Ok(Json(state.workflow.run_complete_workflow(request.seed).await))
}
