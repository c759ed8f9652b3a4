//! HTTP API: построение маршрутов и обработчики

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use crate::error::SettlementError;
use crate::experiment::{Experiment, ExperimentReport};
use crate::preprocessing::{rows_to_matrix, series_to_supervised_rows, SupervisedOptions};
use crate::types::{ExperimentRequest, SupervisedRequest, SupervisedResponse};

pub const DEFAULT_MAX_ROWS: usize = 100_000;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Максимум строк во входной матрице
    pub max_rows: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

/// Ошибка API: 400 для некорректных данных, 500 для остального
#[derive(Debug)]
pub enum ApiError {
    Settlement(SettlementError),
    /// Сбой фоновой задачи
    Internal(String),
}

impl From<SettlementError> for ApiError {
    fn from(e: SettlementError) -> Self {
        ApiError::Settlement(e)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("background task failed: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Settlement(e) if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Settlement(e) => {
                tracing::error!(detail = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": true,
            "message": message,
        }));
        (status, body).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/supervised", post(supervised))
        .route("/api/experiment", post(experiment))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state)
}

pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Settlement ML API (Rust)",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn check_size(state: &AppState, rows: usize) -> Result<(), ApiError> {
    if rows > state.max_rows {
        return Err(SettlementError::InvalidInput(format!(
            "{} rows exceeds limit of {}",
            rows, state.max_rows
        ))
        .into());
    }
    Ok(())
}

// Окно длиннее ряда не даёт ни одной полной строки
fn check_window(rows: usize, n_in: usize, n_out: usize) -> Result<(), ApiError> {
    if n_in > rows || n_out > rows {
        return Err(SettlementError::InvalidInput(format!(
            "window n_in={}, n_out={} exceeds {} rows",
            n_in, n_out, rows
        ))
        .into());
    }
    Ok(())
}

async fn supervised(
    State(state): State<AppState>,
    Json(req): Json<SupervisedRequest>,
) -> Result<Json<SupervisedResponse>, ApiError> {
    tracing::info!(
        "Supervised request: {} rows, n_in {}, n_out {}",
        req.values.len(),
        req.n_in,
        req.n_out
    );
    check_size(&state, req.values.len())?;
    check_window(req.values.len(), req.n_in, req.n_out)?;

    let options = SupervisedOptions {
        n_in: req.n_in,
        n_out: req.n_out,
        drop_incomplete: req.drop_incomplete,
    };
    let frame = series_to_supervised_rows(&req.values, options)?;
    Ok(Json(SupervisedResponse::from(&frame)))
}

async fn experiment(
    State(state): State<AppState>,
    Json(req): Json<ExperimentRequest>,
) -> Result<Json<ExperimentReport>, ApiError> {
    tracing::info!("Experiment request: {} rows", req.values.len());
    check_size(&state, req.values.len())?;
    check_window(req.values.len(), req.config.window, req.config.horizon)?;

    let values = rows_to_matrix(&req.values)?;
    let mut config = req.config;
    // Артефакты из API не пишутся на диск
    config.artifact_dir = None;

    let report = tokio::task::spawn_blocking(move || {
        Experiment::new(config).and_then(|mut e| e.run(&values))
    })
    .await??;

    Ok(Json(report))
}
