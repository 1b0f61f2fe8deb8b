//! HTTP API.
//!
//! Routes:
//! - `GET /health`
//! - `GET|POST /api/data`
//! - `GET /api/schedule`
//! - `GET /api/reviews`, `GET /api/reviews/{id}`,
//!   `POST /api/reviews/{id}/approve`, `POST /api/reviews/{id}/reject`
//! - `GET|POST /api/tasks`, `POST /api/tasks/{id}/start`, `POST /api/tasks/{id}/stop`

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::DeskConfig;
use crate::data::DataManager;
use crate::error::{ApiError, AppError};
use crate::io::store::LocalStore;
use crate::review::{ReviewBook, ReviewError};
use crate::tasks::{TaskBoard, TaskError};

mod routes;
pub mod wire;

/// Shared handles behind every handler.
#[derive(Clone)]
pub struct AppState {
    pub data: Arc<DataManager>,
    pub reviews: Arc<ReviewBook>,
    pub tasks: Arc<TaskBoard>,
}

impl AppState {
    /// Wire up the manager, review book and task board for `config`.
    ///
    /// Nothing is scheduled yet; call [`DataManager::start`] for that.
    pub fn new(config: &DeskConfig) -> Self {
        let store = Arc::new(LocalStore::open(config.store.path.clone()));
        let reviews = Arc::new(ReviewBook::new(store));
        Self {
            data: Arc::new(DataManager::new(config.schedule.clone())),
            tasks: Arc::new(TaskBoard::new(Arc::clone(&reviews), config.tasks.step())),
            reviews,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health))
        .route("/api/data", get(routes::get_data).post(routes::post_data))
        .route("/api/schedule", get(routes::schedule))
        .route("/api/reviews", get(routes::list_reviews))
        .route("/api/reviews/{id}", get(routes::get_review))
        .route("/api/reviews/{id}/approve", post(routes::approve_review))
        .route("/api/reviews/{id}/reject", post(routes::reject_review))
        .route("/api/tasks", get(routes::list_tasks).post(routes::create_task))
        .route("/api/tasks/{id}/start", post(routes::start_task))
        .route("/api/tasks/{id}/stop", post(routes::stop_task))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the refresh schedule and serve the API until ctrl-c.
pub async fn serve(config: DeskConfig) -> Result<(), AppError> {
    let state = AppState::new(&config);
    state
        .data
        .start()
        .map_err(|e| AppError::new(4, format!("Failed to start refresh schedule: {e}")))?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::new(4, format!("Failed to bind {addr}: {e}")))?;
    info!(
        addr = %addr,
        store = %config.store.path.display(),
        "refdesk listening on http://{addr}"
    );

    let result = axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::new(4, format!("Server error: {e}")));

    state.data.stop_scheduler();
    state.tasks.shutdown();
    info!("refdesk stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ReviewError::AlreadyReviewed { .. } => ApiError::Conflict(err.to_string()),
            ReviewError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::NotFound(_) => ApiError::NotFound(err.to_string()),
            TaskError::AlreadyRunning(_) => ApiError::Conflict(err.to_string()),
            TaskError::Invalid(_) => ApiError::BadRequest(err.to_string()),
            TaskError::NoRuntime(_) => ApiError::Internal(err.to_string()),
        }
    }
}
