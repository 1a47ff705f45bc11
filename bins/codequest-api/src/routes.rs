use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(handlers::health_check))
        .route("/run", post(handlers::run_code))
        .route("/test", post(handlers::run_tests))
        .route("/grade", post(handlers::grade_submission))
        .route("/metrics", get(handlers::export_metrics))
}
