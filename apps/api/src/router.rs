use std::sync::Arc;

use axum::{routing::get, Router};

use dashboard_cell::{admin_routes, therapist_routes, AdminGateway};
use reconciliation_cell::reconciliation_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, gateway: Arc<dyn AdminGateway>) -> Router {
    Router::new()
        .route("/", get(|| async { "Teletherapy admin API is running!" }))
        .nest("/reconcile", reconciliation_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone(), gateway.clone()))
        .nest("/therapist", therapist_routes(state, gateway))
}
