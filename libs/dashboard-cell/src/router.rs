// libs/dashboard-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::gateway::AdminGateway;
use crate::handlers::*;
use crate::services::BoardRegistry;

#[derive(Clone)]
pub struct DashboardState {
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn AdminGateway>,
    pub boards: Arc<BoardRegistry>,
}

impl DashboardState {
    pub fn new(config: Arc<AppConfig>, gateway: Arc<dyn AdminGateway>) -> Self {
        let boards = Arc::new(BoardRegistry::new(gateway.clone(), &config));
        Self { config, gateway, boards }
    }
}

/// Operator routes. Every handler also checks the admin role.
pub fn admin_routes(config: Arc<AppConfig>, gateway: Arc<dyn AdminGateway>) -> Router {
    let state = DashboardState::new(config.clone(), gateway);

    Router::new()
        // Appointments
        .route("/appointments", get(list_appointments))
        .route("/appointments/{id}/assign", put(assign_therapist))
        .route("/appointments/{id}/revoke", put(revoke_therapist))
        .route("/appointments/{id}/payment-status", put(change_payment_status))
        .route("/appointments/{id}/link-payment", put(link_payment))
        // Board
        .route("/board", get(board_snapshot))
        .route("/board/filter", put(set_board_filter))
        .route("/board/search", get(search_board))
        // Patients
        .route("/patients", get(list_patients))
        .route("/patients/verified-payments", post(verified_payments))
        .route("/patients/{id}/ban", put(ban_patient))
        .route("/patients/{id}/balance", put(set_session_balance))
        // Payouts
        .route("/payouts/therapists/{id}", get(therapist_payout))
        .route("/payouts/{id}/reject", put(reject_payout))
        .route("/payouts/{id}/mark-paid", put(mark_payout_paid))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}

pub fn therapist_routes(config: Arc<AppConfig>, gateway: Arc<dyn AdminGateway>) -> Router {
    let state = DashboardState::new(config.clone(), gateway);

    Router::new()
        .route("/appointments", get(therapist_appointments))
        .route("/appointments/{id}/accept", put(accept_appointment))
        .route("/appointments/{id}/reject", put(reject_appointment))
        .route("/appointments/{id}/validate", put(validate_session))
        .route("/appointments/{id}/no-show", put(mark_no_show))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
