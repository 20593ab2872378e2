// libs/dashboard-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use reconciliation_cell::models::PayoutSummary;
use shared_models::auth::{User, ROLE_ADMIN, ROLE_THERAPIST};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    AppointmentFilter, AppointmentPage, AssignTherapistRequest, BanPatientRequest, DeclineRequest,
    LinkPaymentRequest, PatientFilter, PatientPage, PaymentStatusRequest, RejectPayoutRequest,
    SessionBalanceRequest, TherapistFilter, VerifiedPaymentsRequest,
};
use crate::router::DashboardState;
use crate::services::{
    AppointmentAdminService, BoardView, PatientAdminService, PayoutAdminService, PayoutScope, TherapistService,
};

#[derive(Debug, Deserialize)]
pub struct LevelQuery {
    pub level: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub term: String,
}

fn mutation_result(summary: Option<PayoutSummary>) -> Json<Value> {
    match summary {
        Some(summary) => Json(json!(summary)),
        None => Json(json!({ "status": "ok" })),
    }
}

// ==============================================================================
// ADMIN: APPOINTMENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;
    debug!("Admin {} listing appointments", user.id);

    let service = AppointmentAdminService::new(state.gateway.clone());
    let page = service.list(auth.token(), &filter).await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn assign_therapist(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<AppointmentFilter>,
    Json(request): Json<AssignTherapistRequest>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = AppointmentAdminService::new(state.gateway.clone());
    let page = service
        .assign_therapist(auth.token(), &appointment_id, &request.therapist_id, &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn revoke_therapist(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<AppointmentFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = AppointmentAdminService::new(state.gateway.clone());
    let page = service
        .revoke_therapist(auth.token(), &appointment_id, &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn change_payment_status(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<AppointmentFilter>,
    Json(request): Json<PaymentStatusRequest>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = AppointmentAdminService::new(state.gateway.clone());
    let page = service
        .change_payment_status(auth.token(), &appointment_id, &request, &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn link_payment(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<AppointmentFilter>,
    Json(request): Json<LinkPaymentRequest>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = AppointmentAdminService::new(state.gateway.clone());
    let page = service
        .link_payment(auth.token(), &appointment_id, &request.payment_id, &filter)
        .await?;

    Ok(Json(page))
}

// ==============================================================================
// ADMIN: APPOINTMENT BOARD
// ==============================================================================

/// Current board for the signed-in admin, loaded on first use.
#[axum::debug_handler]
pub async fn board_snapshot(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<BoardView>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let board = state.boards.board_for(&user.id, auth.token()).await;
    let applied = if board.snapshot().await.page.is_none() {
        board.refresh().await?
    } else {
        false
    };

    Ok(Json(BoardView {
        applied,
        snapshot: board.snapshot().await,
    }))
}

#[axum::debug_handler]
pub async fn set_board_filter(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(filter): Json<AppointmentFilter>,
) -> Result<Json<BoardView>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let board = state.boards.board_for(&user.id, auth.token()).await;
    let applied = board.set_filter(filter).await?;

    Ok(Json(BoardView {
        applied,
        snapshot: board.snapshot().await,
    }))
}

/// Type-ahead search. Requests superseded within the debounce window answer
/// with `applied: false` and whatever the board currently shows.
#[axum::debug_handler]
pub async fn search_board(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<BoardView>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let board = state.boards.board_for(&user.id, auth.token()).await;
    let applied = board.search(&query.term).await?;

    Ok(Json(BoardView {
        applied,
        snapshot: board.snapshot().await,
    }))
}

// ==============================================================================
// ADMIN: PATIENTS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(filter): Query<PatientFilter>,
) -> Result<Json<PatientPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PatientAdminService::new(state.gateway.clone());
    Ok(Json(service.list(auth.token(), &filter).await?))
}

#[axum::debug_handler]
pub async fn ban_patient(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
    Query(filter): Query<PatientFilter>,
    Json(request): Json<BanPatientRequest>,
) -> Result<Json<PatientPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PatientAdminService::new(state.gateway.clone());
    let page = service
        .set_banned(auth.token(), &patient_id, request.banned, &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn set_session_balance(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
    Query(filter): Query<PatientFilter>,
    Json(request): Json<SessionBalanceRequest>,
) -> Result<Json<PatientPage>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PatientAdminService::new(state.gateway.clone());
    let page = service
        .set_session_balance(auth.token(), &patient_id, request.sessions, &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn verified_payments(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifiedPaymentsRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PatientAdminService::new(state.gateway.clone());
    Ok(Json(service.verified_payments(auth.token(), &request).await?))
}

// ==============================================================================
// ADMIN: PAYOUTS
// ==============================================================================

#[axum::debug_handler]
pub async fn therapist_payout(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(therapist_id): Path<String>,
    Query(query): Query<LevelQuery>,
) -> Result<Json<PayoutSummary>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PayoutAdminService::new(state.gateway.clone());
    let summary = service
        .therapist_summary(auth.token(), &therapist_id, query.level)
        .await?;

    Ok(Json(summary))
}

#[axum::debug_handler]
pub async fn reject_payout(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(scope): Query<PayoutScope>,
    Json(request): Json<RejectPayoutRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PayoutAdminService::new(state.gateway.clone());
    let summary = service
        .reject_payout(auth.token(), &appointment_id, &request.note, &scope)
        .await?;

    Ok(mutation_result(summary))
}

#[axum::debug_handler]
pub async fn mark_payout_paid(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(scope): Query<PayoutScope>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, ROLE_ADMIN)?;

    let service = PayoutAdminService::new(state.gateway.clone());
    let summary = service
        .mark_paid(auth.token(), &appointment_id, &scope)
        .await?;

    Ok(mutation_result(summary))
}

// ==============================================================================
// THERAPIST
// ==============================================================================

#[axum::debug_handler]
pub async fn therapist_appointments(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(filter): Query<TherapistFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_THERAPIST)?;

    let service = TherapistService::new(state.gateway.clone());
    Ok(Json(service.list(auth.token(), &filter).await?))
}

#[axum::debug_handler]
pub async fn accept_appointment(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<TherapistFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_THERAPIST)?;

    let service = TherapistService::new(state.gateway.clone());
    Ok(Json(service.accept(auth.token(), &appointment_id, &filter).await?))
}

#[axum::debug_handler]
pub async fn reject_appointment(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<TherapistFilter>,
    Json(request): Json<DeclineRequest>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_THERAPIST)?;

    let service = TherapistService::new(state.gateway.clone());
    let page = service
        .reject(auth.token(), &appointment_id, request.comment.as_deref(), &filter)
        .await?;

    Ok(Json(page))
}

#[axum::debug_handler]
pub async fn validate_session(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<TherapistFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_THERAPIST)?;

    let service = TherapistService::new(state.gateway.clone());
    Ok(Json(service.validate(auth.token(), &appointment_id, &filter).await?))
}

#[axum::debug_handler]
pub async fn mark_no_show(
    State(state): State<DashboardState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<String>,
    Query(filter): Query<TherapistFilter>,
) -> Result<Json<AppointmentPage>, AppError> {
    require_role(&user, ROLE_THERAPIST)?;

    let service = TherapistService::new(state.gateway.clone());
    Ok(Json(service.mark_no_show(auth.token(), &appointment_id, &filter).await?))
}
