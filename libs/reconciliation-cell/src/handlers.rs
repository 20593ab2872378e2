// libs/reconciliation-cell/src/handlers.rs
use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Appointment, PayoutSummary, ReconciliationError, TherapistLevel};
use crate::services::{reconcile, PayoutCalculator};

#[derive(Debug, Deserialize)]
pub struct PayoutPreviewRequest {
    pub level: Option<i64>,
    #[serde(default)]
    pub appointments: Vec<Value>,
}

impl From<ReconciliationError> for AppError {
    fn from(err: ReconciliationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

/// Reconciles one appointment object, or each object of an array.
#[axum::debug_handler]
pub async fn reconcile_appointments(
    Extension(user): Extension<User>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    debug!("Reconcile preview requested by {}", user.id);

    match body {
        Value::Array(items) => {
            let total = items.len();
            let results: Vec<_> = items
                .into_iter()
                .filter_map(Appointment::from_json)
                .map(|appointment| reconcile(&appointment))
                .collect();
            let skipped = total - results.len();

            Ok(Json(json!({
                "results": results,
                "skipped": skipped
            })))
        }
        obj @ Value::Object(_) => {
            let appointment = Appointment::from_json(obj).ok_or(ReconciliationError::InvalidBody)?;
            Ok(Json(json!(reconcile(&appointment))))
        }
        _ => Err(ReconciliationError::InvalidBody.into()),
    }
}

/// Payout preview over a posted appointment list.
///
/// Without an explicit `level`, the first appointment's therapist level is used.
#[axum::debug_handler]
pub async fn preview_payout(
    Extension(user): Extension<User>,
    Json(request): Json<PayoutPreviewRequest>,
) -> Result<Json<PayoutSummary>, AppError> {
    debug!("Payout preview requested by {}", user.id);

    let appointments: Vec<Appointment> = request
        .appointments
        .into_iter()
        .filter_map(Appointment::from_json)
        .collect();

    let level = match request.level {
        Some(level) if level >= 1 => TherapistLevel::from(level),
        Some(level) => return Err(ReconciliationError::InvalidLevel(level.to_string()).into()),
        None => appointments
            .iter()
            .find_map(|a| a.therapist_level)
            .ok_or_else(|| ReconciliationError::InvalidLevel("missing".to_string()))?,
    };

    Ok(Json(PayoutCalculator::new().therapist_payout(&appointments, level)))
}
