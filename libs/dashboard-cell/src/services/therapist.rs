use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use reconciliation_cell::models::{Appointment, AppointmentStatus};
use reconciliation_cell::services::{action_gates, reconcile_payment};
use shared_backend::BackendError;

use crate::error::DashboardError;
use crate::gateway::AdminGateway;
use crate::models::{require_id, AppointmentPage, StatusUpdate, TherapistFilter};
use crate::services::reconciled_page;

/// Actions a therapist runs on their own appointments.
pub struct TherapistService {
    gateway: Arc<dyn AdminGateway>,
}

impl TherapistService {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, token: &str, filter: &TherapistFilter) -> Result<AppointmentPage, DashboardError> {
        filter.validate()?;
        let record = self.gateway.list_therapist_appointments(token, filter).await?;
        Ok(reconciled_page(record, filter.page, filter.limit))
    }

    pub async fn accept(&self, token: &str, appointment_id: &str, filter: &TherapistFilter) -> Result<AppointmentPage, DashboardError> {
        self.set_status(token, appointment_id, AppointmentStatus::Approved, None, filter)
            .await
    }

    pub async fn reject(
        &self,
        token: &str,
        appointment_id: &str,
        comment: Option<&str>,
        filter: &TherapistFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DashboardError::Validation("a decline comment is required".to_string()))?;

        self.set_status(
            token,
            appointment_id,
            AppointmentStatus::Rejected,
            Some(comment.to_string()),
            filter,
        )
        .await
    }

    pub async fn mark_no_show(&self, token: &str, appointment_id: &str, filter: &TherapistFilter) -> Result<AppointmentPage, DashboardError> {
        self.set_status(token, appointment_id, AppointmentStatus::NoShow, None, filter)
            .await
    }

    /// Marks a session held. Only allowed while the fresh read shows the
    /// payment resolved and the appointment in a completable status.
    pub async fn validate(&self, token: &str, appointment_id: &str, filter: &TherapistFilter) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        filter.validate()?;

        let appointment = self.fetch_one(token, appointment_id).await?;
        let payment = reconcile_payment(&appointment);
        if !action_gates(&appointment, &payment).can_complete_session {
            return Err(DashboardError::Conflict(format!(
                "appointment {} cannot be completed while {} with payment '{}'",
                appointment_id, appointment.status, payment.text
            )));
        }

        let update = StatusUpdate {
            status: AppointmentStatus::Completed.as_wire().to_string(),
            decline_comment: None,
        };
        info!("Validating session for appointment {}", appointment_id);
        self.gateway
            .validate_session(token, appointment_id, &update)
            .await?;

        self.list(token, filter).await
    }

    async fn set_status(
        &self,
        token: &str,
        appointment_id: &str,
        status: AppointmentStatus,
        decline_comment: Option<String>,
        filter: &TherapistFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        filter.validate()?;

        let update = StatusUpdate {
            status: status.as_wire().to_string(),
            decline_comment,
        };
        info!("Setting appointment {} to {}", appointment_id, update.status);
        self.gateway
            .update_therapist_status(token, appointment_id, &update)
            .await?;

        self.list(token, filter).await
    }

    async fn fetch_one(&self, token: &str, appointment_id: &str) -> Result<Appointment, DashboardError> {
        let value = self.gateway.get_therapist_appointment(token, appointment_id).await?;
        // Some deployments wrap the record in an envelope.
        let record = match value {
            Value::Object(mut obj) if obj.get("appointment").is_some_and(Value::is_object) => {
                obj.remove("appointment").unwrap_or_default()
            }
            other => other,
        };

        Appointment::from_json(record).ok_or_else(|| {
            BackendError::Decode(format!("appointment {} is not an object", appointment_id)).into()
        })
    }
}
