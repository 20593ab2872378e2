use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DashboardError;
use crate::gateway::AdminGateway;
use crate::models::{require_id, AppointmentFilter, AppointmentPage, PaymentStatusRequest};
use crate::services::reconciled_page;

/// Admin appointment list and the mutations an operator runs from it.
///
/// Mutations never patch the local page. They wait for the backend and then
/// hand back a fresh page read with the caller's filter.
pub struct AppointmentAdminService {
    gateway: Arc<dyn AdminGateway>,
}

impl AppointmentAdminService {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, token: &str, filter: &AppointmentFilter) -> Result<AppointmentPage, DashboardError> {
        filter.validate()?;
        let record = self.gateway.list_appointments(token, filter).await?;
        let page = reconciled_page(record, filter.page, filter.limit);
        debug!(
            "Loaded {} appointments ({} skipped) of {}",
            page.appointments.len(),
            page.skipped,
            page.pagination.total
        );
        Ok(page)
    }

    pub async fn assign_therapist(
        &self,
        token: &str,
        appointment_id: &str,
        therapist_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        let therapist_id = require_id("therapist", therapist_id)?;
        filter.validate()?;

        info!("Assigning therapist {} to appointment {}", therapist_id, appointment_id);
        self.gateway
            .assign_therapist(token, appointment_id, therapist_id)
            .await?;

        self.list(token, filter).await
    }

    pub async fn revoke_therapist(
        &self,
        token: &str,
        appointment_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        filter.validate()?;

        info!("Revoking therapist from appointment {}", appointment_id);
        self.gateway.revoke_therapist(token, appointment_id).await?;

        self.list(token, filter).await
    }

    pub async fn change_payment_status(
        &self,
        token: &str,
        appointment_id: &str,
        request: &PaymentStatusRequest,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        let status = request.parse()?;
        filter.validate()?;

        info!("Setting payment status of {} to {}", appointment_id, status.as_wire());
        self.gateway
            .update_payment_status(token, appointment_id, status.as_wire())
            .await?;

        self.list(token, filter).await
    }

    pub async fn link_payment(
        &self,
        token: &str,
        appointment_id: &str,
        payment_id: &str,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPage, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        let payment_id = require_id("payment", payment_id)?;
        filter.validate()?;

        info!("Linking payment {} to appointment {}", payment_id, appointment_id);
        self.gateway
            .link_payment(token, appointment_id, payment_id)
            .await?;

        self.list(token, filter).await
    }
}
