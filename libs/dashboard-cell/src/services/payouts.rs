use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use reconciliation_cell::models::{Appointment, PayoutSummary, TherapistLevel};
use reconciliation_cell::services::PayoutCalculator;

use crate::error::DashboardError;
use crate::gateway::AdminGateway;
use crate::models::{require_id, AppointmentFilter, MAX_PAGE_LIMIT};
use crate::services::decode_appointments;

/// Upper bound on pages read for one payout summary.
const MAX_PAYOUT_PAGES: u32 = 50;

/// Which therapist's summary to return after a payout mutation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayoutScope {
    pub therapist: Option<String>,
    pub level: Option<i64>,
}

pub struct PayoutAdminService {
    gateway: Arc<dyn AdminGateway>,
    calculator: PayoutCalculator,
}

impl PayoutAdminService {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self {
            gateway,
            calculator: PayoutCalculator::new(),
        }
    }

    /// Payable total for one therapist, read fresh across every page.
    ///
    /// Without an explicit level, the level reported on the therapist's
    /// appointments is used.
    pub async fn therapist_summary(
        &self,
        token: &str,
        therapist_id: &str,
        level: Option<i64>,
    ) -> Result<PayoutSummary, DashboardError> {
        let therapist_id = require_id("therapist", therapist_id)?;
        let appointments = self.therapist_appointments(token, therapist_id).await?;

        let level = match level {
            Some(level) if level >= 1 => TherapistLevel::from(level),
            Some(level) => {
                return Err(DashboardError::Validation(format!("invalid therapist level {}", level)));
            }
            None => appointments
                .iter()
                .find_map(|a| a.therapist_level)
                .ok_or_else(|| {
                    DashboardError::Validation(format!("therapist {} has no known level", therapist_id))
                })?,
        };

        Ok(self.calculator.therapist_payout(&appointments, level))
    }

    pub async fn reject_payout(
        &self,
        token: &str,
        appointment_id: &str,
        note: &str,
        scope: &PayoutScope,
    ) -> Result<Option<PayoutSummary>, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;
        let note = note.trim();
        if note.is_empty() {
            return Err(DashboardError::Validation("a rejection note is required".to_string()));
        }

        info!("Rejecting payout for appointment {}", appointment_id);
        self.gateway.reject_payout(token, appointment_id, note).await?;

        self.refresh(token, scope).await
    }

    pub async fn mark_paid(
        &self,
        token: &str,
        appointment_id: &str,
        scope: &PayoutScope,
    ) -> Result<Option<PayoutSummary>, DashboardError> {
        let appointment_id = require_id("appointment", appointment_id)?;

        info!("Marking payout for appointment {} as paid", appointment_id);
        self.gateway.mark_payout_paid(token, appointment_id).await?;

        self.refresh(token, scope).await
    }

    async fn refresh(&self, token: &str, scope: &PayoutScope) -> Result<Option<PayoutSummary>, DashboardError> {
        match scope.therapist.as_deref() {
            Some(therapist_id) => self
                .therapist_summary(token, therapist_id, scope.level)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    async fn therapist_appointments(&self, token: &str, therapist_id: &str) -> Result<Vec<Appointment>, DashboardError> {
        let mut filter = AppointmentFilter::for_therapist(therapist_id, MAX_PAGE_LIMIT);
        let mut appointments = Vec::new();

        loop {
            let record = self.gateway.list_appointments(token, &filter).await?;
            let (mut batch, pagination, skipped) = decode_appointments(record, filter.page, filter.limit);
            let received = (batch.len() + skipped) as i64;
            appointments.append(&mut batch);

            // A short page is the last one, whatever totalPages claims.
            if received == 0 || received < pagination.limit || i64::from(filter.page) >= pagination.total_pages {
                break;
            }
            if filter.page >= MAX_PAYOUT_PAGES {
                warn!(
                    "Stopped reading appointments for therapist {} after {} pages",
                    therapist_id, MAX_PAYOUT_PAGES
                );
                break;
            }
            filter.page += 1;
        }

        debug!("Fetched {} appointments for therapist {}", appointments.len(), therapist_id);
        Ok(appointments)
    }
}
