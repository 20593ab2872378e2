use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::gateway::AdminGateway;
use crate::models::{require_id, PageInfo, Patient, PatientFilter, PatientPage, VerifiedPaymentsRequest};

pub struct PatientAdminService {
    gateway: Arc<dyn AdminGateway>,
}

impl PatientAdminService {
    pub fn new(gateway: Arc<dyn AdminGateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, token: &str, filter: &PatientFilter) -> Result<PatientPage, DashboardError> {
        filter.validate()?;
        let record = self.gateway.list_patients(token, filter).await?;

        let received = record.patients.len();
        let patients: Vec<Patient> = record
            .patients
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        if patients.len() < received {
            warn!("Skipped {} malformed patient records", received - patients.len());
        }

        let pagination = PageInfo::from_record(&record.pagination, filter.page, filter.limit, patients.len());
        Ok(PatientPage { patients, pagination })
    }

    pub async fn set_banned(
        &self,
        token: &str,
        patient_id: &str,
        banned: bool,
        filter: &PatientFilter,
    ) -> Result<PatientPage, DashboardError> {
        let patient_id = require_id("patient", patient_id)?;
        filter.validate()?;

        info!("Setting banned={} on patient {}", banned, patient_id);
        self.gateway.set_patient_banned(token, patient_id, banned).await?;

        self.list(token, filter).await
    }

    pub async fn set_session_balance(
        &self,
        token: &str,
        patient_id: &str,
        sessions: i64,
        filter: &PatientFilter,
    ) -> Result<PatientPage, DashboardError> {
        let patient_id = require_id("patient", patient_id)?;
        if sessions < 0 {
            return Err(DashboardError::Validation("session balance must not be negative".to_string()));
        }
        filter.validate()?;

        info!("Setting session balance of patient {} to {}", patient_id, sessions);
        self.gateway.set_session_balance(token, patient_id, sessions).await?;

        self.list(token, filter).await
    }

    /// Asks the backend to pull the customer's verified processor payments.
    pub async fn verified_payments(&self, token: &str, request: &VerifiedPaymentsRequest) -> Result<Value, DashboardError> {
        require_id("user", &request.user_id)?;
        require_id("customer", &request.customer_id)?;
        if request.email.trim().is_empty() {
            return Err(DashboardError::Validation("email must not be empty".to_string()));
        }

        Ok(self.gateway.verified_payments(token, request).await?)
    }
}
