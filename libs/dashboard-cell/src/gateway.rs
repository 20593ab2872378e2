// libs/dashboard-cell/src/gateway.rs
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use reconciliation_cell::wire::AppointmentPageRecord;
use shared_backend::{encode_segment, BackendClient, BackendError};

use crate::models::{
    AppointmentFilter, PatientFilter, PatientPageRecord, StatusUpdate, TherapistFilter,
    VerifiedPaymentsRequest,
};

/// Backend operations the dashboard performs on behalf of the signed-in user.
///
/// Every call forwards the caller's bearer token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminGateway: Send + Sync {
    async fn list_appointments(
        &self,
        token: &str,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPageRecord, BackendError>;

    async fn assign_therapist(&self, token: &str, appointment_id: &str, therapist_id: &str) -> Result<(), BackendError>;

    async fn revoke_therapist(&self, token: &str, appointment_id: &str) -> Result<(), BackendError>;

    async fn update_payment_status(&self, token: &str, appointment_id: &str, status: &str) -> Result<(), BackendError>;

    async fn link_payment(&self, token: &str, appointment_id: &str, payment_id: &str) -> Result<(), BackendError>;

    async fn list_patients(&self, token: &str, filter: &PatientFilter) -> Result<PatientPageRecord, BackendError>;

    async fn set_patient_banned(&self, token: &str, patient_id: &str, banned: bool) -> Result<(), BackendError>;

    async fn set_session_balance(&self, token: &str, patient_id: &str, sessions: i64) -> Result<(), BackendError>;

    async fn verified_payments(&self, token: &str, request: &VerifiedPaymentsRequest) -> Result<Value, BackendError>;

    async fn reject_payout(&self, token: &str, appointment_id: &str, note: &str) -> Result<(), BackendError>;

    async fn mark_payout_paid(&self, token: &str, appointment_id: &str) -> Result<(), BackendError>;

    async fn list_therapist_appointments(
        &self,
        token: &str,
        filter: &TherapistFilter,
    ) -> Result<AppointmentPageRecord, BackendError>;

    async fn get_therapist_appointment(&self, token: &str, appointment_id: &str) -> Result<Value, BackendError>;

    async fn validate_session(
        &self,
        token: &str,
        appointment_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), BackendError>;

    async fn update_therapist_status(
        &self,
        token: &str,
        appointment_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), BackendError>;
}

/// [`AdminGateway`] over the platform REST backend.
#[derive(Clone)]
pub struct BackendGateway {
    client: BackendClient,
}

impl BackendGateway {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn put_ignoring_body(&self, path: String, token: &str, body: Option<Value>) -> Result<(), BackendError> {
        self.client.put(&path, token, body).await.map(|_| ())
    }
}

fn admin_appointment(id: &str, action: &str) -> String {
    format!("/api/admin/appointments/{}/{}", encode_segment(id), action)
}

fn admin_patient(id: &str, action: &str) -> String {
    format!("/api/admin/users/patients/{}/{}", encode_segment(id), action)
}

fn admin_payment(id: &str, action: &str) -> String {
    format!("/api/admin/payments/{}/{}", encode_segment(id), action)
}

fn therapist_appointment(id: &str) -> String {
    format!("/api/therapist/appointments/{}", encode_segment(id))
}

#[async_trait]
impl AdminGateway for BackendGateway {
    async fn list_appointments(
        &self,
        token: &str,
        filter: &AppointmentFilter,
    ) -> Result<AppointmentPageRecord, BackendError> {
        debug!("Listing admin appointments, page {}", filter.page);
        self.client
            .get("/api/admin/appointments/all/filter", token, &filter.to_query())
            .await
    }

    async fn assign_therapist(&self, token: &str, appointment_id: &str, therapist_id: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(
            admin_appointment(appointment_id, "assign"),
            token,
            Some(json!({ "therapistId": therapist_id })),
        )
        .await
    }

    async fn revoke_therapist(&self, token: &str, appointment_id: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(admin_appointment(appointment_id, "revoke"), token, None)
            .await
    }

    async fn update_payment_status(&self, token: &str, appointment_id: &str, status: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(
            admin_appointment(appointment_id, "paymentStatus"),
            token,
            Some(json!({ "paymentStatus": status })),
        )
        .await
    }

    async fn link_payment(&self, token: &str, appointment_id: &str, payment_id: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(
            admin_appointment(appointment_id, "link-payment"),
            token,
            Some(json!({ "paymentId": payment_id })),
        )
        .await
    }

    async fn list_patients(&self, token: &str, filter: &PatientFilter) -> Result<PatientPageRecord, BackendError> {
        self.client
            .get("/api/admin/users/patients", token, &filter.to_query())
            .await
    }

    async fn set_patient_banned(&self, token: &str, patient_id: &str, banned: bool) -> Result<(), BackendError> {
        self.put_ignoring_body(admin_patient(patient_id, "ban"), token, Some(json!({ "banned": banned })))
            .await
    }

    async fn set_session_balance(&self, token: &str, patient_id: &str, sessions: i64) -> Result<(), BackendError> {
        self.put_ignoring_body(
            admin_patient(patient_id, "balance"),
            token,
            Some(json!({ "sessions": sessions })),
        )
        .await
    }

    async fn verified_payments(&self, token: &str, request: &VerifiedPaymentsRequest) -> Result<Value, BackendError> {
        let body = serde_json::to_value(request).map_err(|e| BackendError::Decode(e.to_string()))?;
        self.client
            .post("/api/admin/users/patients/verified-payments", token, body)
            .await
    }

    async fn reject_payout(&self, token: &str, appointment_id: &str, note: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(
            admin_payment(appointment_id, "reject-payout"),
            token,
            Some(json!({ "note": note })),
        )
        .await
    }

    async fn mark_payout_paid(&self, token: &str, appointment_id: &str) -> Result<(), BackendError> {
        self.put_ignoring_body(admin_payment(appointment_id, "mark-paid"), token, None)
            .await
    }

    async fn list_therapist_appointments(
        &self,
        token: &str,
        filter: &TherapistFilter,
    ) -> Result<AppointmentPageRecord, BackendError> {
        self.client
            .get("/api/therapist/appointments", token, &filter.to_query())
            .await
    }

    async fn get_therapist_appointment(&self, token: &str, appointment_id: &str) -> Result<Value, BackendError> {
        self.client
            .get(&therapist_appointment(appointment_id), token, &Vec::new())
            .await
    }

    async fn validate_session(
        &self,
        token: &str,
        appointment_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), BackendError> {
        let body = serde_json::to_value(update).map_err(|e| BackendError::Decode(e.to_string()))?;
        self.put_ignoring_body(format!("{}/validate", therapist_appointment(appointment_id)), token, Some(body))
            .await
    }

    async fn update_therapist_status(
        &self,
        token: &str,
        appointment_id: &str,
        update: &StatusUpdate,
    ) -> Result<(), BackendError> {
        let body = serde_json::to_value(update).map_err(|e| BackendError::Decode(e.to_string()))?;
        self.put_ignoring_body(format!("{}/status", therapist_appointment(appointment_id)), token, Some(body))
            .await
    }
}
