// libs/dashboard-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use reconciliation_cell::models::{Appointment, Party, PaymentStatus, ReconciledStatus};
use reconciliation_cell::services::reconcile;
use reconciliation_cell::wire::{
    lenient_array, lenient_bool, lenient_i64, lenient_pagination, lenient_string, PaginationRecord,
};
use shared_backend::QueryParams;

use crate::error::DashboardError;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn validate_paging(page: u32, limit: u32) -> Result<(), DashboardError> {
    if page < 1 {
        return Err(DashboardError::Validation("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(DashboardError::Validation(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(())
}

fn push_opt(query: &mut QueryParams, key: &'static str, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        query.push((key, v.to_string()));
    }
}

/// Admin appointment list filter, mirrored 1:1 onto the backend query string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentFilter {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub search: Option<String>,
    pub therapist: Option<String>,
    pub plan: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for AppointmentFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
            therapist: None,
            plan: None,
            start_date: None,
            end_date: None,
        }
    }
}

impl AppointmentFilter {
    pub fn validate(&self) -> Result<(), DashboardError> {
        validate_paging(self.page, self.limit)?;
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(DashboardError::Validation(
                    "startDate must not be after endDate".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn to_query(&self) -> QueryParams {
        let mut query: QueryParams = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        push_opt(&mut query, "search", &self.search);
        push_opt(&mut query, "therapist", &self.therapist);
        push_opt(&mut query, "plan", &self.plan);
        if let Some(start) = self.start_date {
            query.push(("startDate", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            query.push(("endDate", end.format("%Y-%m-%d").to_string()));
        }
        query
    }

    pub fn for_therapist(therapist_id: &str, limit: u32) -> Self {
        Self {
            therapist: Some(therapist_id.to_string()),
            limit,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientFilter {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for PatientFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            search: None,
        }
    }
}

impl PatientFilter {
    pub fn validate(&self) -> Result<(), DashboardError> {
        validate_paging(self.page, self.limit)
    }

    pub fn to_query(&self) -> QueryParams {
        let mut query: QueryParams = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        push_opt(&mut query, "search", &self.search);
        query
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapistFilter {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub status: Option<String>,
}

impl Default for TherapistFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            status: None,
        }
    }
}

impl TherapistFilter {
    pub fn validate(&self) -> Result<(), DashboardError> {
        validate_paging(self.page, self.limit)
    }

    pub fn to_query(&self) -> QueryParams {
        let mut query: QueryParams = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        push_opt(&mut query, "status", &self.status);
        query
    }
}

// ==============================================================================
// REQUEST BODIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTherapistRequest {
    pub therapist_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusRequest {
    pub payment_status: String,
}

impl PaymentStatusRequest {
    /// Only the four bookkeeping states the backend accepts.
    pub fn parse(&self) -> Result<PaymentStatus, DashboardError> {
        match PaymentStatus::from_wire(Some(&self.payment_status)) {
            PaymentStatus::Unknown(raw) => Err(DashboardError::Validation(format!(
                "unsupported payment status '{}'",
                raw
            ))),
            status => Ok(status),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPaymentRequest {
    pub payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPaymentsRequest {
    pub user_id: String,
    pub customer_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanPatientRequest {
    pub banned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBalanceRequest {
    pub sessions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectPayoutRequest {
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclineRequest {
    pub comment: Option<String>,
}

/// Body of `PUT /api/therapist/appointments/{id}/status` and `.../validate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_comment: Option<String>,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageInfo {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl PageInfo {
    /// Fills gaps in the backend's pagination block from what was requested.
    pub fn from_record(record: &PaginationRecord, page: u32, limit: u32, rows: usize) -> Self {
        let limit = record.limit.filter(|l| *l > 0).unwrap_or(limit as i64);
        let total = record.total.unwrap_or(rows as i64).max(0);
        let total_pages = record
            .total_pages
            .map(|pages| pages.max(0))
            .unwrap_or_else(|| if limit > 0 { total / limit + i64::from(total % limit != 0) } else { 0 });

        Self {
            total,
            page: record.page.unwrap_or(page as i64),
            limit,
            total_pages,
        }
    }
}

/// One list row: display fields plus the reconciled status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentRow {
    pub id: Option<String>,
    pub patient: Option<Party>,
    pub therapist: Option<Party>,
    pub date: Option<DateTime<Utc>>,
    pub plan: Option<String>,
    pub price: Option<f64>,
    pub reconciled: ReconciledStatus,
}

impl From<&Appointment> for AppointmentRow {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.clone(),
            patient: appointment.patient.clone(),
            therapist: appointment.therapist.clone(),
            date: appointment.date,
            plan: appointment.plan.clone(),
            price: appointment.price,
            reconciled: reconcile(appointment),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppointmentPage {
    pub appointments: Vec<AppointmentRow>,
    pub pagination: PageInfo,
    /// Records dropped because they were not JSON objects.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_banned: Option<bool>,
    #[serde(deserialize_with = "lenient_i64")]
    pub session_balance: Option<i64>,
    #[serde(deserialize_with = "lenient_string")]
    pub stripe_customer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientPageRecord {
    #[serde(alias = "data", alias = "users", deserialize_with = "lenient_array")]
    pub patients: Vec<serde_json::Value>,
    #[serde(deserialize_with = "lenient_pagination")]
    pub pagination: PaginationRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientPage {
    pub patients: Vec<Patient>,
    pub pagination: PageInfo,
}

pub fn require_id<'a>(kind: &str, id: &'a str) -> Result<&'a str, DashboardError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(DashboardError::Validation(format!("{} id must not be empty", kind)))
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_filter_query_skips_blank_values() {
        let filter = AppointmentFilter {
            page: 2,
            search: Some("  ".to_string()),
            therapist: Some("t-1".to_string()),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..AppointmentFilter::default()
        };

        assert_eq!(
            filter.to_query(),
            vec![
                ("page", "2".to_string()),
                ("limit", "10".to_string()),
                ("therapist", "t-1".to_string()),
                ("startDate", "2024-01-01".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter_validation() {
        let reversed = AppointmentFilter {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..AppointmentFilter::default()
        };
        assert_matches!(reversed.validate(), Err(DashboardError::Validation(_)));

        let huge = AppointmentFilter { limit: 1000, ..AppointmentFilter::default() };
        assert_matches!(huge.validate(), Err(DashboardError::Validation(_)));

        let zero = PatientFilter { page: 0, ..PatientFilter::default() };
        assert_matches!(zero.validate(), Err(DashboardError::Validation(_)));
    }

    #[test]
    fn test_filter_deserializes_from_camel_case_query() {
        let filter: AppointmentFilter = serde_json::from_value(serde_json::json!({
            "startDate": "2024-03-01",
            "plan": "weekly"
        }))
        .unwrap();

        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filter.plan.as_deref(), Some("weekly"));
        assert!(filter.start_date.is_some());
    }

    #[test]
    fn test_payment_status_request_parse() {
        let ok = PaymentStatusRequest { payment_status: "Refunded".to_string() };
        assert_eq!(ok.parse().unwrap(), PaymentStatus::Refunded);

        let bad = PaymentStatusRequest { payment_status: "teleported".to_string() };
        assert_matches!(bad.parse(), Err(DashboardError::Validation(_)));
    }

    #[test]
    fn test_page_info_fills_gaps() {
        let info = PageInfo::from_record(&PaginationRecord { total: Some(25), ..Default::default() }, 3, 10, 5);
        assert_eq!(info, PageInfo { total: 25, page: 3, limit: 10, total_pages: 3 });
    }

    #[test]
    fn test_page_info_survives_absurd_totals() {
        let huge: PaginationRecord = serde_json::from_value(serde_json::json!({ "total": 1e30 })).unwrap();
        let info = PageInfo::from_record(&huge, 1, 10, 0);
        assert_eq!(info.total, i64::MAX);
        assert_eq!(info.total_pages, i64::MAX / 10 + 1);

        let negative: PaginationRecord =
            serde_json::from_value(serde_json::json!({ "total": -5, "totalPages": -2 })).unwrap();
        let info = PageInfo::from_record(&negative, 1, 10, 0);
        assert_eq!(info.total, 0);
        assert_eq!(info.total_pages, 0);
    }

    #[test]
    fn test_require_id() {
        assert_eq!(require_id("appointment", " a1 ").unwrap(), "a1");
        assert_matches!(require_id("appointment", "  "), Err(DashboardError::Validation(_)));
    }
}
