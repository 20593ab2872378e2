// libs/reconciliation-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::wire::{AppointmentRecord, PartyRecord, SessionRecord};

// ==============================================================================
// STATUS ENUMERATIONS
// ==============================================================================

/// Lowercases and folds `-`/space into `_` so `No-Show`, `no_show` and
/// `PAST DUE` all compare equal to their canonical spelling.
fn normalize(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppointmentStatus {
    Unpaid,
    Pending,
    PendingApproval,
    Approved,
    Confirmed,
    Rejected,
    Cancelled,
    Completed,
    InProgress,
    NoShow,
    Rescheduled,
    Unknown(String),
}

impl AppointmentStatus {
    pub fn from_wire(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return AppointmentStatus::Unknown(String::new());
        };
        match normalize(raw).as_str() {
            "unpaid" => AppointmentStatus::Unpaid,
            "pending" => AppointmentStatus::Pending,
            "pending_approval" => AppointmentStatus::PendingApproval,
            "approved" => AppointmentStatus::Approved,
            "confirmed" => AppointmentStatus::Confirmed,
            "rejected" => AppointmentStatus::Rejected,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            "completed" => AppointmentStatus::Completed,
            "in_progress" => AppointmentStatus::InProgress,
            "no_show" => AppointmentStatus::NoShow,
            "rescheduled" => AppointmentStatus::Rescheduled,
            _ => AppointmentStatus::Unknown(raw.to_string()),
        }
    }

    /// The spelling the backend expects when this status is written back.
    pub fn as_wire(&self) -> &str {
        match self {
            AppointmentStatus::Unpaid => "unpaid",
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::PendingApproval => "pending_approval",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::NoShow => "no-show",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Unknown(raw) => raw,
        }
    }

    pub fn is_terminal_negative(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Rejected)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for AppointmentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Refunded,
    Failed,
    Unknown(String),
}

impl PaymentStatus {
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(normalize).as_deref() {
            Some("pending") => PaymentStatus::Pending,
            Some("completed") => PaymentStatus::Completed,
            Some("refunded") => PaymentStatus::Refunded,
            Some("failed") => PaymentStatus::Failed,
            _ => PaymentStatus::Unknown(raw.unwrap_or_default().to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Unknown(raw) => raw,
        }
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

/// Per-session bookkeeping. Kept apart from [`PaymentStatus`]: the backend
/// never reconciles a session's `paid` with its appointment's `completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPaymentStatus {
    Paid,
    Completed,
    NotPaid,
    Pending,
    Failed,
    Refunded,
    Unknown(String),
}

impl SessionPaymentStatus {
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(normalize).as_deref() {
            Some("paid") => SessionPaymentStatus::Paid,
            Some("completed") => SessionPaymentStatus::Completed,
            Some("not_paid") | Some("unpaid") => SessionPaymentStatus::NotPaid,
            Some("pending") => SessionPaymentStatus::Pending,
            Some("failed") => SessionPaymentStatus::Failed,
            Some("refunded") => SessionPaymentStatus::Refunded,
            _ => SessionPaymentStatus::Unknown(raw.unwrap_or_default().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Unpaid,
    Trialing,
    Incomplete,
    /// Missing, or the processor reported `none`.
    NoSubscription,
    Other(String),
}

impl SubscriptionStatus {
    pub fn from_wire(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return SubscriptionStatus::NoSubscription;
        };
        match normalize(raw).as_str() {
            "active" => SubscriptionStatus::Active,
            "canceled" | "cancelled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            "trialing" => SubscriptionStatus::Trialing,
            "incomplete" | "incomplete_expired" => SubscriptionStatus::Incomplete,
            "none" | "" => SubscriptionStatus::NoSubscription,
            _ => SubscriptionStatus::Other(raw.to_string()),
        }
    }
}

/// Whether the appointment was settled from a pre-purchased session balance.
///
/// `Unset` and `NotBalanceUsed` are kept apart on purpose: the backend writes
/// `null` for appointments booked before balances existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceFlag {
    #[default]
    Unset,
    BalanceUsed,
    NotBalanceUsed,
}

impl From<Option<bool>> for BalanceFlag {
    fn from(raw: Option<bool>) -> Self {
        match raw {
            Some(true) => BalanceFlag::BalanceUsed,
            Some(false) => BalanceFlag::NotBalanceUsed,
            None => BalanceFlag::Unset,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TherapistLevel {
    One,
    Two,
    Other(i64),
}

impl From<i64> for TherapistLevel {
    fn from(level: i64) -> Self {
        match level {
            1 => TherapistLevel::One,
            2 => TherapistLevel::Two,
            other => TherapistLevel::Other(other),
        }
    }
}

impl TherapistLevel {
    pub fn as_number(&self) -> i64 {
        match self {
            TherapistLevel::One => 1,
            TherapistLevel::Two => 2,
            TherapistLevel::Other(level) => *level,
        }
    }
}

impl Serialize for TherapistLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutStatus {
    Pending,
    Available,
    Paid,
    Rejected,
    Unknown(String),
}

impl PayoutStatus {
    /// A missing payout status means nothing has been paid out yet.
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(normalize).as_deref() {
            None | Some("pending") => PayoutStatus::Pending,
            Some("available") => PayoutStatus::Available,
            Some("paid") | Some("paid_out") => PayoutStatus::Paid,
            Some("rejected") => PayoutStatus::Rejected,
            Some(_) => PayoutStatus::Unknown(raw.unwrap_or_default().to_string()),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PayoutStatus::Pending | PayoutStatus::Available)
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Party {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<PartyRecord> for Party {
    fn from(record: PartyRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
        }
    }
}

/// Typed projection of one backend appointment.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub stripe_payment_status: Option<String>,
    pub stripe_verified: Option<bool>,
    pub subscription_status: SubscriptionStatus,
    pub is_stripe_active: bool,
    pub balance: BalanceFlag,
    pub checkout_session_id: Option<String>,
    pub decline_comment: Option<String>,
    pub is_payout_rejected: bool,
    pub rejected_payout_note: Option<String>,
    pub payout_status: PayoutStatus,
    pub price: Option<f64>,
    pub payment_percentage: Option<f64>,
    pub therapist: Option<Party>,
    pub therapist_level: Option<TherapistLevel>,
    pub patient: Option<Party>,
    pub date: Option<DateTime<Utc>>,
    pub plan: Option<String>,
    /// `sessions` followed by `recurring`, in backend order.
    pub sessions: Vec<Session>,
}

impl Default for Appointment {
    fn default() -> Self {
        AppointmentRecord::default().into()
    }
}

impl From<AppointmentRecord> for Appointment {
    fn from(record: AppointmentRecord) -> Self {
        let id = record.identifier().map(str::to_string);
        let therapist_level = record
            .therapist
            .as_ref()
            .and_then(|t| t.level)
            .map(TherapistLevel::from);

        let sessions = record
            .sessions
            .into_iter()
            .chain(record.recurring)
            .map(Session::from)
            .collect();

        Self {
            id,
            status: AppointmentStatus::from_wire(record.status.as_deref()),
            payment_status: PaymentStatus::from_wire(record.payment_status.as_deref()),
            stripe_payment_status: record.stripe_payment_status,
            stripe_verified: record.stripe_verified,
            subscription_status: SubscriptionStatus::from_wire(record.stripe_subscription_status.as_deref()),
            is_stripe_active: record.is_stripe_active.unwrap_or(false),
            balance: BalanceFlag::from(record.is_balance),
            checkout_session_id: record.checkout_session_id,
            decline_comment: record.decline_comment,
            is_payout_rejected: record.is_payout_rejected.unwrap_or(false),
            rejected_payout_note: record.rejected_payout_note,
            payout_status: PayoutStatus::from_wire(record.payout_status.as_deref()),
            price: record.price,
            payment_percentage: record.payment_percentage,
            therapist: record.therapist.map(Party::from),
            therapist_level,
            patient: record.patient.map(Party::from),
            date: record.date.as_deref().and_then(parse_date),
            plan: record.plan,
            sessions,
        }
    }
}

impl Appointment {
    /// Decodes a raw backend value, `None` when it is not a JSON object.
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        AppointmentRecord::from_value(value).map(Appointment::from)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: SessionPaymentStatus,
    pub checkout_session_id: Option<String>,
    pub stripe_verified: Option<bool>,
    pub price: Option<f64>,
    pub payment_percentage: Option<f64>,
    pub date: Option<DateTime<Utc>>,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Self {
            id: record.mongo_id,
            status: AppointmentStatus::from_wire(record.status.as_deref()),
            payment_status: SessionPaymentStatus::from_wire(record.payment_status.as_deref()),
            checkout_session_id: record.checkout_session_id,
            stripe_verified: record.stripe_verified,
            price: record.price,
            payment_percentage: record.payment_percentage,
            date: record.date.as_deref().and_then(parse_date),
        }
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        })
}

// ==============================================================================
// DISPLAY MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleCategory {
    Success,
    Warning,
    Danger,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    Unpaid,
    Pending,
    PendingApproval,
    Approved,
    Confirmed,
    InProgress,
    Completed,
    Rescheduled,
    Rejected,
    Cancelled,
    NoShow,
    Unknown,
}

impl StatusTag {
    pub fn label(&self) -> &'static str {
        match self {
            StatusTag::Unpaid => "Unpaid",
            StatusTag::Pending => "Pending",
            StatusTag::PendingApproval => "Pending Approval",
            StatusTag::Approved => "Approved",
            StatusTag::Confirmed => "Confirmed",
            StatusTag::InProgress => "In Progress",
            StatusTag::Completed => "Completed",
            StatusTag::Rescheduled => "Rescheduled",
            StatusTag::Rejected => "Rejected",
            StatusTag::Cancelled => "Cancelled",
            StatusTag::NoShow => "No Show",
            StatusTag::Unknown => "Unknown",
        }
    }
}

/// Workflow status as shown in list views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBadge {
    pub tag: StatusTag,
    pub label: &'static str,
    pub style: StyleCategory,
    /// Decline comment for rejected/cancelled appointments.
    pub note: Option<String>,
    pub payout_rejected: Option<PayoutRejection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutRejection {
    pub label: &'static str,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentLabel {
    BalanceUsed,
    ActiveSubscription,
    NoPayment,
    VerificationFailed,
    SubscriptionCanceled,
    SubscriptionPastDue,
    SubscriptionUnpaid,
    Paid,
    Pending,
}

impl PaymentLabel {
    pub fn text(&self) -> &'static str {
        match self {
            PaymentLabel::BalanceUsed => "Balance Used",
            PaymentLabel::ActiveSubscription => "Active Subscription",
            PaymentLabel::NoPayment => "No Payment",
            PaymentLabel::VerificationFailed => "Payment Verification Failed",
            PaymentLabel::SubscriptionCanceled => "Canceled",
            // Dunning is still running, so this one is shouted.
            PaymentLabel::SubscriptionPastDue => "PAST DUE",
            PaymentLabel::SubscriptionUnpaid => "Unpaid",
            PaymentLabel::Paid => "Paid",
            PaymentLabel::Pending => "Pending",
        }
    }

    pub fn style(&self) -> StyleCategory {
        match self {
            PaymentLabel::BalanceUsed | PaymentLabel::ActiveSubscription | PaymentLabel::Paid => {
                StyleCategory::Success
            }
            PaymentLabel::Pending | PaymentLabel::SubscriptionPastDue => StyleCategory::Warning,
            PaymentLabel::NoPayment
            | PaymentLabel::VerificationFailed
            | PaymentLabel::SubscriptionCanceled
            | PaymentLabel::SubscriptionUnpaid => StyleCategory::Danger,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            PaymentLabel::BalanceUsed | PaymentLabel::ActiveSubscription | PaymentLabel::Paid
        )
    }
}

impl fmt::Display for PaymentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResolution {
    pub label: PaymentLabel,
    pub text: &'static str,
    pub style: StyleCategory,
    pub resolved: bool,
    /// Raw processor payment status, passed through for operators.
    pub processor_status: Option<String>,
}

impl PaymentResolution {
    pub fn new(label: PaymentLabel, processor_status: Option<String>) -> Self {
        Self {
            label,
            text: label.text(),
            style: label.style(),
            resolved: label.is_resolved(),
            processor_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionPaymentTag {
    pub id: Option<String>,
    pub label: PaymentLabel,
    pub text: &'static str,
    pub paid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub paid: usize,
    pub total: usize,
    pub text: String,
    pub sessions: Vec<SessionPaymentTag>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionGates {
    pub can_complete_session: bool,
    pub can_link_payment: bool,
    pub payout_eligible: bool,
}

/// Everything a list row needs, derived from one appointment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledStatus {
    pub id: Option<String>,
    pub status: AppointmentStatus,
    pub workflow: StatusBadge,
    pub payment: PaymentResolution,
    pub sessions: SessionSummary,
    pub actions: ActionGates,
}

// ==============================================================================
// PAYOUT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentPayout {
    pub appointment_id: Option<String>,
    pub sessions: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutSummary {
    pub therapist_level: TherapistLevel,
    pub total: f64,
    pub appointments: Vec<AppointmentPayout>,
    /// Appointments left out because they are not payout eligible.
    pub excluded: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconciliationError {
    #[error("Request body must be an appointment object or an array of them")]
    InvalidBody,

    #[error("Invalid therapist level: {0}")]
    InvalidLevel(String),
}
