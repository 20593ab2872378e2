// libs/reconciliation-cell/src/services/status.rs
//! The one place appointment status and payment signals are folded into
//! what an operator sees. Admin and therapist views both go through here.

use crate::models::{
    Appointment, AppointmentStatus, BalanceFlag, PaymentLabel, PaymentResolution, PayoutRejection,
    ReconciledStatus, StatusBadge, StatusTag, StyleCategory, SubscriptionStatus,
};
use crate::services::{gates::action_gates, sessions::summarize_sessions};

/// Maps the workflow status onto a list badge.
pub fn workflow_badge(appointment: &Appointment) -> StatusBadge {
    let (tag, style) = match &appointment.status {
        AppointmentStatus::Unpaid => (StatusTag::Unpaid, StyleCategory::Warning),
        AppointmentStatus::Pending => (StatusTag::Pending, StyleCategory::Warning),
        AppointmentStatus::PendingApproval => (StatusTag::PendingApproval, StyleCategory::Warning),
        AppointmentStatus::Approved => (StatusTag::Approved, StyleCategory::Success),
        AppointmentStatus::Confirmed => (StatusTag::Confirmed, StyleCategory::Success),
        AppointmentStatus::InProgress => (StatusTag::InProgress, StyleCategory::Neutral),
        AppointmentStatus::Completed => (StatusTag::Completed, StyleCategory::Success),
        AppointmentStatus::Rescheduled => (StatusTag::Rescheduled, StyleCategory::Neutral),
        AppointmentStatus::Rejected => (StatusTag::Rejected, StyleCategory::Danger),
        AppointmentStatus::Cancelled => (StatusTag::Cancelled, StyleCategory::Danger),
        AppointmentStatus::NoShow => (StatusTag::NoShow, StyleCategory::Danger),
        AppointmentStatus::Unknown(_) => (StatusTag::Unknown, StyleCategory::Neutral),
    };

    let note = if appointment.status.is_terminal_negative() {
        appointment.decline_comment.clone()
    } else {
        None
    };

    let payout_rejected = appointment.is_payout_rejected.then(|| PayoutRejection {
        label: "Payout Rejected",
        note: appointment.rejected_payout_note.clone(),
    });

    StatusBadge {
        tag,
        label: tag.label(),
        style,
        note,
        payout_rejected,
    }
}

/// Decides whether the appointment's payment is settled, and how to say so.
///
/// Precedence, first match wins:
/// 1. balance drawn down
/// 2. active subscription that the processor also reports active
/// 3. no checkout session recorded
/// 4. processor verification explicitly failed
/// 5. subscription canceled / past due / unpaid
/// 6. processor verified
/// 7. pending
pub fn reconcile_payment(appointment: &Appointment) -> PaymentResolution {
    let processor_status = appointment.stripe_payment_status.clone();

    let label = if appointment.balance == BalanceFlag::BalanceUsed {
        PaymentLabel::BalanceUsed
    } else if appointment.subscription_status == SubscriptionStatus::Active && appointment.is_stripe_active {
        PaymentLabel::ActiveSubscription
    } else if appointment.checkout_session_id.is_none() {
        PaymentLabel::NoPayment
    } else if appointment.stripe_verified == Some(false) {
        PaymentLabel::VerificationFailed
    } else if let Some(lapsed) = lapsed_subscription(&appointment.subscription_status) {
        lapsed
    } else if appointment.stripe_verified == Some(true) {
        PaymentLabel::Paid
    } else {
        PaymentLabel::Pending
    };

    PaymentResolution::new(label, processor_status)
}

fn lapsed_subscription(status: &SubscriptionStatus) -> Option<PaymentLabel> {
    match status {
        SubscriptionStatus::Canceled => Some(PaymentLabel::SubscriptionCanceled),
        SubscriptionStatus::PastDue => Some(PaymentLabel::SubscriptionPastDue),
        SubscriptionStatus::Unpaid => Some(PaymentLabel::SubscriptionUnpaid),
        _ => None,
    }
}

/// Full derivation for one list row.
pub fn reconcile(appointment: &Appointment) -> ReconciledStatus {
    let payment = reconcile_payment(appointment);
    let actions = action_gates(appointment, &payment);

    ReconciledStatus {
        id: appointment.id.clone(),
        status: appointment.status.clone(),
        workflow: workflow_badge(appointment),
        sessions: summarize_sessions(&appointment.sessions),
        payment,
        actions,
    }
}
