// libs/reconciliation-cell/src/services/gates.rs
use crate::models::{ActionGates, Appointment, AppointmentStatus, PaymentLabel, PaymentResolution};

/// Which operator actions the reconciled payment state allows.
pub fn action_gates(appointment: &Appointment, payment: &PaymentResolution) -> ActionGates {
    let can_complete_session = payment.resolved
        && matches!(
            appointment.status,
            AppointmentStatus::Confirmed | AppointmentStatus::Approved | AppointmentStatus::InProgress
        );

    let can_link_payment = !payment.resolved
        && matches!(
            payment.label,
            PaymentLabel::NoPayment | PaymentLabel::VerificationFailed | PaymentLabel::Pending
        )
        && !appointment.status.is_terminal_negative();

    let payout_eligible = payment.resolved
        && appointment.status == AppointmentStatus::Completed
        && !appointment.is_payout_rejected
        && appointment.payout_status.is_open();

    ActionGates {
        can_complete_session,
        can_link_payment,
        payout_eligible,
    }
}
