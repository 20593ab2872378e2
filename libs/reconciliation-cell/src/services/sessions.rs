// libs/reconciliation-cell/src/services/sessions.rs
use crate::models::{PaymentLabel, Session, SessionPaymentStatus, SessionPaymentTag, SessionSummary};

/// Payment tag for one sub-session of a package.
///
/// Balance and subscription signals live on the appointment, so only the
/// session's own bookkeeping is consulted.
pub fn reconcile_session(session: &Session) -> SessionPaymentTag {
    let label = match &session.payment_status {
        SessionPaymentStatus::NotPaid => PaymentLabel::NoPayment,
        SessionPaymentStatus::Failed => PaymentLabel::VerificationFailed,
        _ if session.checkout_session_id.is_some() && session.stripe_verified == Some(false) => {
            PaymentLabel::VerificationFailed
        }
        SessionPaymentStatus::Paid | SessionPaymentStatus::Completed => PaymentLabel::Paid,
        _ => PaymentLabel::Pending,
    };

    SessionPaymentTag {
        id: session.id.clone(),
        label,
        text: label.text(),
        paid: label == PaymentLabel::Paid,
    }
}

/// Tags every session and counts the paid ones ("2 of 3 paid").
pub fn summarize_sessions(sessions: &[Session]) -> SessionSummary {
    let tags: Vec<SessionPaymentTag> = sessions.iter().map(reconcile_session).collect();
    let paid = tags.iter().filter(|tag| tag.paid).count();
    let total = tags.len();

    SessionSummary {
        paid,
        total,
        text: format!("{} of {} paid", paid, total),
        sessions: tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;

    fn session(payment_status: &str) -> Session {
        Session {
            id: None,
            status: AppointmentStatus::Completed,
            payment_status: SessionPaymentStatus::from_wire(Some(payment_status)),
            checkout_session_id: None,
            stripe_verified: None,
            price: None,
            payment_percentage: None,
            date: None,
        }
    }

    #[test]
    fn test_two_of_three_paid() {
        let summary = summarize_sessions(&[session("completed"), session("not_paid"), session("completed")]);

        assert_eq!(summary.paid, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.text, "2 of 3 paid");
        assert_eq!(summary.sessions[1].label, PaymentLabel::NoPayment);
    }

    #[test]
    fn test_paid_and_completed_both_count() {
        let summary = summarize_sessions(&[session("paid"), session("completed")]);
        assert_eq!(summary.paid, 2);
    }

    #[test]
    fn test_failed_verification_blocks_paid() {
        let mut s = session("paid");
        s.checkout_session_id = Some("cs_9".to_string());
        s.stripe_verified = Some(false);

        let tag = reconcile_session(&s);
        assert_eq!(tag.label, PaymentLabel::VerificationFailed);
        assert!(!tag.paid);
    }

    #[test]
    fn test_unknown_status_is_pending() {
        assert_eq!(reconcile_session(&session("??")).label, PaymentLabel::Pending);
    }

    #[test]
    fn test_empty_package() {
        let summary = summarize_sessions(&[]);
        assert_eq!(summary.text, "0 of 0 paid");
    }
}
