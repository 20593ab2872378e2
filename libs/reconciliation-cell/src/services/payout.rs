// libs/reconciliation-cell/src/services/payout.rs
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentPayout, PayoutSummary, TherapistLevel};
use crate::services::{gates::action_gates, status::reconcile_payment};

pub const LEVEL_TWO_PERCENTAGE: f64 = 0.57;
pub const DEFAULT_PERCENTAGE: f64 = 0.50;

/// Therapist share of a session price.
#[derive(Debug, Clone)]
pub struct PayoutCalculator {
    level_two_percentage: f64,
    default_percentage: f64,
}

impl Default for PayoutCalculator {
    fn default() -> Self {
        Self {
            level_two_percentage: LEVEL_TWO_PERCENTAGE,
            default_percentage: DEFAULT_PERCENTAGE,
        }
    }
}

impl PayoutCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit override wins; otherwise level 2 earns the higher share.
    pub fn percentage(&self, level: TherapistLevel, override_percentage: Option<f64>) -> f64 {
        if let Some(p) = override_percentage.and_then(valid_percentage) {
            return p;
        }
        match level {
            TherapistLevel::Two => self.level_two_percentage,
            _ => self.default_percentage,
        }
    }

    pub fn adjusted_price(&self, price: f64, level: TherapistLevel, override_percentage: Option<f64>) -> f64 {
        round_cents(price * self.percentage(level, override_percentage))
    }

    /// Payable total over the appointments still open for payout.
    ///
    /// Computed from the slice on every call; callers refetch rather than
    /// keep a summary around.
    pub fn therapist_payout(&self, appointments: &[Appointment], level: TherapistLevel) -> PayoutSummary {
        let mut breakdown = Vec::new();
        let mut excluded = 0;

        for appointment in appointments {
            let payment = reconcile_payment(appointment);
            if !action_gates(appointment, &payment).payout_eligible {
                excluded += 1;
                continue;
            }
            breakdown.push(self.appointment_payout(appointment, level));
        }

        let total = round_cents(breakdown.iter().map(|p| p.amount).sum());
        debug!(
            "Computed payout {:.2} over {} appointments ({} excluded) at level {}",
            total,
            breakdown.len(),
            excluded,
            level.as_number()
        );

        PayoutSummary {
            therapist_level: level,
            total,
            appointments: breakdown,
            excluded,
        }
    }

    fn appointment_payout(&self, appointment: &Appointment, level: TherapistLevel) -> AppointmentPayout {
        // A single-session appointment has no sub-session list.
        let amount = if appointment.sessions.is_empty() {
            self.adjusted_price(
                appointment.price.unwrap_or_else(|| missing_price(appointment)),
                level,
                appointment.payment_percentage,
            )
        } else {
            appointment
                .sessions
                .iter()
                .map(|session| {
                    let price = session
                        .price
                        .or(appointment.price)
                        .unwrap_or_else(|| missing_price(appointment));
                    let override_percentage = session
                        .payment_percentage
                        .and_then(valid_percentage)
                        .or(appointment.payment_percentage);
                    self.adjusted_price(price, level, override_percentage)
                })
                .sum::<f64>()
        };

        AppointmentPayout {
            appointment_id: appointment.id.clone(),
            sessions: appointment.sessions.len().max(1),
            amount: round_cents(amount),
        }
    }
}

fn valid_percentage(p: f64) -> Option<f64> {
    if p.is_finite() && p > 0.0 && p <= 1.0 {
        Some(p)
    } else {
        warn!("Ignoring out-of-range payment percentage override: {}", p);
        None
    }
}

fn missing_price(appointment: &Appointment) -> f64 {
    warn!("Appointment {:?} has no price; counting it as 0", appointment.id);
    0.0
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, BalanceFlag, Session, SessionPaymentStatus};

    fn eligible(price: f64) -> Appointment {
        Appointment {
            id: Some("a".to_string()),
            status: AppointmentStatus::Completed,
            balance: BalanceFlag::BalanceUsed,
            price: Some(price),
            ..Appointment::default()
        }
    }

    fn session(price: Option<f64>, percentage: Option<f64>) -> Session {
        Session {
            id: None,
            status: AppointmentStatus::Completed,
            payment_status: SessionPaymentStatus::Paid,
            checkout_session_id: None,
            stripe_verified: None,
            price,
            payment_percentage: percentage,
            date: None,
        }
    }

    #[test]
    fn test_level_percentages() {
        let calc = PayoutCalculator::new();
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::Two, None), 57.00);
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::One, None), 50.00);
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::Other(3), None), 50.00);
    }

    #[test]
    fn test_override_wins_regardless_of_level() {
        let calc = PayoutCalculator::new();
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::One, Some(0.8)), 80.00);
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::Two, Some(0.8)), 80.00);
    }

    #[test]
    fn test_out_of_range_override_is_ignored() {
        let calc = PayoutCalculator::new();
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::Two, Some(80.0)), 57.00);
        assert_eq!(calc.adjusted_price(100.0, TherapistLevel::One, Some(-0.2)), 50.00);
    }

    #[test]
    fn test_session_override_precedes_appointment_override() {
        let calc = PayoutCalculator::new();
        let appt = Appointment {
            payment_percentage: Some(0.6),
            sessions: vec![session(Some(100.0), Some(0.9)), session(None, None)],
            ..eligible(50.0)
        };

        let summary = calc.therapist_payout(&[appt], TherapistLevel::One);
        // 100 * 0.9 + 50 * 0.6
        assert_eq!(summary.total, 120.00);
        assert_eq!(summary.appointments[0].sessions, 2);
    }

    #[test]
    fn test_only_open_eligible_appointments_count() {
        let calc = PayoutCalculator::new();
        let unpaid = Appointment {
            balance: BalanceFlag::Unset,
            ..eligible(100.0)
        };
        let rejected = Appointment {
            is_payout_rejected: true,
            ..eligible(100.0)
        };

        let summary = calc.therapist_payout(&[eligible(200.0), unpaid, rejected], TherapistLevel::Two);
        assert_eq!(summary.total, 114.00);
        assert_eq!(summary.excluded, 2);
    }

    #[test]
    fn test_recomputed_after_list_changes() {
        let calc = PayoutCalculator::new();
        let mut appointments = vec![eligible(100.0)];
        assert_eq!(calc.therapist_payout(&appointments, TherapistLevel::One).total, 50.00);

        appointments.push(eligible(100.0));
        assert_eq!(calc.therapist_payout(&appointments, TherapistLevel::One).total, 100.00);
    }
}
