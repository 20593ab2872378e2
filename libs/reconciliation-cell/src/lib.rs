// =====================================================================================
// RECONCILIATION CELL - APPOINTMENT STATUS, PAYMENT AND PAYOUT DERIVATION
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod wire;

pub use models::*;
pub use router::reconciliation_routes;
pub use services::{reconcile, reconcile_payment, workflow_badge};
