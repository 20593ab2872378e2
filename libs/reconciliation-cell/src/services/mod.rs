pub mod gates;
pub mod payout;
pub mod sessions;
pub mod status;

pub use gates::action_gates;
pub use payout::PayoutCalculator;
pub use sessions::{reconcile_session, summarize_sessions};
pub use status::{reconcile, reconcile_payment, workflow_badge};
