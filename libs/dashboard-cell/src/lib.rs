// =====================================================================================
// DASHBOARD CELL - ADMIN AND THERAPIST OPERATIONS OVER THE PLATFORM BACKEND
// =====================================================================================

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::DashboardError;
pub use gateway::{AdminGateway, BackendGateway};
pub use models::*;
pub use router::{admin_routes, therapist_routes, DashboardState};
