pub mod appointments;
pub mod board;
pub mod patients;
pub mod payouts;
pub mod therapist;

pub use appointments::AppointmentAdminService;
pub use board::{
    AdminPageSource, AppointmentBoard, BoardRegistry, BoardSnapshot, BoardView, FetchSequencer, FetchTicket, PageSource,
};
pub use patients::PatientAdminService;
pub use payouts::{PayoutAdminService, PayoutScope};
pub use therapist::TherapistService;

use tracing::warn;

use reconciliation_cell::models::Appointment;
use reconciliation_cell::wire::AppointmentPageRecord;

use crate::models::{AppointmentPage, AppointmentRow, PageInfo};

/// Decodes a backend page, dropping records that are not JSON objects.
pub(crate) fn decode_appointments(record: AppointmentPageRecord, page: u32, limit: u32) -> (Vec<Appointment>, PageInfo, usize) {
    let received = record.appointments.len();
    let appointments: Vec<Appointment> = record
        .appointments
        .into_iter()
        .filter_map(Appointment::from_json)
        .collect();

    let skipped = received - appointments.len();
    if skipped > 0 {
        warn!("Skipped {} malformed appointment records", skipped);
    }

    let pagination = PageInfo::from_record(&record.pagination, page, limit, appointments.len());
    (appointments, pagination, skipped)
}

pub(crate) fn reconciled_page(record: AppointmentPageRecord, page: u32, limit: u32) -> AppointmentPage {
    let (appointments, pagination, skipped) = decode_appointments(record, page, limit);
    AppointmentPage {
        appointments: appointments.iter().map(AppointmentRow::from).collect(),
        pagination,
        skipped,
    }
}
