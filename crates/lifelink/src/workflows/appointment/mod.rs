//! Appointment lifecycle: donor booking, hospital responses and donor cancellation.

pub mod domain;
pub mod messages;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Appointment, AppointmentId, AppointmentStatus, BookingForm, HospitalDecision, ResponseForm,
};
pub use messages::{booking_notice, compose_response_message};
pub use repository::AppointmentRepository;
pub use router::appointment_routes;
pub use service::AppointmentService;
