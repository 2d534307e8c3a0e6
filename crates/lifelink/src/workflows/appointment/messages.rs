use chrono::NaiveDate;

use super::domain::AppointmentStatus;

/// Donor-facing text for a hospital's response.
pub fn compose_response_message(
    status: AppointmentStatus,
    donor_name: &str,
    hospital_name: &str,
    date: NaiveDate,
    time: &str,
) -> String {
    let date = date.format("%Y-%m-%d");
    match status {
        AppointmentStatus::Accepted => format!(
            "Hello {donor_name}, {hospital_name} has accepted your donation appointment on {date} at {time}."
        ),
        AppointmentStatus::Cancelled => format!(
            "Hello {donor_name}, {hospital_name} has cancelled your donation appointment on {date} at {time}."
        ),
        AppointmentStatus::Rescheduled => format!(
            "Hello {donor_name}, {hospital_name} has rescheduled your donation appointment to {date} at {time}."
        ),
        AppointmentStatus::Pending => format!(
            "Hello {donor_name}, your donation appointment with {hospital_name} on {date} at {time} is awaiting confirmation."
        ),
    }
}

pub fn response_subject(status: AppointmentStatus) -> &'static str {
    match status {
        AppointmentStatus::Accepted => "Your appointment has been accepted",
        AppointmentStatus::Cancelled => "Your appointment has been cancelled",
        AppointmentStatus::Rescheduled => "Your appointment has been rescheduled",
        AppointmentStatus::Pending => "Your appointment is pending",
    }
}

/// Hospital-facing text for a new booking.
pub fn booking_notice(donor_name: &str, date: NaiveDate, time: &str) -> String {
    format!(
        "{donor_name} has booked a donation appointment for {} at {time}.",
        date.format("%Y-%m-%d")
    )
}
