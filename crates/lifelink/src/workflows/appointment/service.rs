use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    parse_date, parse_time, Appointment, AppointmentId, AppointmentStatus, BookingForm,
    HospitalDecision, ResponseForm,
};
use super::messages::{booking_notice, compose_response_message, response_subject};
use super::repository::AppointmentRepository;
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::identity::{Account, AccountId, AccountRepository, Actor, Role};
use crate::workflows::mailbox::{MailboxService, NotificationDraft};
use crate::workflows::outbound::{MailDispatcher, MailMessage};
use crate::workflows::sequence::next_id;

/// Donor-hospital appointment state machine.
///
/// Transitions go through the repository's compare-and-set, so a stale transition fails with
/// `Conflict` instead of overwriting a concurrent one.
pub struct AppointmentService {
    accounts: Arc<dyn AccountRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    mailbox: Arc<MailboxService>,
    mailer: MailDispatcher,
}

impl AppointmentService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        mailbox: Arc<MailboxService>,
        mailer: MailDispatcher,
    ) -> Self {
        Self {
            accounts,
            appointments,
            mailbox,
            mailer,
        }
    }

    pub async fn book(
        &self,
        actor: &Actor,
        form: BookingForm,
    ) -> Result<Appointment, WorkflowError> {
        actor.require(Role::Donor)?;
        let donor = self.account(&actor.account_id, "donor")?;
        if !donor.is_email_verified() {
            return Err(WorkflowError::forbidden(
                "verify your email before booking an appointment",
            ));
        }

        let date = parse_date(&form.date)?;
        let time = parse_time(&form.time)?;
        if date <= Utc::now().date_naive() {
            return Err(WorkflowError::validation(
                "appointment date must be in the future",
            ));
        }

        let hospital_id = AccountId(form.hospital_id.trim().to_string());
        let hospital = self
            .accounts
            .fetch(&hospital_id)?
            .filter(|account| account.role() == Role::Hospital)
            .ok_or_else(|| WorkflowError::not_found("hospital", hospital_id.as_str()))?;

        let now = Utc::now();
        let appointment = self.appointments.insert(Appointment {
            id: AppointmentId(next_id("appt")),
            donor_id: donor.id.clone(),
            hospital_id: hospital.id.clone(),
            date,
            time,
            status: AppointmentStatus::Pending,
            created_at: now,
            updated_at: now,
            version: 0,
        })?;
        info!(appointment = %appointment.id, donor = %donor.id, hospital = %hospital.id, "appointment booked");

        let notice = booking_notice(&donor.full_name, appointment.date, &appointment.time);
        let draft = NotificationDraft::new(donor.full_name.clone(), notice.clone())
            .for_appointment(appointment.id.0.clone());
        if let Err(error) = self.mailbox.append(&hospital.id, &draft) {
            warn!(appointment = %appointment.id, %error, "hospital notification failed");
        }
        if hospital.has_email() {
            self.mailer
                .send_best_effort(MailMessage {
                    to: hospital.email.clone(),
                    subject: "New donation appointment".to_string(),
                    body: notice,
                })
                .await;
        }

        Ok(appointment)
    }

    /// Applies the owning hospital's decision and notifies the donor.
    pub async fn respond(
        &self,
        actor: &Actor,
        id: &AppointmentId,
        form: ResponseForm,
    ) -> Result<Appointment, WorkflowError> {
        actor.require(Role::Hospital)?;
        let current = self.get(id)?;
        if current.hospital_id != actor.account_id {
            return Err(WorkflowError::forbidden(
                "appointment belongs to another hospital",
            ));
        }

        let decision = form.decision()?;
        if !current.status.can_respond() {
            return Err(WorkflowError::conflict(format!(
                "appointment already {}",
                current.status
            )));
        }

        let mut next = current.clone();
        next.status = decision.target();
        if let HospitalDecision::Reschedule { date, time } = decision {
            next.date = date;
            next.time = time;
        }
        next.updated_at = Utc::now();

        let updated = self.transition(&current, next)?;
        info!(appointment = %updated.id, status = %updated.status, "appointment response recorded");

        self.notify_donor(&updated).await;
        Ok(updated)
    }

    /// Donor-side cancellation. The hospital is not notified.
    pub fn cancel(&self, actor: &Actor, id: &AppointmentId) -> Result<Appointment, WorkflowError> {
        actor.require(Role::Donor)?;
        let current = self.get(id)?;
        if current.donor_id != actor.account_id {
            return Err(WorkflowError::forbidden(
                "appointment belongs to another donor",
            ));
        }
        if current.status == AppointmentStatus::Cancelled {
            return Err(WorkflowError::conflict("appointment already cancelled"));
        }

        let mut next = current.clone();
        next.status = AppointmentStatus::Cancelled;
        next.updated_at = Utc::now();

        let updated = self.transition(&current, next)?;
        info!(appointment = %updated.id, "appointment cancelled by donor");
        Ok(updated)
    }

    pub fn get(&self, id: &AppointmentId) -> Result<Appointment, WorkflowError> {
        self.appointments
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found("appointment", id.0.clone()))
    }

    /// The caller's appointments, optionally filtered by status, ordered by date.
    pub fn list_for(
        &self,
        actor: &Actor,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, WorkflowError> {
        let mut appointments = match actor.role {
            Role::Donor => self.for_donor(&actor.account_id)?,
            Role::Hospital => self.for_hospital(&actor.account_id)?,
            Role::Admin => {
                return Err(WorkflowError::forbidden(
                    "admin accounts have no appointments",
                ))
            }
        };
        if let Some(status) = status {
            appointments.retain(|appointment| appointment.status == status);
        }
        Ok(appointments)
    }

    pub fn for_donor(&self, donor: &AccountId) -> Result<Vec<Appointment>, WorkflowError> {
        let mut appointments = self.appointments.for_donor(donor)?;
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }

    pub fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<Appointment>, WorkflowError> {
        let mut appointments = self.appointments.for_hospital(hospital)?;
        sort_by_slot(&mut appointments);
        Ok(appointments)
    }

    fn transition(
        &self,
        expected: &Appointment,
        next: Appointment,
    ) -> Result<Appointment, WorkflowError> {
        let id = next.id.clone();
        self.appointments
            .compare_and_set(expected, next)
            .map_err(|error| match error {
                RepositoryError::Conflict => {
                    WorkflowError::conflict("appointment was changed concurrently")
                }
                RepositoryError::NotFound => WorkflowError::not_found("appointment", id.0),
                other => other.into(),
            })
    }

    async fn notify_donor(&self, appointment: &Appointment) {
        let donor = match self.accounts.fetch(&appointment.donor_id) {
            Ok(Some(donor)) => donor,
            Ok(None) => {
                warn!(appointment = %appointment.id, "donor no longer exists; notification skipped");
                return;
            }
            Err(error) => {
                warn!(appointment = %appointment.id, %error, "donor lookup failed");
                return;
            }
        };
        let hospital_name = match self.accounts.fetch(&appointment.hospital_id) {
            Ok(Some(hospital)) => hospital.full_name,
            _ => "Your hospital".to_string(),
        };

        let message = compose_response_message(
            appointment.status,
            donor.first_name(),
            &hospital_name,
            appointment.date,
            &appointment.time,
        );
        let draft = NotificationDraft::new(hospital_name, message.clone())
            .for_appointment(appointment.id.0.clone());
        if let Err(error) = self.mailbox.append(&donor.id, &draft) {
            warn!(appointment = %appointment.id, %error, "donor notification failed");
        }

        if donor.has_email() {
            self.mailer
                .send_best_effort(MailMessage {
                    to: donor.email.clone(),
                    subject: response_subject(appointment.status).to_string(),
                    body: message,
                })
                .await;
        }
    }

    fn account(&self, id: &AccountId, entity: &'static str) -> Result<Account, WorkflowError> {
        self.accounts
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found(entity, id.as_str()))
    }
}

fn sort_by_slot(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));
}
