use super::domain::{Appointment, AppointmentId};
use crate::workflows::error::RepositoryError;
use crate::workflows::identity::AccountId;

pub trait AppointmentRepository: Send + Sync {
    fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError>;
    fn fetch(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError>;
    /// Replaces the stored appointment only while its status and version still match
    /// `expected`; otherwise fails with `Conflict` and leaves it untouched. The stored copy gets
    /// `expected.version + 1`.
    fn compare_and_set(
        &self,
        expected: &Appointment,
        next: Appointment,
    ) -> Result<Appointment, RepositoryError>;
    fn for_donor(&self, donor: &AccountId) -> Result<Vec<Appointment>, RepositoryError>;
    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<Appointment>, RepositoryError>;
}
