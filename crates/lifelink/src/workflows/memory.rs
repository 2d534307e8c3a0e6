//! In-process store backing every repository trait.
//!
//! Notifications live inside the owning account document, so deleting an account drops its
//! mailbox and a bulk append is one pass over the account map under a single lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::appointment::{Appointment, AppointmentId, AppointmentRepository};
use super::blood_request::{BloodRequest, BloodRequestId, BloodRequestRepository};
use super::error::RepositoryError;
use super::identity::{
    Account, AccountId, AccountProfile, AccountRepository, KycId, KycRepository, KycStatus,
    KycSubmission, PaymentRecord, PaymentRepository, PaymentStatus, RevocationStore, Role,
};
use super::mailbox::{MailboxStore, NotificationEntry};

#[derive(Debug, Clone)]
struct AccountDocument {
    account: Account,
    notifications: Vec<NotificationEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    accounts: Mutex<BTreeMap<AccountId, AccountDocument>>,
    kyc: Mutex<BTreeMap<KycId, KycSubmission>>,
    payments: Mutex<BTreeMap<String, PaymentRecord>>,
    revocations: Mutex<HashMap<String, DateTime<Utc>>>,
    blood_requests: Mutex<BTreeMap<BloodRequestId, BloodRequest>>,
    appointments: Mutex<BTreeMap<AppointmentId, Appointment>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountRepository for InMemoryStore {
    fn insert(&self, account: Account) -> Result<Account, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let duplicate = accounts.values().any(|doc| {
            doc.account.id == account.id || doc.account.email.eq_ignore_ascii_case(&account.email)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        accounts.insert(
            account.id.clone(),
            AccountDocument {
                account: account.clone(),
                notifications: Vec::new(),
            },
        );
        Ok(account)
    }

    fn fetch(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError> {
        Ok(lock(&self.accounts)?.get(id).map(|doc| doc.account.clone()))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError> {
        Ok(lock(&self.accounts)?
            .values()
            .find(|doc| doc.account.email.eq_ignore_ascii_case(email))
            .map(|doc| doc.account.clone()))
    }

    fn list_by_role(&self, role: Role) -> Result<Vec<Account>, RepositoryError> {
        Ok(lock(&self.accounts)?
            .values()
            .filter(|doc| doc.account.role() == role)
            .map(|doc| doc.account.clone())
            .collect())
    }

    fn mark_email_verified(&self, id: &AccountId) -> Result<bool, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(id).ok_or(RepositoryError::NotFound)?;
        match &mut doc.account.profile {
            AccountProfile::Donor {
                is_email_verified, ..
            } => {
                let changed = !*is_email_verified;
                *is_email_verified = true;
                Ok(changed)
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn set_kyc_verified(&self, id: &AccountId, verified: bool) -> Result<(), RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(id).ok_or(RepositoryError::NotFound)?;
        match &mut doc.account.profile {
            AccountProfile::Hospital {
                is_kyc_verified, ..
            } => {
                *is_kyc_verified = verified;
                Ok(())
            }
            _ => Err(RepositoryError::NotFound),
        }
    }

    fn remove(&self, id: &AccountId) -> Result<Account, RepositoryError> {
        lock(&self.accounts)?
            .remove(id)
            .map(|doc| doc.account)
            .ok_or(RepositoryError::NotFound)
    }
}

impl MailboxStore for InMemoryStore {
    fn push(&self, owner: &AccountId, entry: NotificationEntry) -> Result<(), RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        doc.notifications.push(entry);
        Ok(())
    }

    fn push_many(
        &self,
        deliveries: Vec<(AccountId, NotificationEntry)>,
    ) -> Result<usize, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let mut written = 0;
        for (owner, entry) in deliveries {
            if let Some(doc) = accounts.get_mut(&owner) {
                doc.notifications.push(entry);
                written += 1;
            }
        }
        Ok(written)
    }

    fn entries(&self, owner: &AccountId) -> Result<Vec<NotificationEntry>, RepositoryError> {
        lock(&self.accounts)?
            .get(owner)
            .map(|doc| doc.notifications.clone())
            .ok_or(RepositoryError::NotFound)
    }

    fn mark_read(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<Option<NotificationEntry>, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        Ok(doc
            .notifications
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .map(|entry| {
                entry.read = true;
                entry.clone()
            }))
    }

    fn remove(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<Option<NotificationEntry>, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        Ok(doc
            .notifications
            .iter()
            .position(|entry| entry.id == entry_id)
            .map(|index| doc.notifications.remove(index)))
    }

    fn clear(&self, owner: &AccountId) -> Result<usize, RepositoryError> {
        let mut accounts = lock(&self.accounts)?;
        let doc = accounts.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        let removed = doc.notifications.len();
        doc.notifications.clear();
        Ok(removed)
    }
}

impl KycRepository for InMemoryStore {
    fn replace_declined(
        &self,
        submission: KycSubmission,
    ) -> Result<KycSubmission, RepositoryError> {
        let mut kyc = lock(&self.kyc)?;
        let blocked = kyc.values().any(|existing| {
            existing.hospital_id == submission.hospital_id
                && existing.status != KycStatus::Declined
        });
        if blocked || kyc.contains_key(&submission.id) {
            return Err(RepositoryError::Conflict);
        }
        kyc.retain(|_, existing| existing.hospital_id != submission.hospital_id);
        kyc.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn fetch(&self, id: &KycId) -> Result<Option<KycSubmission>, RepositoryError> {
        Ok(lock(&self.kyc)?.get(id).cloned())
    }

    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<KycSubmission>, RepositoryError> {
        Ok(lock(&self.kyc)?
            .values()
            .filter(|submission| &submission.hospital_id == hospital)
            .cloned()
            .collect())
    }

    fn list(&self) -> Result<Vec<KycSubmission>, RepositoryError> {
        Ok(lock(&self.kyc)?.values().cloned().collect())
    }

    fn transition(
        &self,
        id: &KycId,
        expected: KycStatus,
        next: KycStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<KycSubmission, RepositoryError> {
        let mut kyc = lock(&self.kyc)?;
        let submission = kyc.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if submission.status != expected {
            return Err(RepositoryError::Conflict);
        }
        submission.status = next;
        submission.reviewed_at = Some(reviewed_at);
        Ok(submission.clone())
    }
}

impl PaymentRepository for InMemoryStore {
    fn insert(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError> {
        let mut payments = lock(&self.payments)?;
        if payments.contains_key(&record.reference) {
            return Err(RepositoryError::Conflict);
        }
        payments.insert(record.reference.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, reference: &str) -> Result<Option<PaymentRecord>, RepositoryError> {
        Ok(lock(&self.payments)?.get(reference).cloned())
    }

    fn set_status(
        &self,
        reference: &str,
        status: PaymentStatus,
    ) -> Result<PaymentRecord, RepositoryError> {
        let mut payments = lock(&self.payments)?;
        let record = payments
            .get_mut(reference)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    fn has_successful(&self, hospital: &AccountId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.payments)?
            .values()
            .any(|record| &record.hospital_id == hospital && record.status == PaymentStatus::Success))
    }
}

impl RevocationStore for InMemoryStore {
    fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        lock(&self.revocations)?.insert(token_id.to_string(), expires_at);
        Ok(())
    }

    /// Drops entries whose token has already expired, then checks membership.
    fn is_revoked(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let mut revocations = lock(&self.revocations)?;
        revocations.retain(|_, expires_at| *expires_at > now);
        Ok(revocations.contains_key(token_id))
    }
}

impl BloodRequestRepository for InMemoryStore {
    fn insert(&self, request: BloodRequest) -> Result<BloodRequest, RepositoryError> {
        let mut requests = lock(&self.blood_requests)?;
        if requests.contains_key(&request.id) {
            return Err(RepositoryError::Conflict);
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn fetch(&self, id: &BloodRequestId) -> Result<Option<BloodRequest>, RepositoryError> {
        Ok(lock(&self.blood_requests)?.get(id).cloned())
    }

    fn remove(&self, id: &BloodRequestId) -> Result<BloodRequest, RepositoryError> {
        lock(&self.blood_requests)?
            .remove(id)
            .ok_or(RepositoryError::NotFound)
    }

    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<BloodRequest>, RepositoryError> {
        Ok(lock(&self.blood_requests)?
            .values()
            .filter(|request| &request.hospital_id == hospital)
            .cloned()
            .collect())
    }
}

impl AppointmentRepository for InMemoryStore {
    fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError> {
        let mut appointments = lock(&self.appointments)?;
        if appointments.contains_key(&appointment.id) {
            return Err(RepositoryError::Conflict);
        }
        appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    fn fetch(&self, id: &AppointmentId) -> Result<Option<Appointment>, RepositoryError> {
        Ok(lock(&self.appointments)?.get(id).cloned())
    }

    fn compare_and_set(
        &self,
        expected: &Appointment,
        mut next: Appointment,
    ) -> Result<Appointment, RepositoryError> {
        let mut appointments = lock(&self.appointments)?;
        let stored = appointments
            .get_mut(&next.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected.status || stored.version != expected.version {
            return Err(RepositoryError::Conflict);
        }
        next.version = expected.version + 1;
        *stored = next.clone();
        Ok(next)
    }

    fn for_donor(&self, donor: &AccountId) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(lock(&self.appointments)?
            .values()
            .filter(|appointment| &appointment.donor_id == donor)
            .cloned()
            .collect())
    }

    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(lock(&self.appointments)?
            .values()
            .filter(|appointment| &appointment.hospital_id == hospital)
            .cloned()
            .collect())
    }
}
