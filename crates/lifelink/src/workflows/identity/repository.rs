use chrono::{DateTime, Utc};

use super::domain::{
    Account, AccountId, KycId, KycStatus, KycSubmission, PaymentRecord, PaymentStatus, Role,
};
use crate::workflows::error::RepositoryError;

/// Single discriminated account collection; one lookup resolves any role.
pub trait AccountRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    fn insert(&self, account: Account) -> Result<Account, RepositoryError>;
    fn fetch(&self, id: &AccountId) -> Result<Option<Account>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<Account>, RepositoryError>;
    fn list_by_role(&self, role: Role) -> Result<Vec<Account>, RepositoryError>;
    /// Sets the donor verification flag; returns `false` when it was already set.
    fn mark_email_verified(&self, id: &AccountId) -> Result<bool, RepositoryError>;
    fn set_kyc_verified(&self, id: &AccountId, verified: bool) -> Result<(), RepositoryError>;
    /// Removes the account together with its embedded mailbox.
    fn remove(&self, id: &AccountId) -> Result<Account, RepositoryError>;
}

pub trait KycRepository: Send + Sync {
    /// Drops the hospital's declined submissions and stores `submission` in one mutation.
    ///
    /// Fails with `Conflict`, leaving the store untouched, when the hospital already has a
    /// pending or approved submission.
    fn replace_declined(
        &self,
        submission: KycSubmission,
    ) -> Result<KycSubmission, RepositoryError>;
    fn fetch(&self, id: &KycId) -> Result<Option<KycSubmission>, RepositoryError>;
    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<KycSubmission>, RepositoryError>;
    fn list(&self) -> Result<Vec<KycSubmission>, RepositoryError>;
    /// Moves the submission from `expected` to `next`, or fails with `Conflict`.
    fn transition(
        &self,
        id: &KycId,
        expected: KycStatus,
        next: KycStatus,
        reviewed_at: DateTime<Utc>,
    ) -> Result<KycSubmission, RepositoryError>;
}

pub trait PaymentRepository: Send + Sync {
    fn insert(&self, record: PaymentRecord) -> Result<PaymentRecord, RepositoryError>;
    fn fetch(&self, reference: &str) -> Result<Option<PaymentRecord>, RepositoryError>;
    fn set_status(
        &self,
        reference: &str,
        status: PaymentStatus,
    ) -> Result<PaymentRecord, RepositoryError>;
    fn has_successful(&self, hospital: &AccountId) -> Result<bool, RepositoryError>;
}

/// Revoked session ids, each retained until the token's own expiry.
pub trait RevocationStore: Send + Sync {
    fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError>;
    fn is_revoked(&self, token_id: &str, now: DateTime<Utc>) -> Result<bool, RepositoryError>;
}
