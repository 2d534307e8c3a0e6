use crate::workflows::error::RepositoryError;
use crate::workflows::identity::AccountId;

use super::domain::NotificationEntry;

/// Mailbox storage embedded in the owning account record.
///
/// Every operation fails with `NotFound` when the owning account does not exist.
pub trait MailboxStore: Send + Sync {
    fn push(&self, owner: &AccountId, entry: NotificationEntry) -> Result<(), RepositoryError>;
    /// Applies every delivery in one store mutation. Recipients that no longer exist are
    /// skipped; returns the number of entries written.
    fn push_many(
        &self,
        deliveries: Vec<(AccountId, NotificationEntry)>,
    ) -> Result<usize, RepositoryError>;
    fn entries(&self, owner: &AccountId) -> Result<Vec<NotificationEntry>, RepositoryError>;
    /// Returns `None` when the entry is not in the mailbox.
    fn mark_read(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<Option<NotificationEntry>, RepositoryError>;
    fn remove(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<Option<NotificationEntry>, RepositoryError>;
    /// Empties the mailbox and returns how many entries were dropped.
    fn clear(&self, owner: &AccountId) -> Result<usize, RepositoryError>;
}
