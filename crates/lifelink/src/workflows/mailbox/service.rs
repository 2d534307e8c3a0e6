use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::domain::{MailboxListing, NotificationDraft, NotificationEntry};
use super::repository::MailboxStore;
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::identity::AccountId;

/// Mailbox operations shared by the workflow engines and mailbox owners.
pub struct MailboxService {
    store: Arc<dyn MailboxStore>,
}

impl MailboxService {
    pub fn new(store: Arc<dyn MailboxStore>) -> Self {
        Self { store }
    }

    pub fn append(
        &self,
        owner: &AccountId,
        draft: &NotificationDraft,
    ) -> Result<NotificationEntry, WorkflowError> {
        let entry = draft.materialize(Utc::now());
        self.store
            .push(owner, entry.clone())
            .map_err(|error| account_error(error, owner))?;
        debug!(owner = %owner, entry = %entry.id, "notification appended");
        Ok(entry)
    }

    /// Appends one copy of `draft` to every recipient in a single store mutation.
    pub fn append_many(
        &self,
        recipients: &[AccountId],
        draft: &NotificationDraft,
    ) -> Result<usize, WorkflowError> {
        if recipients.is_empty() {
            return Ok(0);
        }

        let date = Utc::now();
        let deliveries = recipients
            .iter()
            .map(|owner| (owner.clone(), draft.materialize(date)))
            .collect();
        let written = self.store.push_many(deliveries)?;
        debug!(requested = recipients.len(), written, "bulk notification appended");
        Ok(written)
    }

    pub fn list_all(&self, owner: &AccountId) -> Result<MailboxListing, WorkflowError> {
        let entries = self
            .store
            .entries(owner)
            .map_err(|error| account_error(error, owner))?;
        Ok(entries.into())
    }

    pub fn list_unread(&self, owner: &AccountId) -> Result<MailboxListing, WorkflowError> {
        let entries = self
            .store
            .entries(owner)
            .map_err(|error| account_error(error, owner))?;
        Ok(entries
            .into_iter()
            .filter(|entry| !entry.read)
            .collect::<Vec<_>>()
            .into())
    }

    pub fn mark_read(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<NotificationEntry, WorkflowError> {
        self.store
            .mark_read(owner, entry_id)
            .map_err(|error| account_error(error, owner))?
            .ok_or_else(|| WorkflowError::not_found("notification", entry_id))
    }

    pub fn delete(
        &self,
        owner: &AccountId,
        entry_id: &str,
    ) -> Result<NotificationEntry, WorkflowError> {
        self.store
            .remove(owner, entry_id)
            .map_err(|error| account_error(error, owner))?
            .ok_or_else(|| WorkflowError::not_found("notification", entry_id))
    }

    pub fn clear(&self, owner: &AccountId) -> Result<usize, WorkflowError> {
        self.store
            .clear(owner)
            .map_err(|error| account_error(error, owner))
    }
}

fn account_error(error: RepositoryError, owner: &AccountId) -> WorkflowError {
    match error {
        RepositoryError::NotFound => WorkflowError::not_found("account", owner.as_str()),
        other => other.into(),
    }
}
