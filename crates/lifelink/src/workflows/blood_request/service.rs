use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::domain::{
    BloodRequest, BloodRequestForm, BloodRequestId, BloodRequestStatus, BroadcastReceipt,
};
use super::repository::BloodRequestRepository;
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::identity::{Account, AccountRepository, Actor, Role};
use crate::workflows::mailbox::{MailboxService, NotificationDraft};
use crate::workflows::outbound::{MailDispatcher, MailMessage};
use crate::workflows::sequence::next_id;

/// Upper bound on broadcast emails in flight at once.
pub(crate) const BROADCAST_MAIL_CONCURRENCY: usize = 16;

/// Creates blood requests and fans them out to every donor.
pub struct BloodRequestService {
    accounts: Arc<dyn AccountRepository>,
    requests: Arc<dyn BloodRequestRepository>,
    mailbox: Arc<MailboxService>,
    mailer: MailDispatcher,
}

impl BloodRequestService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        requests: Arc<dyn BloodRequestRepository>,
        mailbox: Arc<MailboxService>,
        mailer: MailDispatcher,
    ) -> Self {
        Self {
            accounts,
            requests,
            mailbox,
            mailer,
        }
    }

    /// Persists the request, then notifies every donor and emails those with an address,
    /// at most [`BROADCAST_MAIL_CONCURRENCY`] at a time.
    ///
    /// Once the request is stored, neither a failed fan-out nor failed emails undo it.
    pub async fn submit(
        &self,
        actor: &Actor,
        form: BloodRequestForm,
    ) -> Result<BroadcastReceipt, WorkflowError> {
        actor.require(Role::Hospital)?;
        let validated = form.validate()?;
        let hospital = self
            .accounts
            .fetch(&actor.account_id)?
            .ok_or_else(|| WorkflowError::not_found("hospital", actor.account_id.as_str()))?;

        let request = self.requests.insert(BloodRequest {
            id: BloodRequestId(next_id("breq")),
            hospital_id: hospital.id.clone(),
            hospital_name: hospital.full_name.clone(),
            blood_group: validated.blood_group,
            pints: validated.pints,
            preferred_date: validated.preferred_date,
            urgency: validated.urgency,
            amount: validated.amount,
            status: BloodRequestStatus::Pending,
            created_at: Utc::now(),
        })?;
        info!(request = %request.id, hospital = %hospital.id, "blood request created");

        let donors = match self.accounts.list_by_role(Role::Donor) {
            Ok(donors) => donors,
            Err(error) => {
                warn!(request = %request.id, %error, "donor lookup failed; broadcast skipped");
                return Ok(BroadcastReceipt {
                    request,
                    notified: 0,
                    emailed: 0,
                    email_failures: 0,
                });
            }
        };

        let message = broadcast_message(&request);
        let draft = NotificationDraft::new(hospital.full_name.clone(), message.clone())
            .for_request(request.id.0.clone());
        let recipients: Vec<_> = donors.iter().map(|donor| donor.id.clone()).collect();
        let notified = match self.mailbox.append_many(&recipients, &draft) {
            Ok(written) => written,
            Err(error) => {
                warn!(request = %request.id, %error, "broadcast fan-out failed");
                0
            }
        };

        let outcomes: Vec<bool> = stream::iter(donors.iter().filter(|donor| donor.has_email()))
            .map(|donor| self.mailer.send_best_effort(broadcast_mail(donor, &message)))
            .buffer_unordered(BROADCAST_MAIL_CONCURRENCY)
            .boxed()
            .collect()
            .await;
        let emailed = outcomes.iter().filter(|sent| **sent).count();
        let email_failures = outcomes.len() - emailed;

        info!(
            request = %request.id,
            notified,
            emailed,
            email_failures,
            "blood request broadcast"
        );

        Ok(BroadcastReceipt {
            request,
            notified,
            emailed,
            email_failures,
        })
    }

    /// Only the owning hospital may delete a request.
    pub fn delete(
        &self,
        actor: &Actor,
        id: &BloodRequestId,
    ) -> Result<BloodRequest, WorkflowError> {
        actor.require(Role::Hospital)?;
        let request = self.get(id)?;
        if request.hospital_id != actor.account_id {
            return Err(WorkflowError::forbidden(
                "blood request belongs to another hospital",
            ));
        }

        let removed = self.requests.remove(id).map_err(|error| match error {
            RepositoryError::NotFound => WorkflowError::not_found("blood request", id.0.clone()),
            other => other.into(),
        })?;
        info!(request = %removed.id, "blood request deleted");
        Ok(removed)
    }

    /// The calling hospital's requests, newest first.
    pub fn history(&self, actor: &Actor) -> Result<Vec<BloodRequest>, WorkflowError> {
        actor.require(Role::Hospital)?;
        let mut requests = self.requests.for_hospital(&actor.account_id)?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    pub fn get(&self, id: &BloodRequestId) -> Result<BloodRequest, WorkflowError> {
        self.requests
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found("blood request", id.0.clone()))
    }
}

fn broadcast_message(request: &BloodRequest) -> String {
    let unit = if request.pints == 1 { "pint" } else { "pints" };
    format!(
        "{} requests {} {} of {} blood by {} ({} urgency)",
        request.hospital_name,
        request.pints,
        unit,
        request.blood_group,
        request.preferred_date.format("%Y-%m-%d"),
        request.urgency.label()
    )
}

fn broadcast_mail(donor: &Account, message: &str) -> MailMessage {
    MailMessage {
        to: donor.email.clone(),
        subject: "Urgent blood request near you".to_string(),
        body: format!("Hello {}, {}.", donor.first_name(), message),
    }
}
