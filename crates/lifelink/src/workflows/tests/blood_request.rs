use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::common::*;
use crate::config::WorkflowConfig;
use crate::workflows::blood_request::service::BROADCAST_MAIL_CONCURRENCY;
use crate::workflows::blood_request::{
    BloodGroup, BloodRequestForm, BloodRequestStatus, NumberOrText,
};
use crate::workflows::error::WorkflowError;
use crate::workflows::identity::Account;
use crate::workflows::memory::InMemoryStore;
use crate::workflows::outbound::{MailMessage, MailTransport, UpstreamError};
use crate::workflows::state::{WorkflowDeps, WorkflowState};

/// Records the highest number of sends running at the same time.
#[derive(Default)]
struct GaugedMailer {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delivered: AtomicUsize,
}

#[async_trait]
impl MailTransport for GaugedMailer {
    async fn send(&self, _message: &MailMessage) -> Result<(), UpstreamError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn form() -> BloodRequestForm {
    BloodRequestForm {
        blood_group: Some("O+".to_string()),
        pints: Some(NumberOrText::Number(3.0)),
        preferred_date: Some("2025-06-01".to_string()),
        urgency: Some("high".to_string()),
        amount: Some(NumberOrText::Text("15,000".to_string())),
    }
}

#[tokio::test]
async fn broadcast_reaches_every_donor_once() {
    let harness = Harness::new();
    let verified = harness.donor("Ada Obi", "ada@x.com", true).await;
    let unverified = harness.donor("Bola Ade", "bola@x.com", false).await;
    let hospital = harness.hospital("City Hospital", "city@h.com").await;
    harness.mailer.reset();

    let receipt = harness
        .state
        .blood_requests
        .submit(&harness.actor(&hospital), form())
        .await
        .expect("request broadcasts");

    assert_eq!(receipt.request.status, BloodRequestStatus::Pending);
    assert_eq!(receipt.request.blood_group, BloodGroup::OPositive);
    assert_eq!(receipt.request.amount, 15_000.0);
    assert_eq!(receipt.notified, 2);
    assert_eq!(receipt.emailed, 2);

    for donor in [&verified, &unverified] {
        let listing = harness.state.mailbox.list_all(&donor.id).expect("lists");
        let matching: Vec<_> = listing
            .notifications
            .iter()
            .filter(|entry| entry.request_id.as_deref() == Some(receipt.request.id.0.as_str()))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].from, "City Hospital");
    }

    let hospital_box = harness.state.mailbox.list_all(&hospital.id).expect("lists");
    assert_eq!(hospital_box.count, 0);
}

#[tokio::test]
async fn email_failures_do_not_undo_the_broadcast() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", true).await;
    harness.donor("Bola Ade", "bola@x.com", true).await;
    let hospital = harness.hospital("City Hospital", "city@h.com").await;
    harness.mailer.fail_for("ada@x.com");

    let receipt = harness
        .state
        .blood_requests
        .submit(&harness.actor(&hospital), form())
        .await
        .expect("request broadcasts");

    assert_eq!(receipt.notified, 2);
    assert_eq!(receipt.emailed, 1);
    assert_eq!(receipt.email_failures, 1);
    assert_eq!(
        harness.state.mailbox.list_unread(&donor.id).expect("lists").count,
        1
    );
    assert!(harness.state.blood_requests.get(&receipt.request.id).is_ok());
}

#[tokio::test]
async fn only_hospitals_submit_and_validation_precedes_persistence() {
    let harness = Harness::new();
    let donor = harness.donor("Ada Obi", "ada@x.com", true).await;
    let hospital = harness.hospital("City Hospital", "city@h.com").await;

    assert!(matches!(
        harness
            .state
            .blood_requests
            .submit(&harness.actor(&donor), form())
            .await,
        Err(WorkflowError::Forbidden(_))
    ));

    let mut invalid = form();
    invalid.pints = None;
    let actor = harness.actor(&hospital);
    assert!(matches!(
        harness.state.blood_requests.submit(&actor, invalid).await,
        Err(WorkflowError::Validation(_))
    ));

    assert!(harness
        .state
        .blood_requests
        .history(&actor)
        .expect("history")
        .is_empty());
    assert_eq!(
        harness.state.mailbox.list_all(&donor.id).expect("lists").count,
        0
    );
}

#[tokio::test]
async fn delete_is_owner_only() {
    let harness = Harness::new();
    let owner = harness.hospital("City Hospital", "city@h.com").await;
    let rival = harness.hospital("Rival Clinic", "rival@h.com").await;
    let owner_actor = harness.actor(&owner);

    let receipt = harness
        .state
        .blood_requests
        .submit(&owner_actor, form())
        .await
        .expect("request broadcasts");
    let id = receipt.request.id.clone();

    assert!(matches!(
        harness.state.blood_requests.delete(&harness.actor(&rival), &id),
        Err(WorkflowError::Forbidden(_))
    ));
    assert_eq!(
        harness.state.blood_requests.get(&id).expect("still present"),
        receipt.request
    );

    harness
        .state
        .blood_requests
        .delete(&owner_actor, &id)
        .expect("owner deletes");
    assert!(matches!(
        harness.state.blood_requests.delete(&owner_actor, &id),
        Err(WorkflowError::NotFound { .. })
    ));
}

#[tokio::test]
async fn history_lists_newest_first() {
    let harness = Harness::new();
    let hospital = harness.hospital("City Hospital", "city@h.com").await;
    let other = harness.hospital("Other Clinic", "other@h.com").await;
    let actor = harness.actor(&hospital);

    let first = harness
        .state
        .blood_requests
        .submit(&actor, form())
        .await
        .expect("first");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let mut second_form = form();
    second_form.blood_group = Some("AB-".to_string());
    let second = harness
        .state
        .blood_requests
        .submit(&actor, second_form)
        .await
        .expect("second");
    harness
        .state
        .blood_requests
        .submit(&harness.actor(&other), form())
        .await
        .expect("other hospital");

    let history = harness.state.blood_requests.history(&actor).expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.request.id);
    assert_eq!(history[1].id, first.request.id);
}

#[tokio::test]
async fn broadcast_mail_runs_with_bounded_concurrency() {
    let mailer = Arc::new(GaugedMailer::default());
    let deps = WorkflowDeps::in_memory(
        Arc::new(InMemoryStore::new()),
        mailer.clone(),
        Arc::new(FlakyBlobStorage::default()),
        Arc::new(ScriptedGateway::default()),
    );
    let state = WorkflowState::new(deps, &WorkflowConfig::development());

    let donors = BROADCAST_MAIL_CONCURRENCY * 3;
    for index in 0..donors {
        let donor = state
            .identity
            .enroll(Account::donor(
                &format!("Donor {index}"),
                &format!("donor{index}@x.com"),
            ))
            .await
            .expect("donor enrolls");
        state.identity.mark_verified(&donor.id).expect("verifies");
    }
    let hospital = state
        .identity
        .enroll(Account::hospital("City Hospital", "city@h.com"))
        .await
        .expect("hospital enrolls");
    let token = state.sessions.issue(&hospital).expect("session issues").token;
    let actor = state.sessions.authenticate(&token).expect("authenticates");
    mailer.peak.store(0, Ordering::SeqCst);
    mailer.delivered.store(0, Ordering::SeqCst);

    let receipt = state
        .blood_requests
        .submit(&actor, form())
        .await
        .expect("request broadcasts");

    assert_eq!(receipt.emailed, donors);
    assert_eq!(mailer.delivered.load(Ordering::SeqCst), donors);
    let peak = mailer.peak.load(Ordering::SeqCst);
    assert!(peak <= BROADCAST_MAIL_CONCURRENCY, "peak {peak} exceeds the bound");
    assert!(peak > 1, "broadcast mail should overlap");
}
