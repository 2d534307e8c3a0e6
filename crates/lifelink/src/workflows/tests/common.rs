use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::workflows::identity::{Account, Actor};
use crate::workflows::memory::InMemoryStore;
use crate::workflows::outbound::{
    BlobStorage, ChargeStatus, MailMessage, MailTransport, PaymentCustomer, PaymentGateway,
    UpstreamError,
};
use crate::workflows::state::{WorkflowDeps, WorkflowState};

#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingMailer {
    pub(super) fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().expect("mailer mutex").clone()
    }

    pub(super) fn reset(&self) {
        self.sent.lock().expect("mailer mutex").clear();
    }

    /// Makes every send to `address` fail.
    pub(super) fn fail_for(&self, address: &str) {
        self.failing
            .lock()
            .expect("mailer mutex")
            .push(address.to_string());
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), UpstreamError> {
        if self
            .failing
            .lock()
            .expect("mailer mutex")
            .iter()
            .any(|address| address == &message.to)
        {
            return Err(UpstreamError::Mail(format!("mailbox {} rejected", message.to)));
        }
        self.sent.lock().expect("mailer mutex").push(message.clone());
        Ok(())
    }
}

/// Blob storage that rejects any file name containing `reject`.
#[derive(Default)]
pub(super) struct FlakyBlobStorage {
    uploaded: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
}

impl FlakyBlobStorage {
    pub(super) fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().expect("blob mutex").clone()
    }

    pub(super) fn removed(&self) -> Vec<String> {
        self.removed.lock().expect("blob mutex").clone()
    }
}

#[async_trait]
impl BlobStorage for FlakyBlobStorage {
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UpstreamError> {
        if file_name.contains("reject") || content.is_empty() {
            return Err(UpstreamError::Blob("upload refused".to_string()));
        }
        let url = format!("https://blobs.test/{file_name}");
        self.uploaded.lock().expect("blob mutex").push(url.clone());
        Ok(url)
    }

    async fn remove(&self, url: &str) -> Result<(), UpstreamError> {
        self.removed.lock().expect("blob mutex").push(url.to_string());
        Ok(())
    }
}

pub(super) struct ScriptedGateway {
    outcome: Mutex<ChargeStatus>,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self {
            outcome: Mutex::new(ChargeStatus::Success),
        }
    }
}

impl ScriptedGateway {
    pub(super) fn set_outcome(&self, outcome: ChargeStatus) {
        *self.outcome.lock().expect("gateway mutex") = outcome;
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        _amount: u64,
        _customer: &PaymentCustomer,
        reference: &str,
    ) -> Result<String, UpstreamError> {
        Ok(format!("https://checkout.test/{reference}"))
    }

    async fn verify(&self, _reference: &str) -> Result<ChargeStatus, UpstreamError> {
        Ok(*self.outcome.lock().expect("gateway mutex"))
    }
}

pub(super) struct Harness {
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub blobs: Arc<FlakyBlobStorage>,
    pub gateway: Arc<ScriptedGateway>,
    pub state: WorkflowState,
}

impl Harness {
    pub(super) fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let blobs = Arc::new(FlakyBlobStorage::default());
        let gateway = Arc::new(ScriptedGateway::default());
        let deps = WorkflowDeps::in_memory(
            store.clone(),
            mailer.clone(),
            blobs.clone(),
            gateway.clone(),
        );
        let state = WorkflowState::new(deps, &WorkflowConfig::development());
        Self {
            store,
            mailer,
            blobs,
            gateway,
            state,
        }
    }

    pub(super) fn actor(&self, account: &Account) -> Actor {
        let issued = self
            .state
            .sessions
            .issue(account)
            .expect("session issues");
        self.state
            .sessions
            .authenticate(&issued.token)
            .expect("session authenticates")
    }

    pub(super) fn bearer(&self, account: &Account) -> String {
        let issued = self
            .state
            .sessions
            .issue(account)
            .expect("session issues");
        format!("Bearer {}", issued.token)
    }

    pub(super) async fn donor(&self, name: &str, email: &str, verified: bool) -> Account {
        let account = self
            .state
            .identity
            .enroll(Account::donor(name, email))
            .await
            .expect("donor enrolls");
        if verified {
            self.state
                .identity
                .mark_verified(&account.id)
                .expect("donor verifies")
        } else {
            account
        }
    }

    pub(super) async fn hospital(&self, name: &str, email: &str) -> Account {
        self.state
            .identity
            .enroll(Account::hospital(name, email))
            .await
            .expect("hospital enrolls")
    }

    pub(super) async fn admin(&self) -> Account {
        self.state
            .identity
            .enroll(Account::admin("Site Admin", "admin@lifelink.test"))
            .await
            .expect("admin enrolls")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    serde_json::from_slice(&bytes).expect("body is json")
}
