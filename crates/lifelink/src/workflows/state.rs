use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Router;

use super::appointment::{appointment_routes, AppointmentRepository, AppointmentService};
use super::blood_request::{blood_request_routes, BloodRequestRepository, BloodRequestService};
use super::error::WorkflowError;
use super::identity::{
    extract_bearer_token, identity_routes, AccountRepository, Actor, IdentityService,
    KycRepository, KycService, PaymentRepository, PaymentService, RevocationStore,
    SessionAuthority, TokenSigner,
};
use super::mailbox::{mailbox_routes, MailboxService, MailboxStore};
use super::memory::InMemoryStore;
use super::outbound::{BlobStorage, MailDispatcher, MailTransport, PaymentGateway};
use crate::config::WorkflowConfig;

/// Storage and collaborator handles the workflow services are built from.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub accounts: Arc<dyn AccountRepository>,
    pub kyc: Arc<dyn KycRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub revocations: Arc<dyn RevocationStore>,
    pub mailbox: Arc<dyn MailboxStore>,
    pub blood_requests: Arc<dyn BloodRequestRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub mail: Arc<dyn MailTransport>,
    pub blobs: Arc<dyn BlobStorage>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl WorkflowDeps {
    /// Uses one in-memory store for every repository.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        mail: Arc<dyn MailTransport>,
        blobs: Arc<dyn BlobStorage>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            accounts: store.clone(),
            kyc: store.clone(),
            payments: store.clone(),
            revocations: store.clone(),
            mailbox: store.clone(),
            blood_requests: store.clone(),
            appointments: store,
            mail,
            blobs,
            gateway,
        }
    }
}

/// Shared router state holding every workflow service.
#[derive(Clone)]
pub struct WorkflowState {
    pub sessions: Arc<SessionAuthority>,
    pub identity: Arc<IdentityService>,
    pub kyc: Arc<KycService>,
    pub payments: Arc<PaymentService>,
    pub mailbox: Arc<MailboxService>,
    pub blood_requests: Arc<BloodRequestService>,
    pub appointments: Arc<AppointmentService>,
}

impl WorkflowState {
    pub fn new(deps: WorkflowDeps, config: &WorkflowConfig) -> Self {
        let signer = Arc::new(TokenSigner::new(&config.token_secret));
        let mailer = MailDispatcher::new(deps.mail.clone(), config.outbound_timeout);
        let mailbox = Arc::new(MailboxService::new(deps.mailbox.clone()));

        Self {
            sessions: Arc::new(SessionAuthority::new(
                signer.clone(),
                deps.accounts.clone(),
                deps.revocations.clone(),
            )),
            identity: Arc::new(IdentityService::new(
                deps.accounts.clone(),
                deps.payments.clone(),
                signer,
                mailer.clone(),
                config.verify_link_base.clone(),
            )),
            kyc: Arc::new(KycService::new(
                deps.accounts.clone(),
                deps.kyc.clone(),
                deps.blobs.clone(),
                config.outbound_timeout,
            )),
            payments: Arc::new(PaymentService::new(
                deps.accounts.clone(),
                deps.payments.clone(),
                deps.gateway.clone(),
                config.outbound_timeout,
            )),
            blood_requests: Arc::new(BloodRequestService::new(
                deps.accounts.clone(),
                deps.blood_requests.clone(),
                mailbox.clone(),
                mailer.clone(),
            )),
            appointments: Arc::new(AppointmentService::new(
                deps.accounts,
                deps.appointments,
                mailbox.clone(),
                mailer,
            )),
            mailbox,
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<WorkflowState> for Actor {
    type Rejection = WorkflowError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WorkflowState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| WorkflowError::unauthenticated("missing bearer token"))?;
        let token = extract_bearer_token(header)
            .ok_or_else(|| WorkflowError::unauthenticated("malformed authorization header"))?;
        state.sessions.authenticate(token)
    }
}

/// Every workflow endpoint, bound to `state`.
pub fn workflow_router(state: WorkflowState) -> Router {
    Router::new()
        .merge(identity_routes())
        .merge(mailbox_routes())
        .merge(blood_request_routes())
        .merge(appointment_routes())
        .with_state(state)
}
