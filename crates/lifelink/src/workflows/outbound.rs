//! Outbound collaborators: mail transport, blob storage and the payment gateway.
//!
//! Every call leaving the process goes through [`bounded`] so a slow collaborator surfaces as
//! [`UpstreamError::Timeout`] instead of stalling the request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Failure reported by an external collaborator.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("mail transport failed: {0}")]
    Mail(String),
    #[error("blob storage failed: {0}")]
    Blob(String),
    #[error("payment gateway failed: {0}")]
    Payment(String),
    #[error("{operation} timed out")]
    Timeout { operation: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), UpstreamError>;
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores `content` under a name derived from `file_name` and returns its public URL.
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UpstreamError>;
    async fn remove(&self, url: &str) -> Result<(), UpstreamError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCustomer {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeStatus {
    Success,
    Failed,
    Pending,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens a checkout for `amount` and returns the URL the customer should visit.
    async fn initialize(
        &self,
        amount: u64,
        customer: &PaymentCustomer,
        reference: &str,
    ) -> Result<String, UpstreamError>;
    async fn verify(&self, reference: &str) -> Result<ChargeStatus, UpstreamError>;
}

/// Runs `future` with an upper bound on its duration.
pub async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout { operation }),
    }
}

/// Mail transport wrapper applying the configured timeout.
#[derive(Clone)]
pub struct MailDispatcher {
    transport: Arc<dyn MailTransport>,
    timeout: Duration,
}

impl MailDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn send(&self, message: MailMessage) -> Result<(), UpstreamError> {
        bounded("mail send", self.timeout, self.transport.send(&message)).await
    }

    /// Sends after a committed mutation; failures are logged and reported as `false`.
    pub async fn send_best_effort(&self, message: MailMessage) -> bool {
        let recipient = message.to.clone();
        match self.send(message).await {
            Ok(()) => true,
            Err(error) => {
                warn!(%recipient, %error, "mail delivery failed");
                false
            }
        }
    }
}
