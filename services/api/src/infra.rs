use std::path::{Component, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lifelink::config::WorkflowConfig;
use lifelink::workflows::outbound::{
    BlobStorage, ChargeStatus, MailMessage, MailTransport, PaymentCustomer, PaymentGateway,
    UpstreamError,
};
use lifelink::workflows::{InMemoryStore, WorkflowDeps};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};

const SANDBOX_CHECKOUT_BASE: &str = "https://checkout.sandbox.lifelink.local";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes every outgoing message to the log instead of a mail relay.
#[derive(Debug, Default, Clone)]
pub(crate) struct LoggingMailTransport;

#[async_trait]
impl MailTransport for LoggingMailTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), UpstreamError> {
        info!(to = %message.to, subject = %message.subject, "mail dispatched");
        Ok(())
    }
}

/// Writes uploaded bytes into a local directory and hands back `file://` URLs.
#[derive(Debug)]
pub(crate) struct LocalBlobStorage {
    root: PathBuf,
    counter: AtomicU64,
}

impl LocalBlobStorage {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: AtomicU64::new(0),
        }
    }

    fn stored_path(&self, url: &str) -> Result<PathBuf, UpstreamError> {
        let path = url
            .strip_prefix("file://")
            .map(PathBuf::from)
            .ok_or_else(|| UpstreamError::Blob("unsupported blob url".to_string()))?;
        let escapes = path
            .components()
            .any(|component| matches!(component, Component::ParentDir));
        if escapes || !path.starts_with(&self.root) {
            return Err(UpstreamError::Blob("blob url outside storage".to_string()));
        }
        Ok(path)
    }
}

/// Keeps only characters that are safe in a single path component.
fn storage_name(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(&self, file_name: &str, content: &[u8]) -> Result<String, UpstreamError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            warn!(root = %self.root.display(), %err, "blob directory unavailable");
            UpstreamError::Blob("blob storage unavailable".to_string())
        })?;

        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let target = self.root.join(format!(
            "{}-{sequence}-{}",
            Utc::now().timestamp_millis(),
            storage_name(file_name)
        ));
        tokio::fs::write(&target, content).await.map_err(|err| {
            warn!(target = %target.display(), %err, "blob write failed");
            UpstreamError::Blob("could not store document".to_string())
        })?;

        Ok(format!("file://{}", target.display()))
    }

    async fn remove(&self, url: &str) -> Result<(), UpstreamError> {
        let path = self.stored_path(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                warn!(path = %path.display(), %err, "blob remove failed");
                Err(UpstreamError::Blob("could not remove document".to_string()))
            }
        }
    }
}

/// Gateway stand-in: checkout URLs are derived from the reference and every charge settles.
#[derive(Debug, Default, Clone)]
pub(crate) struct SandboxPaymentGateway;

#[async_trait]
impl PaymentGateway for SandboxPaymentGateway {
    async fn initialize(
        &self,
        amount: u64,
        customer: &PaymentCustomer,
        reference: &str,
    ) -> Result<String, UpstreamError> {
        info!(%reference, amount, email = %customer.email, "sandbox checkout opened");
        Ok(format!("{SANDBOX_CHECKOUT_BASE}/{reference}"))
    }

    async fn verify(&self, _reference: &str) -> Result<ChargeStatus, UpstreamError> {
        Ok(ChargeStatus::Success)
    }
}

pub(crate) fn in_memory_deps(config: &WorkflowConfig) -> WorkflowDeps {
    WorkflowDeps::in_memory(
        Arc::new(InMemoryStore::new()),
        Arc::new(LoggingMailTransport),
        Arc::new(LocalBlobStorage::new(config.blob_dir.clone())),
        Arc::new(SandboxPaymentGateway),
    )
}
