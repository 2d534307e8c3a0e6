use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    KycDecision, KycDocument, KycDocumentKind, KycForm, KycId, KycStatus, KycSubmission, KycUpload,
    Role,
};
use super::repository::{AccountRepository, KycRepository};
use super::session::Actor;
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::outbound::{bounded, BlobStorage};
use crate::workflows::sequence::next_id;

/// Hospital KYC intake and admin review.
pub struct KycService {
    accounts: Arc<dyn AccountRepository>,
    submissions: Arc<dyn KycRepository>,
    blobs: Arc<dyn BlobStorage>,
    timeout: Duration,
}

impl KycService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        submissions: Arc<dyn KycRepository>,
        blobs: Arc<dyn BlobStorage>,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            submissions,
            blobs,
            timeout,
        }
    }

    /// Uploads every document, then records a pending submission.
    ///
    /// Nothing is persisted unless all uploads succeed; artifacts uploaded by a failed call are
    /// removed again.
    pub async fn submit(
        &self,
        actor: &Actor,
        form: KycForm,
    ) -> Result<KycSubmission, WorkflowError> {
        actor.require(Role::Hospital)?;
        let hospital_id = actor.account_id.clone();
        if self.accounts.fetch(&hospital_id)?.is_none() {
            return Err(WorkflowError::not_found("hospital", hospital_id.as_str()));
        }

        let existing = self.submissions.for_hospital(&hospital_id)?;
        if existing.iter().any(|s| s.status == KycStatus::Pending) {
            return Err(WorkflowError::conflict(
                "a KYC submission is already pending review",
            ));
        }
        if existing.iter().any(|s| s.status == KycStatus::Approved) {
            return Err(WorkflowError::conflict("KYC already approved"));
        }

        let license_number = form.license_number.trim().to_string();
        let files = validate_documents(&license_number, &form.documents)?;

        let documents = self.upload_all(&files).await?;

        let submission = KycSubmission {
            id: KycId(next_id("kyc")),
            hospital_id,
            license_number,
            documents: documents.clone(),
            status: KycStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };

        match self.submissions.replace_declined(submission) {
            Ok(stored) => {
                info!(kyc = %stored.id, hospital = %stored.hospital_id, "KYC submitted");
                Ok(stored)
            }
            Err(error) => {
                self.discard(&documents).await;
                Err(match error {
                    RepositoryError::Conflict => WorkflowError::conflict(
                        "a KYC submission is already pending review or approved",
                    ),
                    other => other.into(),
                })
            }
        }
    }

    pub fn review(
        &self,
        actor: &Actor,
        id: &KycId,
        decision: KycDecision,
    ) -> Result<KycSubmission, WorkflowError> {
        actor.require(Role::Admin)?;
        let current = self
            .submissions
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found("kyc submission", id.0.clone()))?;
        if current.status != KycStatus::Pending {
            return Err(WorkflowError::conflict(format!(
                "KYC submission already {}",
                current.status.label()
            )));
        }

        let updated = self
            .submissions
            .transition(id, KycStatus::Pending, decision.target(), Utc::now())
            .map_err(|error| match error {
                RepositoryError::Conflict => {
                    WorkflowError::conflict("KYC submission was reviewed concurrently")
                }
                other => other.into(),
            })?;

        if updated.status == KycStatus::Approved {
            if let Err(error) = self.accounts.set_kyc_verified(&updated.hospital_id, true) {
                warn!(
                    kyc = %updated.id,
                    hospital = %updated.hospital_id,
                    %error,
                    "KYC approved but hospital flag not updated"
                );
            }
        }
        info!(kyc = %updated.id, status = updated.status.label(), "KYC reviewed");

        Ok(updated)
    }

    /// All submissions, newest first.
    pub fn list(&self, actor: &Actor) -> Result<Vec<KycSubmission>, WorkflowError> {
        actor.require(Role::Admin)?;
        let mut submissions = self.submissions.list()?;
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(submissions)
    }

    async fn upload_all(&self, files: &[KycFile]) -> Result<Vec<KycDocument>, WorkflowError> {
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            let upload = self.blobs.upload(&file.file_name, &file.bytes);
            match bounded("blob upload", self.timeout, upload).await {
                Ok(url) => documents.push(KycDocument {
                    kind: file.kind,
                    url,
                }),
                Err(error) => {
                    warn!(document = file.kind.label(), %error, "KYC upload failed");
                    self.discard(&documents).await;
                    return Err(error.into());
                }
            }
        }
        Ok(documents)
    }

    async fn discard(&self, documents: &[KycDocument]) {
        for document in documents {
            if let Err(error) =
                bounded("blob remove", self.timeout, self.blobs.remove(&document.url)).await
            {
                warn!(url = %document.url, %error, "failed to discard KYC upload");
            }
        }
    }
}

/// Largest accepted document after base64 decoding.
pub const MAX_KYC_DOCUMENT_BYTES: usize = 2 * 1024 * 1024;

const MAX_FILE_NAME_LEN: usize = 128;

/// A KYC document that passed validation, ready for blob storage.
struct KycFile {
    kind: KycDocumentKind,
    file_name: String,
    bytes: Vec<u8>,
}

fn validate_documents(
    license_number: &str,
    uploads: &[KycUpload],
) -> Result<Vec<KycFile>, WorkflowError> {
    if license_number.is_empty() {
        return Err(WorkflowError::validation("licenseNumber is required"));
    }

    let mut seen = BTreeSet::new();
    let mut files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let label = upload.kind.label();
        if !seen.insert(upload.kind) {
            return Err(WorkflowError::validation(format!(
                "{label} was supplied more than once"
            )));
        }
        let file_name = upload.file_name.trim();
        if !is_plain_file_name(file_name) {
            return Err(WorkflowError::validation(format!(
                "{label} needs a plain file name without directories"
            )));
        }
        let bytes = upload.decode().map_err(|_| {
            WorkflowError::validation(format!("{label} content is not valid base64"))
        })?;
        if bytes.is_empty() {
            return Err(WorkflowError::validation(format!("{label} is empty")));
        }
        if bytes.len() > MAX_KYC_DOCUMENT_BYTES {
            return Err(WorkflowError::validation(format!(
                "{label} exceeds {MAX_KYC_DOCUMENT_BYTES} bytes"
            )));
        }
        files.push(KycFile {
            kind: upload.kind,
            file_name: file_name.to_string(),
            bytes,
        });
    }

    let missing: Vec<&str> = KycDocumentKind::REQUIRED
        .iter()
        .filter(|kind| !seen.contains(*kind))
        .map(|kind| kind.label())
        .collect();
    if !missing.is_empty() {
        return Err(WorkflowError::validation(format!(
            "missing KYC documents: {}",
            missing.join(", ")
        )));
    }

    Ok(files)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILE_NAME_LEN
        && !name.starts_with('.')
        && !name.contains(['/', '\\', ':', '\0'])
}
