use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::domain::{Account, AccountId, DonorDirectoryEntry, Registration, Role};
use super::repository::{AccountRepository, PaymentRepository};
use super::session::Actor;
use super::token::{
    IssuedToken, TokenError, TokenPurpose, TokenSigner, REISSUED_VERIFICATION_TTL_SECS,
    VERIFICATION_TTL_SECS,
};
use crate::workflows::error::{RepositoryError, WorkflowError};
use crate::workflows::outbound::{MailDispatcher, MailMessage};

/// Result of following an email verification link.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum VerificationOutcome {
    Verified {
        account: Account,
    },
    /// The link had expired; a replacement was mailed.
    Resent {
        #[serde(rename = "accountId")]
        account_id: AccountId,
        #[serde(rename = "expiresAt")]
        expires_at: DateTime<Utc>,
    },
}

/// Email verification, account lookup and the payment/KYC gate.
pub struct IdentityService {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    signer: Arc<TokenSigner>,
    mailer: MailDispatcher,
    verify_link_base: String,
}

impl IdentityService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payments: Arc<dyn PaymentRepository>,
        signer: Arc<TokenSigner>,
        mailer: MailDispatcher,
        verify_link_base: impl Into<String>,
    ) -> Self {
        Self {
            accounts,
            payments,
            signer,
            mailer,
            verify_link_base: verify_link_base.into(),
        }
    }

    /// Stores a new account. Unverified donors are mailed a verification link.
    pub async fn enroll(&self, account: Account) -> Result<Account, WorkflowError> {
        if account.full_name.is_empty() {
            return Err(WorkflowError::validation("fullName is required"));
        }
        if !account.email.contains('@') {
            return Err(WorkflowError::validation("a valid email is required"));
        }

        let stored = self.accounts.insert(account).map_err(|error| match error {
            RepositoryError::Conflict => WorkflowError::conflict("email already registered"),
            other => other.into(),
        })?;
        info!(account = %stored.id, role = %stored.role(), "account enrolled");

        if stored.role() == Role::Donor && !stored.is_email_verified() {
            let issued = self.issue_verification_token(&stored.id, Role::Donor)?;
            self.mailer
                .send_best_effort(self.verification_mail(&stored, &issued))
                .await;
        }

        Ok(stored)
    }

    /// Enrolls a donor or hospital from a public sign-up.
    pub async fn register(&self, registration: Registration) -> Result<Account, WorkflowError> {
        let account = registration
            .into_account()
            .ok_or_else(|| WorkflowError::validation("role must be donor or hospital"))?;
        self.enroll(account).await
    }

    pub fn account(&self, id: &AccountId) -> Result<Account, WorkflowError> {
        self.accounts
            .fetch(id)?
            .ok_or_else(|| WorkflowError::not_found("account", id.as_str()))
    }

    pub fn issue_verification_token(
        &self,
        account_id: &AccountId,
        role: Role,
    ) -> Result<IssuedToken, WorkflowError> {
        Ok(self.signer.issue(
            account_id,
            role,
            TokenPurpose::EmailVerification,
            VERIFICATION_TTL_SECS,
        )?)
    }

    pub fn verify_token(&self, token: &str) -> Result<AccountId, TokenError> {
        self.signer
            .verify(token, TokenPurpose::EmailVerification)
            .map(|claims| claims.account_id())
    }

    /// Sets the verified flag; an already verified account is a `Conflict`.
    pub fn mark_verified(&self, account_id: &AccountId) -> Result<Account, WorkflowError> {
        let account = self.account(account_id)?;
        if account.role() != Role::Donor {
            return Err(WorkflowError::validation(
                "only donor accounts carry email verification",
            ));
        }

        if !self.accounts.mark_email_verified(account_id)? {
            return Err(WorkflowError::conflict("email already verified"));
        }
        info!(account = %account_id, "email verified");

        self.account(account_id)
    }

    /// Follows a verification link. An expired link mints a short-lived replacement.
    pub async fn verify_email(&self, token: &str) -> Result<VerificationOutcome, WorkflowError> {
        match self.verify_token(token) {
            Ok(account_id) => {
                let account = self.mark_verified(&account_id)?;
                Ok(VerificationOutcome::Verified { account })
            }
            Err(TokenError::Expired { claims }) => {
                let account = self.account(&claims.account_id())?;
                if account.is_email_verified() {
                    return Err(WorkflowError::conflict("email already verified"));
                }

                let issued = self.signer.issue(
                    &account.id,
                    account.role(),
                    TokenPurpose::EmailVerification,
                    REISSUED_VERIFICATION_TTL_SECS,
                )?;
                self.mailer
                    .send(self.verification_mail(&account, &issued))
                    .await?;
                info!(account = %account.id, "expired verification link replaced");

                Ok(VerificationOutcome::Resent {
                    account_id: account.id,
                    expires_at: issued.claims.expires_at(),
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    pub async fn resend_verification(&self, email: &str) -> Result<IssuedToken, WorkflowError> {
        let normalized = email.trim().to_ascii_lowercase();
        let account = self
            .accounts
            .find_by_email(&normalized)?
            .ok_or_else(|| WorkflowError::not_found("account", normalized.clone()))?;

        if account.role() != Role::Donor {
            return Err(WorkflowError::validation(
                "only donor accounts carry email verification",
            ));
        }
        if account.is_email_verified() {
            return Err(WorkflowError::conflict("email already verified"));
        }

        let issued = self.issue_verification_token(&account.id, Role::Donor)?;
        self.mailer
            .send(self.verification_mail(&account, &issued))
            .await?;
        Ok(issued)
    }

    /// True iff the hospital has at least one successful payment.
    pub fn require_paid(&self, hospital_id: &AccountId) -> Result<bool, WorkflowError> {
        Ok(self.payments.has_successful(hospital_id)?)
    }

    pub fn search_donors(&self, actor: &Actor) -> Result<Vec<DonorDirectoryEntry>, WorkflowError> {
        actor.require(Role::Hospital)?;
        let hospital = self.account(&actor.account_id)?;
        if !hospital.is_kyc_verified() {
            return Err(WorkflowError::forbidden("KYC verification incomplete"));
        }
        if !self.require_paid(&hospital.id)? {
            return Err(WorkflowError::forbidden("an active payment is required"));
        }

        let donors = self.accounts.list_by_role(Role::Donor)?;
        Ok(donors
            .iter()
            .filter_map(Account::directory_entry)
            .collect())
    }

    /// Removes an account and its mailbox. Appointments and requests stay for audit.
    pub fn delete_account(
        &self,
        actor: &Actor,
        account_id: &AccountId,
    ) -> Result<Account, WorkflowError> {
        actor.require(Role::Admin)?;
        let removed = self.accounts.remove(account_id).map_err(|error| match error {
            RepositoryError::NotFound => WorkflowError::not_found("account", account_id.as_str()),
            other => other.into(),
        })?;
        info!(account = %removed.id, role = %removed.role(), "account deleted");
        Ok(removed)
    }

    fn verification_mail(&self, account: &Account, issued: &IssuedToken) -> MailMessage {
        let minutes = (issued.claims.exp - issued.claims.iat) / 60;
        MailMessage {
            to: account.email.clone(),
            subject: "Verify your LifeLink email".to_string(),
            body: format!(
                "Hello {}, confirm your email address within {} minutes: {}/{}",
                account.first_name(),
                minutes,
                self.verify_link_base,
                issued.token
            ),
        }
    }
}
