use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{Account, AccountId, Role};
use super::repository::{AccountRepository, RevocationStore};
use super::token::{IssuedToken, TokenError, TokenPurpose, TokenSigner, SESSION_TTL_SECS};
use crate::workflows::error::WorkflowError;

/// Authenticated caller resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub account_id: AccountId,
    pub role: Role,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl Actor {
    pub fn require(&self, role: Role) -> Result<(), WorkflowError> {
        if self.role == role {
            Ok(())
        } else {
            Err(WorkflowError::forbidden(format!(
                "{} accounts cannot perform this action",
                self.role
            )))
        }
    }
}

/// Returns the token part of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

pub struct SessionAuthority {
    signer: Arc<TokenSigner>,
    accounts: Arc<dyn AccountRepository>,
    revocations: Arc<dyn RevocationStore>,
}

impl SessionAuthority {
    pub fn new(
        signer: Arc<TokenSigner>,
        accounts: Arc<dyn AccountRepository>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            signer,
            accounts,
            revocations,
        }
    }

    pub fn issue(&self, account: &Account) -> Result<IssuedToken, WorkflowError> {
        let issued = self.signer.issue(
            &account.id,
            account.role(),
            TokenPurpose::Session,
            SESSION_TTL_SECS,
        )?;
        Ok(issued)
    }

    /// Verifies the token, checks the revocation store once and resolves the account.
    pub fn authenticate(&self, token: &str) -> Result<Actor, WorkflowError> {
        let claims = match self.signer.verify(token, TokenPurpose::Session) {
            Ok(claims) => claims,
            Err(TokenError::Expired { .. }) => {
                return Err(WorkflowError::unauthenticated("session expired"))
            }
            Err(error) => return Err(WorkflowError::unauthenticated(error.to_string())),
        };

        if self.revocations.is_revoked(&claims.jti, Utc::now())? {
            return Err(TokenError::Revoked.into());
        }

        let account_id = claims.account_id();
        if self.accounts.fetch(&account_id)?.is_none() {
            return Err(WorkflowError::unauthenticated("account no longer exists"));
        }

        Ok(Actor {
            account_id,
            role: claims.role,
            expires_at: claims.expires_at(),
            token_id: claims.jti,
        })
    }

    pub fn revoke(&self, actor: &Actor) -> Result<(), WorkflowError> {
        self.revocations.revoke(&actor.token_id, actor.expires_at)?;
        debug!(account = %actor.account_id, "session revoked");
        Ok(())
    }
}
