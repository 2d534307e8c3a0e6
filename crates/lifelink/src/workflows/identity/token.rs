//! Signed, time-limited tokens for email verification and API sessions.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::domain::{AccountId, Role};

/// Lifetime of the token mailed on registration or explicit resend.
pub const VERIFICATION_TTL_SECS: i64 = 10 * 60;
/// Lifetime of the replacement minted when an expired verification link is used.
pub const REISSUED_VERIFICATION_TTL_SECS: i64 = 3 * 60;
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    EmailVerification,
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: Role,
    pub purpose: TokenPurpose,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl TokenClaims {
    pub fn account_id(&self) -> AccountId {
        AccountId(self.sub.clone())
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired { claims: TokenClaims },
    #[error("token invalid: {0}")]
    Invalid(String),
    #[error("token revoked")]
    Revoked,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

/// HS256 signer shared by verification links and sessions.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(
        &self,
        subject: &AccountId,
        role: Role,
        purpose: TokenPurpose,
        ttl_secs: i64,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, role, purpose, ttl_secs, Utc::now())
    }

    /// Issues a token as if minted at `issued_at`.
    pub fn issue_at(
        &self,
        subject: &AccountId,
        role: Role,
        purpose: TokenPurpose,
        ttl_secs: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = TokenClaims {
            sub: subject.0.clone(),
            role,
            purpose,
            jti: token_id(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::seconds(ttl_secs)).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|error| TokenError::Invalid(error.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Checks signature, expiry and purpose.
    ///
    /// An expired but authentic token yields [`TokenError::Expired`] carrying its claims so the
    /// caller can mint a replacement for the same subject.
    pub fn verify(&self, token: &str, purpose: TokenPurpose) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = match decode::<TokenClaims>(token, &self.decoding, &validation) {
            Ok(data) => data.claims,
            Err(error) if matches!(error.kind(), ErrorKind::ExpiredSignature) => {
                validation.validate_exp = false;
                let data = decode::<TokenClaims>(token, &self.decoding, &validation)
                    .map_err(|error| TokenError::Invalid(error.to_string()))?;
                if data.claims.purpose != purpose {
                    return Err(TokenError::Invalid("token purpose mismatch".to_string()));
                }
                return Err(TokenError::Expired {
                    claims: data.claims,
                });
            }
            Err(error) => return Err(TokenError::Invalid(error.to_string())),
        };

        if claims.purpose != purpose {
            return Err(TokenError::Invalid("token purpose mismatch".to_string()));
        }

        Ok(claims)
    }
}

fn token_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}
