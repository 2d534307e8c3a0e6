//! Identity and verification gate.
//!
//! Owns email verification tokens, session authentication, hospital KYC review and the payment
//! gate consulted before privileged hospital actions.

pub mod domain;
pub mod kyc;
pub mod payment;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod token;

pub use domain::{
    Account, AccountId, AccountProfile, CheckoutSession, DonorDirectoryEntry, KycDecision,
    KycDocument, KycDocumentKind, KycForm, KycId, KycStatus, KycSubmission, KycUpload,
    PaymentPlan, PaymentRecord, PaymentStatus, Registration, Role,
};
pub use kyc::{KycService, MAX_KYC_DOCUMENT_BYTES};
pub use payment::PaymentService;
pub use repository::{AccountRepository, KycRepository, PaymentRepository, RevocationStore};
pub use router::identity_routes;
pub use service::{IdentityService, VerificationOutcome};
pub use session::{extract_bearer_token, Actor, SessionAuthority};
pub use token::{IssuedToken, TokenClaims, TokenError, TokenPurpose, TokenSigner};
