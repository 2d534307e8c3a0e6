use std::fmt;

use chrono::{DateTime, Utc};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

/// Identifier shared by donor, hospital and admin accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Hospital,
    Admin,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Hospital => "hospital",
            Role::Admin => "admin",
        }
    }

    fn id_prefix(self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Hospital => "hosp",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role-specific attributes; the variant is the account's role tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum AccountProfile {
    Donor {
        #[serde(rename = "bloodType")]
        blood_type: Option<String>,
        location: Option<String>,
        #[serde(rename = "isEmailVerified")]
        is_email_verified: bool,
    },
    Hospital {
        location: Option<String>,
        #[serde(rename = "isKycVerified")]
        is_kyc_verified: bool,
    },
    Admin,
}

impl AccountProfile {
    pub fn role(&self) -> Role {
        match self {
            AccountProfile::Donor { .. } => Role::Donor,
            AccountProfile::Hospital { .. } => Role::Hospital,
            AccountProfile::Admin => Role::Admin,
        }
    }
}

/// Resolved identity. One lookup by id yields the full discriminated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
}

impl Account {
    fn new(full_name: &str, email: &str, profile: AccountProfile) -> Self {
        Self {
            id: AccountId(crate::workflows::sequence::next_id(
                profile.role().id_prefix(),
            )),
            full_name: full_name.trim().to_string(),
            email: email.trim().to_ascii_lowercase(),
            profile,
            created_at: Utc::now(),
        }
    }

    pub fn donor(full_name: &str, email: &str) -> Self {
        Self::new(
            full_name,
            email,
            AccountProfile::Donor {
                blood_type: None,
                location: None,
                is_email_verified: false,
            },
        )
    }

    pub fn hospital(full_name: &str, email: &str) -> Self {
        Self::new(
            full_name,
            email,
            AccountProfile::Hospital {
                location: None,
                is_kyc_verified: false,
            },
        )
    }

    pub fn admin(full_name: &str, email: &str) -> Self {
        Self::new(full_name, email, AccountProfile::Admin)
    }

    pub fn with_location(mut self, value: &str) -> Self {
        match &mut self.profile {
            AccountProfile::Donor { location, .. } | AccountProfile::Hospital { location, .. } => {
                *location = Some(value.to_string());
            }
            AccountProfile::Admin => {}
        }
        self
    }

    pub fn with_blood_type(mut self, value: &str) -> Self {
        if let AccountProfile::Donor { blood_type, .. } = &mut self.profile {
            *blood_type = Some(value.to_string());
        }
        self
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn is_email_verified(&self) -> bool {
        matches!(
            self.profile,
            AccountProfile::Donor {
                is_email_verified: true,
                ..
            }
        )
    }

    pub fn is_kyc_verified(&self) -> bool {
        matches!(
            self.profile,
            AccountProfile::Hospital {
                is_kyc_verified: true,
                ..
            }
        )
    }

    /// Greeting name used in message templates.
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(self.full_name.as_str())
    }

    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }

    pub fn directory_entry(&self) -> Option<DonorDirectoryEntry> {
        match &self.profile {
            AccountProfile::Donor {
                blood_type,
                location,
                ..
            } => Some(DonorDirectoryEntry {
                id: self.id.clone(),
                full_name: self.full_name.clone(),
                email: self.email.clone(),
                blood_type: blood_type.clone(),
                location: location.clone(),
            }),
            _ => None,
        }
    }
}

/// Donor view exposed to paid, KYC-verified hospitals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorDirectoryEntry {
    pub id: AccountId,
    pub full_name: String,
    pub email: String,
    pub blood_type: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KycId(pub String);

impl fmt::Display for KycId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Declined,
}

impl KycStatus {
    pub fn label(self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KycDocumentKind {
    FacilityImage,
    AccreditedCertificate,
    UtilityBill,
}

impl KycDocumentKind {
    pub const REQUIRED: [KycDocumentKind; 3] = [
        KycDocumentKind::FacilityImage,
        KycDocumentKind::AccreditedCertificate,
        KycDocumentKind::UtilityBill,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KycDocumentKind::FacilityImage => "facilityImage",
            KycDocumentKind::AccreditedCertificate => "accreditedCertificate",
            KycDocumentKind::UtilityBill => "utilityBill",
        }
    }
}

/// Self-service sign-up. Admin accounts are never created this way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub role: Role,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Registration {
    pub fn into_account(self) -> Option<Account> {
        let full_name = self.full_name.trim();
        let email = self.email.trim();
        let mut account = match self.role {
            Role::Donor => Account::donor(full_name, email),
            Role::Hospital => Account::hospital(full_name, email),
            Role::Admin => return None,
        };
        if let Some(blood_type) = self.blood_type.as_deref() {
            account = account.with_blood_type(blood_type.trim());
        }
        if let Some(location) = self.location.as_deref() {
            account = account.with_location(location.trim());
        }
        Some(account)
    }
}

/// Document received with a KYC submission. `content` is the file in standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycUpload {
    pub kind: KycDocumentKind,
    pub file_name: String,
    pub content: String,
}

impl KycUpload {
    pub fn from_bytes(kind: KycDocumentKind, file_name: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            content: BASE64.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.content.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycForm {
    pub license_number: String,
    pub documents: Vec<KycUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycDocument {
    pub kind: KycDocumentKind,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycSubmission {
    pub id: KycId,
    pub hospital_id: AccountId,
    pub license_number: String,
    pub documents: Vec<KycDocument>,
    pub status: KycStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycDecision {
    Approve,
    Decline,
}

impl KycDecision {
    pub fn target(self) -> KycStatus {
        match self {
            KycDecision::Approve => KycStatus::Approved,
            KycDecision::Decline => KycStatus::Declined,
        }
    }
}

/// Subscription plans and their price in naira.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPlan {
    Monthly,
    Quarterly,
    Yearly,
}

impl PaymentPlan {
    pub fn amount(self) -> u64 {
        match self {
            PaymentPlan::Monthly => 10_000,
            PaymentPlan::Quarterly => 30_000,
            PaymentPlan::Yearly => 100_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub reference: String,
    pub hospital_id: AccountId,
    pub amount: u64,
    pub plan: PaymentPlan,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub reference: String,
    pub checkout_url: String,
    pub amount: u64,
    pub plan: PaymentPlan,
}
