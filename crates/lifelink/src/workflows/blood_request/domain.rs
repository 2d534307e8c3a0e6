use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::calendar::parse_calendar_date;
use crate::workflows::error::WorkflowError;
use crate::workflows::identity::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BloodRequestId(pub String);

impl fmt::Display for BloodRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ABO/Rh blood groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "A+" => Some(Self::APositive),
            "A-" => Some(Self::ANegative),
            "B+" => Some(Self::BPositive),
            "B-" => Some(Self::BNegative),
            "AB+" => Some(Self::AbPositive),
            "AB-" => Some(Self::AbNegative),
            "O+" => Some(Self::OPositive),
            "O-" => Some(Self::ONegative),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloodRequestStatus {
    Pending,
    Accepted,
    Cancelled,
}

/// A hospital's posted need. Only `status` may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequest {
    pub id: BloodRequestId,
    pub hospital_id: AccountId,
    pub hospital_name: String,
    pub blood_group: BloodGroup,
    pub pints: u32,
    pub preferred_date: NaiveDate,
    pub urgency: Urgency,
    pub amount: f64,
    pub status: BloodRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Form fields arrive either as JSON numbers or as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequestForm {
    #[serde(alias = "bloodType")]
    pub blood_group: Option<String>,
    #[serde(alias = "numberOfPints")]
    pub pints: Option<NumberOrText>,
    #[serde(alias = "date")]
    pub preferred_date: Option<String>,
    #[serde(alias = "urgencyLevel")]
    pub urgency: Option<String>,
    pub amount: Option<NumberOrText>,
}

/// Form fields after validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBloodRequest {
    pub blood_group: BloodGroup,
    pub pints: u32,
    pub preferred_date: NaiveDate,
    pub urgency: Urgency,
    pub amount: f64,
}

impl BloodRequestForm {
    pub fn validate(&self) -> Result<ValidatedBloodRequest, WorkflowError> {
        let blood_group = match self.blood_group.as_deref().map(str::trim) {
            None | Some("") => return Err(WorkflowError::validation("bloodGroup is required")),
            Some(raw) => BloodGroup::parse(raw).ok_or_else(|| {
                WorkflowError::validation(format!("unknown blood group '{raw}'"))
            })?,
        };

        let pints = match &self.pints {
            None => return Err(WorkflowError::validation("pints is required")),
            Some(value) => parse_pints(value)?,
        };

        let preferred_date = match self.preferred_date.as_deref() {
            None => return Err(WorkflowError::validation("preferredDate is required")),
            Some(raw) => parse_calendar_date(raw).ok_or_else(|| {
                WorkflowError::validation(format!("preferredDate '{raw}' is not a valid date"))
            })?,
        };

        let urgency = match self.urgency.as_deref().map(str::trim) {
            None | Some("") => Urgency::default(),
            Some(raw) => Urgency::parse(raw).ok_or_else(|| {
                WorkflowError::validation(format!("urgency '{raw}' must be low, medium or high"))
            })?,
        };

        let amount = match &self.amount {
            None => return Err(WorkflowError::validation("amount is required")),
            Some(value) => parse_amount(value)?,
        };

        Ok(ValidatedBloodRequest {
            blood_group,
            pints,
            preferred_date,
            urgency,
            amount,
        })
    }
}

fn parse_pints(value: &NumberOrText) -> Result<u32, WorkflowError> {
    let pints = match value {
        NumberOrText::Number(n) if n.is_finite() && n.fract() == 0.0 && *n >= 1.0 => {
            u32::try_from(*n as u64).ok()
        }
        NumberOrText::Number(_) => None,
        NumberOrText::Text(raw) => raw.trim().parse::<u32>().ok().filter(|p| *p >= 1),
    };
    pints.ok_or_else(|| WorkflowError::validation("pints must be a positive whole number"))
}

/// Accepts numbers or strings such as `"15,000"`.
pub(crate) fn parse_amount(value: &NumberOrText) -> Result<f64, WorkflowError> {
    let amount = match value {
        NumberOrText::Number(n) => Some(*n),
        NumberOrText::Text(raw) => raw.trim().replace(',', "").parse::<f64>().ok(),
    };
    amount
        .filter(|a| a.is_finite() && *a > 0.0)
        .ok_or_else(|| WorkflowError::validation("amount must be a positive number"))
}

/// Outcome of a broadcast: the stored request plus delivery counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastReceipt {
    pub request: BloodRequest,
    pub notified: usize,
    pub emailed: usize,
    pub email_failures: usize,
}
