use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::calendar::parse_calendar_date;
use crate::workflows::error::WorkflowError;
use crate::workflows::identity::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub String);

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical appointment states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Accepted,
    Cancelled,
    Rescheduled,
}

impl AppointmentStatus {
    /// Parses canonical names and the legacy `confirmed`/`declined`/`cancel` spellings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" | "confirmed" => Some(Self::Accepted),
            "cancelled" | "canceled" | "cancel" | "declined" => Some(Self::Cancelled),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
        }
    }

    /// Whether the owning hospital may still respond.
    pub fn can_respond(self) -> bool {
        matches!(self, Self::Pending | Self::Rescheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub donor_id: AccountId,
    pub hospital_id: AccountId,
    pub date: NaiveDate,
    pub time: String,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every accepted transition.
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingForm {
    pub hospital_id: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseForm {
    pub status: String,
    #[serde(default)]
    pub new_date: Option<String>,
    #[serde(default)]
    pub new_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HospitalDecision {
    Accept,
    Cancel,
    Reschedule { date: NaiveDate, time: String },
}

impl HospitalDecision {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            HospitalDecision::Accept => AppointmentStatus::Accepted,
            HospitalDecision::Cancel => AppointmentStatus::Cancelled,
            HospitalDecision::Reschedule { .. } => AppointmentStatus::Rescheduled,
        }
    }
}

impl ResponseForm {
    pub fn decision(&self) -> Result<HospitalDecision, WorkflowError> {
        let status = AppointmentStatus::parse(&self.status).ok_or_else(|| {
            WorkflowError::validation(format!("unknown appointment status '{}'", self.status))
        })?;

        match status {
            AppointmentStatus::Accepted => Ok(HospitalDecision::Accept),
            AppointmentStatus::Cancelled => Ok(HospitalDecision::Cancel),
            AppointmentStatus::Rescheduled => {
                let raw_date = non_empty(self.new_date.as_deref()).ok_or_else(|| {
                    WorkflowError::validation("newDate is required to reschedule")
                })?;
                let raw_time = non_empty(self.new_time.as_deref()).ok_or_else(|| {
                    WorkflowError::validation("newTime is required to reschedule")
                })?;
                Ok(HospitalDecision::Reschedule {
                    date: parse_date(raw_date)?,
                    time: parse_time(raw_time)?,
                })
            }
            AppointmentStatus::Pending => Err(WorkflowError::validation(
                "pending is not a valid response",
            )),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, WorkflowError> {
    parse_calendar_date(raw)
        .ok_or_else(|| WorkflowError::validation(format!("'{raw}' is not a valid date")))
}

/// Validates `HH:MM` (or `HH:MM:SS`) and returns the trimmed original text.
pub(crate) fn parse_time(raw: &str) -> Result<String, WorkflowError> {
    let trimmed = raw.trim();
    let valid = NaiveTime::parse_from_str(trimmed, "%H:%M").is_ok()
        || NaiveTime::parse_from_str(trimmed, "%H:%M:%S").is_ok();
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(WorkflowError::validation(format!(
            "'{raw}' is not a valid time of day"
        )))
    }
}
