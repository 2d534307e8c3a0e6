use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::sequence::next_id;

/// One mailbox entry. Only `read` changes after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEntry {
    pub id: String,
    pub message: String,
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    pub date: DateTime<Utc>,
    pub read: bool,
}

/// Template for entries the engines are about to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub message: String,
    pub from: String,
    pub request_id: Option<String>,
    pub appointment_id: Option<String>,
}

impl NotificationDraft {
    pub fn new(from: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            from: from.into(),
            request_id: None,
            appointment_id: None,
        }
    }

    pub fn for_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn for_appointment(mut self, appointment_id: impl Into<String>) -> Self {
        self.appointment_id = Some(appointment_id.into());
        self
    }

    /// Materializes an unread entry stamped with `date`.
    pub fn materialize(&self, date: DateTime<Utc>) -> NotificationEntry {
        NotificationEntry {
            id: next_id("ntf"),
            message: self.message.clone(),
            from: self.from.clone(),
            request_id: self.request_id.clone(),
            appointment_id: self.appointment_id.clone(),
            date,
            read: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MailboxListing {
    pub count: usize,
    pub notifications: Vec<NotificationEntry>,
}

impl From<Vec<NotificationEntry>> for MailboxListing {
    fn from(notifications: Vec<NotificationEntry>) -> Self {
        Self {
            count: notifications.len(),
            notifications,
        }
    }
}
