//! Per-account notification mailbox.
//!
//! Entries are appended only by the workflow engines; owners may mark them read, delete them or
//! clear the mailbox.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{MailboxListing, NotificationDraft, NotificationEntry};
pub use repository::MailboxStore;
pub use router::mailbox_routes;
pub use service::MailboxService;
