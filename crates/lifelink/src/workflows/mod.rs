pub mod appointment;
pub mod blood_request;
pub(crate) mod calendar;
pub mod error;
pub mod identity;
pub mod mailbox;
pub mod memory;
pub mod outbound;
pub(crate) mod sequence;
pub mod state;

#[cfg(test)]
mod tests;

pub use error::{RepositoryError, WorkflowError};
pub use memory::InMemoryStore;
pub use state::{workflow_router, WorkflowDeps, WorkflowState};
