//! LifeLink workflow and notification engine.
//!
//! The crate owns the state machines that move blood requests and donor appointments through
//! their lifecycle, the identity gate consulted before privileged hospital actions, and the
//! per-account notification mailbox those workflows fan out to.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
