//! Blood request creation and donor broadcast.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    BloodGroup, BloodRequest, BloodRequestForm, BloodRequestId, BloodRequestStatus,
    BroadcastReceipt, NumberOrText, Urgency,
};
pub use repository::BloodRequestRepository;
pub use router::blood_request_routes;
pub use service::BloodRequestService;
