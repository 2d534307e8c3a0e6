use super::domain::{BloodRequest, BloodRequestId};
use crate::workflows::error::RepositoryError;
use crate::workflows::identity::AccountId;

pub trait BloodRequestRepository: Send + Sync {
    fn insert(&self, request: BloodRequest) -> Result<BloodRequest, RepositoryError>;
    fn fetch(&self, id: &BloodRequestId) -> Result<Option<BloodRequest>, RepositoryError>;
    fn remove(&self, id: &BloodRequestId) -> Result<BloodRequest, RepositoryError>;
    fn for_hospital(&self, hospital: &AccountId) -> Result<Vec<BloodRequest>, RepositoryError>;
}
