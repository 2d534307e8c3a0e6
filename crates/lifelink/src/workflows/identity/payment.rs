use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::info;

use super::domain::{CheckoutSession, PaymentPlan, PaymentRecord, PaymentStatus, Role};
use super::repository::{AccountRepository, PaymentRepository};
use super::session::Actor;
use crate::workflows::error::WorkflowError;
use crate::workflows::outbound::{bounded, ChargeStatus, PaymentCustomer, PaymentGateway};

pub struct PaymentService {
    accounts: Arc<dyn AccountRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    timeout: Duration,
}

impl PaymentService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            payments,
            gateway,
            timeout,
        }
    }

    /// Opens a gateway checkout and records the pending transaction.
    pub async fn initialize(
        &self,
        actor: &Actor,
        plan: PaymentPlan,
    ) -> Result<CheckoutSession, WorkflowError> {
        actor.require(Role::Hospital)?;
        let hospital = self
            .accounts
            .fetch(&actor.account_id)?
            .ok_or_else(|| WorkflowError::not_found("hospital", actor.account_id.as_str()))?;

        let reference = payment_reference();
        let amount = plan.amount();
        let customer = PaymentCustomer {
            email: hospital.email.clone(),
            name: hospital.full_name.clone(),
        };
        let checkout_url = bounded(
            "payment initialize",
            self.timeout,
            self.gateway.initialize(amount, &customer, &reference),
        )
        .await?;

        self.payments.insert(PaymentRecord {
            reference: reference.clone(),
            hospital_id: hospital.id.clone(),
            amount,
            plan,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        })?;
        info!(hospital = %hospital.id, %reference, amount, "payment initialized");

        Ok(CheckoutSession {
            reference,
            checkout_url,
            amount,
            plan,
        })
    }

    /// Asks the gateway for the charge outcome and settles the transaction.
    pub async fn verify(
        &self,
        actor: &Actor,
        reference: &str,
    ) -> Result<PaymentRecord, WorkflowError> {
        actor.require(Role::Hospital)?;
        let record = self
            .payments
            .fetch(reference)?
            .ok_or_else(|| WorkflowError::not_found("payment", reference))?;
        if record.hospital_id != actor.account_id {
            return Err(WorkflowError::forbidden(
                "payment belongs to another hospital",
            ));
        }
        if record.status != PaymentStatus::Pending {
            return Ok(record);
        }

        let charge = bounded(
            "payment verify",
            self.timeout,
            self.gateway.verify(reference),
        )
        .await?;
        let status = match charge {
            ChargeStatus::Success => PaymentStatus::Success,
            ChargeStatus::Failed => PaymentStatus::Failed,
            ChargeStatus::Pending => return Ok(record),
        };

        let settled = self.payments.set_status(reference, status)?;
        info!(hospital = %settled.hospital_id, %reference, ?status, "payment settled");
        Ok(settled)
    }
}

fn payment_reference() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("LifeLink-{suffix}")
}
