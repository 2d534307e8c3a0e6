use lifelink::error::AppError;
use lifelink::workflows::identity::Account;
use lifelink::workflows::WorkflowState;

/// A development account together with a ready-to-use bearer token.
#[derive(Debug)]
pub(crate) struct SeededAccount {
    pub(crate) account: Account,
    pub(crate) bearer: String,
}

/// Enrolls one admin, one hospital and one verified donor and opens a session for each.
pub(crate) async fn seed_accounts(state: &WorkflowState) -> Result<Vec<SeededAccount>, AppError> {
    let admin = state
        .identity
        .enroll(Account::admin("Seed Admin", "admin@lifelink.dev"))
        .await?;
    let hospital = state
        .identity
        .enroll(
            Account::hospital("Seed Hospital", "hospital@lifelink.dev").with_location("Lagos"),
        )
        .await?;
    let donor = state
        .identity
        .enroll(
            Account::donor("Seed Donor", "donor@lifelink.dev")
                .with_blood_type("O+")
                .with_location("Lagos"),
        )
        .await?;
    let donor = state.identity.mark_verified(&donor.id)?;

    let mut seeded = Vec::with_capacity(3);
    for account in [admin, hospital, donor] {
        let session = state.sessions.issue(&account)?;
        seeded.push(SeededAccount {
            bearer: format!("Bearer {}", session.token),
            account,
        });
    }
    Ok(seeded)
}
