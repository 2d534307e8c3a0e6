use crate::infra::in_memory_deps;
use chrono::{Duration, Utc};
use clap::Args;
use lifelink::config::WorkflowConfig;
use lifelink::error::AppError;
use lifelink::workflows::appointment::{BookingForm, ResponseForm};
use lifelink::workflows::blood_request::{BloodRequestForm, NumberOrText};
use lifelink::workflows::identity::{Account, Actor};
use lifelink::workflows::WorkflowState;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of donors enrolled before the blood request goes out
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..))]
    pub(crate) donors: u16,
    /// Skip the appointment booking and reschedule walkthrough
    #[arg(long)]
    pub(crate) skip_appointment: bool,
    /// Print mailboxes as JSON instead of a text listing
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = WorkflowConfig::development();
    let state = WorkflowState::new(in_memory_deps(&config), &config);

    println!("LifeLink workflow demo");

    let mut donors = Vec::with_capacity(usize::from(args.donors));
    for index in 1..=args.donors {
        let enrolled = state
            .identity
            .enroll(Account::donor(
                &format!("Demo Donor {index}"),
                &format!("donor{index}@lifelink.demo"),
            ))
            .await?;
        donors.push(state.identity.mark_verified(&enrolled.id)?);
    }
    let hospital = state
        .identity
        .enroll(Account::hospital(
            "Lagos General Hospital",
            "lgh@lifelink.demo",
        ))
        .await?;
    println!(
        "- Enrolled {} verified donor(s) and {}",
        donors.len(),
        hospital.full_name
    );

    println!("\nBlood request broadcast");
    let hospital_actor = actor_for(&state, &hospital)?;
    let receipt = state
        .blood_requests
        .submit(
            &hospital_actor,
            BloodRequestForm {
                blood_group: Some("O+".to_string()),
                pints: Some(NumberOrText::Number(3.0)),
                preferred_date: Some(
                    (Utc::now().date_naive() + Duration::days(7))
                        .format("%Y-%m-%d")
                        .to_string(),
                ),
                urgency: Some("high".to_string()),
                amount: Some(NumberOrText::Text("15,000".to_string())),
            },
        )
        .await?;
    println!(
        "- Request {} reached {} mailbox(es); {} email(s) sent, {} failed",
        receipt.request.id, receipt.notified, receipt.emailed, receipt.email_failures
    );
    for donor in &donors {
        print_mailbox(&state, donor, args.json)?;
    }

    if args.skip_appointment {
        return Ok(());
    }

    let Some(donor) = donors.first() else {
        return Ok(());
    };

    println!("\nAppointment booking and reschedule");
    let booked_for = Utc::now().date_naive() + Duration::days(30);
    let appointment = state
        .appointments
        .book(
            &actor_for(&state, donor)?,
            BookingForm {
                hospital_id: hospital.id.to_string(),
                date: booked_for.format("%Y-%m-%d").to_string(),
                time: "09:00".to_string(),
            },
        )
        .await?;
    println!(
        "- {} booked {} for {} at {}",
        donor.full_name, appointment.id, appointment.date, appointment.time
    );
    print_mailbox(&state, &hospital, args.json)?;

    let moved_to = booked_for + Duration::days(31);
    let updated = state
        .appointments
        .respond(
            &hospital_actor,
            &appointment.id,
            ResponseForm {
                status: "rescheduled".to_string(),
                new_date: Some(moved_to.format("%Y-%m-%d").to_string()),
                new_time: Some("10:00".to_string()),
            },
        )
        .await?;
    println!(
        "- {} moved {} to {} at {} ({})",
        hospital.full_name,
        updated.id,
        updated.date,
        updated.time,
        updated.status.label()
    );
    print_mailbox(&state, donor, args.json)?;

    Ok(())
}

fn actor_for(state: &WorkflowState, account: &Account) -> Result<Actor, AppError> {
    let issued = state.sessions.issue(account)?;
    Ok(state.sessions.authenticate(&issued.token)?)
}

fn print_mailbox(state: &WorkflowState, account: &Account, as_json: bool) -> Result<(), AppError> {
    let listing = state.mailbox.list_all(&account.id)?;
    if as_json {
        match serde_json::to_string_pretty(&listing) {
            Ok(json) => println!("  Mailbox of {}:\n{}", account.full_name, json),
            Err(err) => println!("  Mailbox of {} could not be rendered: {}", account.full_name, err),
        }
        return Ok(());
    }

    println!(
        "  Mailbox of {} ({} notification(s))",
        account.full_name, listing.count
    );
    for entry in &listing.notifications {
        let marker = if entry.read { " " } else { "*" };
        println!(
            "    {marker} [{}] from {}: {}",
            entry.date.format("%Y-%m-%d %H:%M"),
            entry.from,
            entry.message
        );
    }
    Ok(())
}
