use chrono::{Duration, Local};
use dotenv::dotenv;
use log::info;
use medbook::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();

    let username = env::var("MEDBOOK_PATIENT_USER").expect("MEDBOOK_PATIENT_USER must be set");
    let password = env::var("MEDBOOK_PATIENT_PASSWORD").expect("MEDBOOK_PATIENT_PASSWORD must be set");

    let client = MedBook::from_env()?;
    let session = client.session();

    // Resume a persisted session if there is one
    if let AuthStatus::Authenticated(identity) = session.start().await {
        println!("Resumed session for {}", identity.display_name());
    } else {
        let identity = session.login(&username, &password).await?;
        println!("Logged in as {} ({:?})", identity.display_name(), identity.role);
    }

    let doctors = client.doctors().list().await?;
    let Some(doctor) = doctors.first() else {
        println!("No doctors registered");
        return Ok(());
    };
    println!("Booking with {}", doctor.display_name());

    let date = (Local::now() + Duration::days(1)).date_naive();
    let slots = match client.availability().list_slots(doctor.id, date).await? {
        Resolved::Current(slots) => slots,
        Resolved::Superseded => return Ok(()),
    };
    println!("{} free slots on {}", slots.len(), date);
    for slot in &slots {
        println!("  {} - {}", slot.start_time().time(), slot.end_time().time());
    }

    let Some(slot) = slots.first() else {
        return Ok(());
    };
    let appointment = match client
        .appointments()
        .create(doctor.id, Some(slot), "Routine checkup", None)
        .await
    {
        Ok(appointment) => appointment,
        Err(Error::Conflict(message)) => {
            println!("Slot was taken meanwhile: {}", message);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    info!("Created appointment {}", appointment.id);
    println!(
        "Booked appointment {} at {} ({})",
        appointment.id, appointment.start_time, appointment.status
    );

    let cancelled = client.appointments().cancel(appointment.id).await?;
    println!("Appointment {} is now {}", cancelled.id, cancelled.status);

    session.logout();
    Ok(())
}
