use chrono::{Local, NaiveTime};
use dotenv::dotenv;
use medbook::prelude::*;
use std::env;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();

    let username = env::var("MEDBOOK_DOCTOR_USER").expect("MEDBOOK_DOCTOR_USER must be set");
    let password = env::var("MEDBOOK_DOCTOR_PASSWORD").expect("MEDBOOK_DOCTOR_PASSWORD must be set");

    let client = MedBook::from_env()?;
    let identity = client.session().login(&username, &password).await?;
    println!("Logged in as {}", identity.display_name());
    println!("Capabilities: {:?}", identity.role.capabilities());

    // Watch for the session ending under us
    let mut changes = client.session().on_change();
    tokio::spawn(async move {
        while let Ok(status) = changes.recv().await {
            if !status.is_authenticated() {
                println!("Session ended");
            }
        }
    });

    let today = Local::now().date_naive();
    let draft = AvailabilityDraft::new(
        Recurrence::Weekly(DayOfWeek::of(today)),
        NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
        NaiveTime::from_hms_opt(12, 0, 0).expect("valid time"),
    )
    .slot_duration(20)
    .notes("Morning clinic");
    let window = client.availability().create_availability(draft).await?;
    println!(
        "Published window {}: {:?} {}-{}",
        window.id, window.recurrence, window.start_time, window.end_time
    );

    for window in client.availability().my_availabilities().await? {
        println!("  window {} {:?}", window.id, window.recurrence);
    }

    let appointments = client.appointments().list().await?;
    println!("{} appointments", appointments.len());
    for appointment in &appointments {
        println!(
            "  #{} {} {} next: {:?}",
            appointment.id,
            appointment.start_time,
            appointment.status,
            client.appointments().allowed_transitions(appointment)
        );
    }

    if let Some(next) = appointments
        .iter()
        .find(|a| a.status == AppointmentStatus::Scheduled)
    {
        let started = client
            .appointments()
            .update_status(next.id, AppointmentStatus::InProgress)
            .await?;
        println!("Appointment {} is now {}", started.id, started.status);

        let noted = client
            .appointments()
            .update_notes(started.id, "Patient seen, follow-up in two weeks")
            .await?;
        println!("Notes: {:?}", noted.notes);
    }

    client.availability().delete_availability(window.id).await?;
    client.session().logout();
    Ok(())
}
