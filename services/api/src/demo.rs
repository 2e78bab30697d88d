use crate::infra::{InMemoryGeocoder, InMemoryObjectStorage};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;
use student_lets::config::{GeocodingConfig, LeasingConfig, StorageConfig, MAX_LEASE_TERM_DAYS};
use student_lets::error::AppError;
use student_lets::marketplace::applications::{ApplicationRequest, StatusUpdate, TransitionPolicy};
use student_lets::marketplace::gateways::PhotoUpload;
use student_lets::marketplace::profiles::NewProfile;
use student_lets::marketplace::properties::{PropertyDraft, PropertyType};
use student_lets::marketplace::{Caller, InMemoryStore, Marketplace, UserRole};

const DEMO_MANAGER: &str = "demo-manager";
const DEMO_TENANT: &str = "demo-tenant";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Monthly rent for the demo listing. Zero exercises the fallback lease rent.
    #[arg(long, default_value_t = 850)]
    pub(crate) rent: u32,
    /// Lease length in days, at most one hundred years (defaults to the configured term).
    #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_LEASE_TERM_DAYS))]
    pub(crate) term_days: Option<i64>,
    /// Refuse flipping a decided application to the opposite decision.
    #[arg(long)]
    pub(crate) strict: bool,
    /// After approving, try to deny the same application.
    #[arg(long)]
    pub(crate) deny_after_approval: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        rent,
        term_days,
        strict,
        deny_after_approval,
    } = args;

    let mut leasing = LeasingConfig::default();
    if let Some(days) = term_days {
        leasing.term_days = days;
    }
    if strict {
        leasing.transitions = TransitionPolicy::Strict;
    }

    let marketplace = Marketplace::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryObjectStorage::new(&StorageConfig {
            public_base_url: "memory://uploads".to_string(),
        })),
        Arc::new(InMemoryGeocoder::new(&GeocodingConfig { fallback: None })),
        &leasing,
    );
    let manager = Caller::new(DEMO_MANAGER, UserRole::Manager);
    let tenant = Caller::new(DEMO_TENANT, UserRole::Tenant);
    let now = Utc::now();

    println!("Student lets approval demo");
    println!(
        "Lease terms: {} days | fallback rent {} | {:?} transitions",
        leasing.term_days, leasing.fallback_rent, leasing.transitions
    );

    marketplace
        .profiles
        .create_manager(&manager, profile(DEMO_MANAGER, "Mill Road Lettings"))?;
    marketplace
        .profiles
        .create_tenant(&tenant, profile(DEMO_TENANT, "Ada Lovelace"))?;

    let listing = marketplace.properties.create(
        &manager,
        draft(rent),
        vec![PhotoUpload {
            file_name: "front.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }],
        now,
    )?;
    println!(
        "\nListed property {} '{}' at {:.4}, {:.4} for {}/month",
        listing.property.id,
        listing.property.name,
        listing.location.coordinates.latitude,
        listing.location.coordinates.longitude,
        listing.property.price_per_month
    );
    for url in &listing.property.photo_urls {
        println!("  photo: {url}");
    }

    let application = marketplace.applications.submit(
        &tenant,
        ApplicationRequest {
            property_id: Some(listing.property.id),
            tenant_cognito_id: Some(DEMO_TENANT.to_string()),
            message: Some("Second-year student looking for a September start".to_string()),
            ..ApplicationRequest::default()
        },
        now,
    )?;
    println!(
        "Application {} submitted by {} ({})",
        application.id, application.contact.name, application.status
    );

    let update = marketplace
        .applications
        .update_status(&manager, application.id, "approved")?;
    render_update("Approve", &update);

    let repeat = marketplace
        .applications
        .update_status(&manager, application.id, "APPROVED")?;
    render_update("Approve again", &repeat);
    if let (Some(first), Some(second)) = (&update.lease, &repeat.lease) {
        println!(
            "  Same lease reused: {}",
            if first.id == second.id { "yes" } else { "no" }
        );
    }

    if deny_after_approval {
        match marketplace
            .applications
            .update_status(&manager, application.id, "denied")
        {
            Ok(denied) => render_update("Deny", &denied),
            Err(err) => println!("\nDeny refused: {err}"),
        }
    }

    let residences = marketplace
        .profiles
        .current_residences(&tenant, DEMO_TENANT, Utc::now())?;
    println!("\nCurrent residences for {DEMO_TENANT}: {}", residences.len());
    for residence in residences {
        println!("  - {} ({})", residence.property.name, residence.location.address.one_line());
    }

    Ok(())
}

fn render_update(label: &str, update: &StatusUpdate) {
    let transition = update.transition;
    println!(
        "\n{label}: {} -> {}{}",
        transition.from,
        transition.to,
        if transition.changed { "" } else { " (unchanged)" }
    );
    match &update.lease {
        Some(lease) => println!(
            "  Lease {}: {} to {} | rent {} | deposit {}",
            lease.id,
            lease.start_date.format("%Y-%m-%d"),
            lease.end_date.format("%Y-%m-%d"),
            lease.rent,
            lease.deposit
        ),
        None => println!("  No lease attached"),
    }
}

fn profile(cognito_id: &str, name: &str) -> NewProfile {
    NewProfile {
        cognito_id: cognito_id.to_string(),
        name: name.to_string(),
        email: format!("{cognito_id}@lets.example"),
        phone_number: None,
    }
}

fn draft(rent: u32) -> PropertyDraft {
    PropertyDraft {
        name: "Mill Road House".to_string(),
        description: "Five-bed student house ten minutes from the station".to_string(),
        price_per_month: rent,
        security_deposit: 1200,
        application_fee: 50,
        amenities: vec!["WiFi".to_string(), "Washer".to_string()],
        highlights: vec!["Close to campus".to_string()],
        is_pets_allowed: false,
        is_parking_included: false,
        beds: 5,
        baths: 2.0,
        square_feet: 1400,
        property_type: PropertyType::Rooms,
        address: "12 Mill Road".to_string(),
        city: "Cambridge".to_string(),
        state: String::new(),
        country: "UK".to_string(),
        postal_code: "CB1 2AB".to_string(),
        manager_cognito_id: None,
    }
}
