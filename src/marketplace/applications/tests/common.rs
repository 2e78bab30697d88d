use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::{body::Body, Extension, Router};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::LeasingConfig;
use crate::marketplace::applications::{
    application_router, ApplicationId, ApplicationRequest, ApplicationService, TransitionPolicy,
};
use crate::marketplace::error::RepositoryError;
use crate::marketplace::identity::{
    Caller, HeaderAuthVerifier, SharedAuthVerifier, UserRole, USER_ID_HEADER, USER_ROLE_HEADER,
};
use crate::marketplace::leases::{Lease, LeaseDraft, LeaseFilter, LeaseId, LeaseOutcome, LeaseRepository};
use crate::marketplace::profiles::{Manager, ProfileRepository, Tenant};
use crate::marketplace::properties::{
    AddressFields, NewLocation, NewProperty, PropertyId, PropertyRepository, PropertyType,
};
use crate::marketplace::gateways::Coordinates;
use crate::marketplace::store::InMemoryStore;

pub(super) const MANAGER: &str = "mgr-1";
pub(super) const OTHER_MANAGER: &str = "mgr-2";
pub(super) const TENANT: &str = "t1";

pub(super) type MemoryService = ApplicationService<InMemoryStore, InMemoryStore>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn manager() -> Caller {
    Caller::new(MANAGER, UserRole::Manager)
}

pub(super) fn other_manager() -> Caller {
    Caller::new(OTHER_MANAGER, UserRole::Manager)
}

pub(super) fn tenant() -> Caller {
    Caller::new(TENANT, UserRole::Tenant)
}

pub(super) fn admin() -> Caller {
    Caller::new("root", UserRole::Admin)
}

/// Store holding two managers, tenant `t1`, and one property of `mgr-1` priced `price`.
pub(super) fn seeded_store(price: u32) -> (Arc<InMemoryStore>, PropertyId) {
    let store = Arc::new(InMemoryStore::new());
    for id in [MANAGER, OTHER_MANAGER] {
        store
            .insert_manager(Manager {
                cognito_id: id.to_string(),
                name: format!("Manager {id}"),
                email: format!("{id}@lets.example"),
                phone_number: None,
            })
            .expect("manager seeded");
    }
    store
        .insert_tenant(Tenant {
            cognito_id: TENANT.to_string(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.ac.uk".to_string(),
            phone_number: Some("+44 1223 000000".to_string()),
            favorites: Vec::new(),
        })
        .expect("tenant seeded");

    let listing = store
        .insert_property(
            NewLocation {
                address: AddressFields {
                    address: "12 Mill Road".to_string(),
                    city: "Cambridge".to_string(),
                    state: String::new(),
                    country: "UK".to_string(),
                    postal_code: "CB1 2AB".to_string(),
                },
                coordinates: Coordinates {
                    latitude: 52.2,
                    longitude: 0.13,
                },
            },
            NewProperty {
                name: "Mill Road Flat".to_string(),
                description: "Two bed flat near the station".to_string(),
                price_per_month: price,
                security_deposit: price,
                application_fee: 50,
                photo_urls: Vec::new(),
                amenities: vec!["wifi".to_string()],
                highlights: Vec::new(),
                is_pets_allowed: false,
                is_parking_included: false,
                beds: 2,
                baths: 1.0,
                square_feet: 650,
                property_type: PropertyType::Apartment,
                posted_date: now(),
                manager_cognito_id: MANAGER.to_string(),
            },
        )
        .expect("property seeded");

    (store, listing.property.id)
}

pub(super) fn build_service_with(
    price: u32,
    config: LeasingConfig,
) -> (MemoryService, Arc<InMemoryStore>, PropertyId) {
    let (store, property_id) = seeded_store(price);
    let service = ApplicationService::new(store.clone(), store.clone(), &config);
    (service, store, property_id)
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryStore>, PropertyId) {
    build_service_with(1500, LeasingConfig::default())
}

pub(super) fn strict_config() -> LeasingConfig {
    LeasingConfig {
        transitions: TransitionPolicy::Strict,
        ..LeasingConfig::default()
    }
}

pub(super) fn request(property_id: PropertyId) -> ApplicationRequest {
    ApplicationRequest {
        property_id: Some(property_id),
        tenant_cognito_id: Some(TENANT.to_string()),
        message: Some("Looking for a September start".to_string()),
        ..ApplicationRequest::default()
    }
}

pub(super) fn submit_pending<L>(
    service: &ApplicationService<InMemoryStore, L>,
    property_id: PropertyId,
) -> ApplicationId
where
    L: LeaseRepository + 'static,
{
    service
        .submit(&tenant(), request(property_id), now())
        .expect("submission succeeds")
        .id
}

/// Lease table that is always offline.
#[derive(Debug, Default)]
pub(super) struct UnavailableLeases;

impl LeaseRepository for UnavailableLeases {
    fn ensure_active(
        &self,
        _draft: LeaseDraft,
        _now: DateTime<Utc>,
    ) -> Result<LeaseOutcome, RepositoryError> {
        Err(RepositoryError::Unavailable("lease table offline".to_string()))
    }

    fn active_lease(
        &self,
        _property_id: PropertyId,
        _tenant_cognito_id: &str,
        _now: DateTime<Utc>,
    ) -> Result<Option<Lease>, RepositoryError> {
        Ok(None)
    }

    fn fetch_lease(&self, _id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        Ok(None)
    }

    fn list_leases(&self, _filter: &LeaseFilter) -> Result<Vec<Lease>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) fn router_with_service<L>(service: ApplicationService<InMemoryStore, L>) -> Router
where
    L: LeaseRepository + 'static,
{
    let verifier: SharedAuthVerifier = Arc::new(HeaderAuthVerifier);
    application_router(Arc::new(service)).layer(Extension(verifier))
}

pub(super) fn authorized(
    method: &str,
    uri: &str,
    caller: Option<&Caller>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, caller.user_id.as_str())
            .header(USER_ROLE_HEADER, caller.role.label());
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value).expect("json body"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn assert_error(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], code, "{payload}");
}
