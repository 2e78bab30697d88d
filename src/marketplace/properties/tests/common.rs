use std::sync::{Arc, Mutex};

use axum::http::{header, Request};
use axum::response::Response;
use axum::{body::Body, Extension, Router};
use serde_json::Value;

use crate::marketplace::gateways::{
    Coordinates, GeocodeError, Geocoder, ObjectStorage, PhotoUpload, StorageError,
};
use crate::marketplace::identity::{
    Caller, HeaderAuthVerifier, SharedAuthVerifier, UserRole, USER_ID_HEADER, USER_ROLE_HEADER,
};
use crate::marketplace::profiles::{Manager, ProfileRepository};
use crate::marketplace::properties::{property_router, PropertyDraft, PropertyService, PropertyType};
use crate::marketplace::store::InMemoryStore;

pub(super) const MANAGER: &str = "mgr-1";

pub(super) fn manager() -> Caller {
    Caller::new(MANAGER, UserRole::Manager)
}

pub(super) fn other_manager() -> Caller {
    Caller::new("mgr-2", UserRole::Manager)
}

pub(super) fn admin() -> Caller {
    Caller::new("root", UserRole::Admin)
}

/// Storage that keeps URLs only; `fail_on` makes the n-th upload fail.
#[derive(Debug, Default)]
pub(super) struct MemoryStorage {
    pub(super) fail_on: Option<usize>,
    attempts: Mutex<usize>,
    stored: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub(super) fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Self::default()
        }
    }

    pub(super) fn stored(&self) -> Vec<String> {
        self.stored.lock().expect("storage mutex poisoned").clone()
    }
}

impl ObjectStorage for MemoryStorage {
    fn upload(
        &self,
        _bytes: &[u8],
        file_name: &str,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let mut attempts = self.attempts.lock().expect("storage mutex poisoned");
        *attempts += 1;
        if Some(*attempts) == self.fail_on {
            return Err(StorageError::Upload {
                file_name: file_name.to_string(),
                reason: "bucket unavailable".to_string(),
            });
        }
        let url = format!("https://cdn.lets.example/{}-{file_name}", *attempts);
        self.stored
            .lock()
            .expect("storage mutex poisoned")
            .push(url.clone());
        Ok(url)
    }

    fn delete(&self, url: &str) -> Result<(), StorageError> {
        self.stored
            .lock()
            .expect("storage mutex poisoned")
            .retain(|stored| stored != url);
        Ok(())
    }
}

/// Resolves every address except ones mentioning "Nowhere".
#[derive(Debug, Default)]
pub(super) struct FixedGeocoder {
    lookups: Mutex<Vec<String>>,
}

impl FixedGeocoder {
    pub(super) fn lookups(&self) -> Vec<String> {
        self.lookups.lock().expect("geocoder mutex poisoned").clone()
    }
}

impl Geocoder for FixedGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        self.lookups
            .lock()
            .expect("geocoder mutex poisoned")
            .push(address.to_string());
        if address.contains("Nowhere") {
            return Err(GeocodeError::Unresolvable(address.to_string()));
        }
        Ok(Coordinates {
            latitude: 52.2,
            longitude: 0.13,
        })
    }
}

pub(super) struct Harness {
    pub(super) service: PropertyService<InMemoryStore>,
    pub(super) store: Arc<InMemoryStore>,
    pub(super) storage: Arc<MemoryStorage>,
    pub(super) geocoder: Arc<FixedGeocoder>,
}

pub(super) fn harness_with(storage: MemoryStorage) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    for id in [MANAGER, "mgr-2"] {
        store
            .insert_manager(Manager {
                cognito_id: id.to_string(),
                name: format!("Manager {id}"),
                email: format!("{id}@lets.example"),
                phone_number: None,
            })
            .expect("manager seeded");
    }
    let storage = Arc::new(storage);
    let geocoder = Arc::new(FixedGeocoder::default());
    let service = PropertyService::new(store.clone(), storage.clone(), geocoder.clone());
    Harness {
        service,
        store,
        storage,
        geocoder,
    }
}

pub(super) fn harness() -> Harness {
    harness_with(MemoryStorage::default())
}

pub(super) fn draft() -> PropertyDraft {
    PropertyDraft {
        name: "Mill Road Flat".to_string(),
        description: "Two bed flat near the station".to_string(),
        price_per_month: 1500,
        security_deposit: 1500,
        application_fee: 50,
        amenities: vec!["wifi".to_string(), "laundry".to_string()],
        highlights: Vec::new(),
        is_pets_allowed: false,
        is_parking_included: true,
        beds: 2,
        baths: 1.0,
        square_feet: 650,
        property_type: PropertyType::Apartment,
        address: "12 Mill Road".to_string(),
        city: "Cambridge".to_string(),
        state: String::new(),
        country: "UK".to_string(),
        postal_code: "CB1 2AB".to_string(),
        manager_cognito_id: None,
    }
}

pub(super) fn photo(name: &str) -> PhotoUpload {
    PhotoUpload {
        file_name: name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![0xFF, 0xD8, 0xFF],
    }
}

pub(super) fn router_with(harness: Harness) -> Router {
    let verifier: SharedAuthVerifier = Arc::new(HeaderAuthVerifier);
    property_router(Arc::new(harness.service)).layer(Extension(verifier))
}

pub(super) fn request(
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
