//! Student accommodation marketplace: profiles, listings, applications, and leases.
//!
//! Every sub-module follows the same layout: `domain` types, a synchronous `repository` trait,
//! a `service` holding the business rules, and an axum `router`. [`Marketplace`] wires the
//! services to one store and merges their routers.

pub mod applications;
pub mod error;
pub mod forms;
pub mod gateways;
pub mod identity;
pub mod leases;
pub mod profiles;
pub mod properties;
pub mod store;

use std::sync::Arc;

use axum::{Extension, Router};

use crate::config::LeasingConfig;

pub use applications::{ApplicationRepository, ApplicationService};
pub use error::{RepositoryError, ServiceError};
pub use gateways::{Geocoder, ObjectStorage};
pub use identity::{AuthVerifier, Caller, HeaderAuthVerifier, SharedAuthVerifier, UserRole};
pub use leases::{LeaseRepository, LeaseService};
pub use profiles::{ProfileRepository, ProfileService};
pub use properties::{PropertyRepository, PropertyService};
pub use store::InMemoryStore;

/// A store able to back every marketplace service.
pub trait MarketplaceStore:
    ProfileRepository + PropertyRepository + ApplicationRepository + LeaseRepository + 'static
{
}

impl<T> MarketplaceStore for T where
    T: ProfileRepository + PropertyRepository + ApplicationRepository + LeaseRepository + 'static
{
}

/// The composed marketplace services sharing one store.
pub struct Marketplace<S> {
    pub profiles: Arc<ProfileService<S>>,
    pub properties: Arc<PropertyService<S>>,
    pub applications: Arc<ApplicationService<S, S>>,
    pub leases: Arc<LeaseService<S>>,
}

impl<S> Clone for Marketplace<S> {
    fn clone(&self) -> Self {
        Self {
            profiles: self.profiles.clone(),
            properties: self.properties.clone(),
            applications: self.applications.clone(),
            leases: self.leases.clone(),
        }
    }
}

impl<S> Marketplace<S>
where
    S: MarketplaceStore,
{
    pub fn new(
        store: Arc<S>,
        storage: Arc<dyn ObjectStorage>,
        geocoder: Arc<dyn Geocoder>,
        leasing: &LeasingConfig,
    ) -> Self {
        Self {
            profiles: Arc::new(ProfileService::new(store.clone())),
            properties: Arc::new(PropertyService::new(store.clone(), storage, geocoder)),
            applications: Arc::new(ApplicationService::new(store.clone(), store.clone(), leasing)),
            leases: Arc::new(LeaseService::new(store)),
        }
    }

    /// All marketplace routes. Caller identity is resolved by `verifier` on every request.
    pub fn router(&self, verifier: SharedAuthVerifier) -> Router {
        Router::new()
            .merge(profiles::profile_router(self.profiles.clone()))
            .merge(properties::property_router(self.properties.clone()))
            .merge(applications::application_router(self.applications.clone()))
            .merge(leases::lease_router(self.leases.clone()))
            .layer(Extension(verifier))
    }
}
