use crate::marketplace::error::RepositoryError;
use crate::marketplace::properties::PropertyId;

use super::domain::{ContactPatch, Manager, Tenant};

/// Storage abstraction for user profiles. Updates are applied to the stored row, so concurrent
/// edits of different fields never overwrite each other. A missing profile is `NotFound`.
pub trait ProfileRepository: Send + Sync {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError>;
    fn fetch_tenant(&self, cognito_id: &str) -> Result<Option<Tenant>, RepositoryError>;
    fn update_tenant_contact(
        &self,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Tenant, RepositoryError>;
    /// Appends the property unless it is already a favorite.
    fn add_favorite(
        &self,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, RepositoryError>;
    fn remove_favorite(
        &self,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, RepositoryError>;
    fn insert_manager(&self, manager: Manager) -> Result<Manager, RepositoryError>;
    fn fetch_manager(&self, cognito_id: &str) -> Result<Option<Manager>, RepositoryError>;
    fn update_manager_contact(
        &self,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Manager, RepositoryError>;
}
