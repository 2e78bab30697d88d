use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::marketplace::error::{RepositoryError, ServiceError};
use crate::marketplace::identity::{Caller, UserRole};
use crate::marketplace::leases::{LeaseFilter, LeaseRepository};
use crate::marketplace::properties::{PropertyId, PropertyListing, PropertyRepository};

use super::domain::{ContactPatch, Manager, NewProfile, Tenant};
use super::repository::ProfileRepository;

/// Tenant and manager profiles, favorites, and current residences.
pub struct ProfileService<S> {
    store: Arc<S>,
}

impl<S> ProfileService<S>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_tenant(
        &self,
        caller: &Caller,
        profile: NewProfile,
    ) -> Result<Tenant, ServiceError> {
        authorize_registration(caller, &profile, UserRole::Tenant)?;
        profile.validate()?;
        let tenant = self.store.insert_tenant(profile.into_tenant())?;
        info!(tenant = %tenant.cognito_id, "tenant registered");
        Ok(tenant)
    }

    pub fn get_tenant(&self, caller: &Caller, cognito_id: &str) -> Result<Tenant, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        self.load_tenant(cognito_id)
    }

    pub fn update_tenant(
        &self,
        caller: &Caller,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Tenant, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        patch.validate()?;
        let tenant = self
            .store
            .update_tenant_contact(cognito_id, patch)
            .map_err(|err| not_found_as(err, "tenant", cognito_id))?;
        debug!(tenant = %cognito_id, "tenant contact updated");
        Ok(tenant)
    }

    pub fn create_manager(
        &self,
        caller: &Caller,
        profile: NewProfile,
    ) -> Result<Manager, ServiceError> {
        authorize_registration(caller, &profile, UserRole::Manager)?;
        profile.validate()?;
        let manager = self.store.insert_manager(profile.into_manager())?;
        info!(manager = %manager.cognito_id, "manager registered");
        Ok(manager)
    }

    pub fn get_manager(&self, caller: &Caller, cognito_id: &str) -> Result<Manager, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        self.load_manager(cognito_id)
    }

    pub fn update_manager(
        &self,
        caller: &Caller,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Manager, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        patch.validate()?;
        let manager = self
            .store
            .update_manager_contact(cognito_id, patch)
            .map_err(|err| not_found_as(err, "manager", cognito_id))?;
        debug!(manager = %cognito_id, "manager contact updated");
        Ok(manager)
    }

    /// Adding a favorite twice is a no-op.
    pub fn add_favorite(
        &self,
        caller: &Caller,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        self.load_tenant(cognito_id)?;
        if self.store.fetch_property(property_id)?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "property {property_id} not found"
            )));
        }

        self.store
            .add_favorite(cognito_id, property_id)
            .map_err(|err| not_found_as(err, "tenant", cognito_id))
    }

    pub fn remove_favorite(
        &self,
        caller: &Caller,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        self.store
            .remove_favorite(cognito_id, property_id)
            .map_err(|err| not_found_as(err, "tenant", cognito_id))
    }

    /// Properties where the tenant holds a lease that is active at `now`.
    pub fn current_residences(
        &self,
        caller: &Caller,
        cognito_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<PropertyListing>, ServiceError> {
        authorize_profile(caller, cognito_id)?;
        self.load_tenant(cognito_id)?;

        let leases = self.store.list_leases(&LeaseFilter {
            tenant_cognito_id: Some(cognito_id.to_string()),
            ..LeaseFilter::default()
        })?;
        let property_ids: BTreeSet<PropertyId> = leases
            .iter()
            .filter(|lease| lease.is_active_at(now))
            .map(|lease| lease.property_id)
            .collect();

        let mut residences = Vec::with_capacity(property_ids.len());
        for property_id in property_ids {
            if let Some(listing) = self.store.fetch_property(property_id)? {
                residences.push(listing);
            }
        }
        Ok(residences)
    }

    fn load_tenant(&self, cognito_id: &str) -> Result<Tenant, ServiceError> {
        self.store
            .fetch_tenant(cognito_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("tenant {cognito_id} not found")))
    }

    fn load_manager(&self, cognito_id: &str) -> Result<Manager, ServiceError> {
        self.store
            .fetch_manager(cognito_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("manager {cognito_id} not found")))
    }
}

fn authorize_profile(caller: &Caller, cognito_id: &str) -> Result<(), ServiceError> {
    if caller.can_act_for(cognito_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "profile {cognito_id} belongs to another user"
        )))
    }
}

fn not_found_as(err: RepositoryError, kind: &str, cognito_id: &str) -> ServiceError {
    match err {
        RepositoryError::NotFound => ServiceError::NotFound(format!("{kind} {cognito_id} not found")),
        other => ServiceError::Repository(other),
    }
}

/// Users register themselves under their own identity and role; admins may register anyone.
fn authorize_registration(
    caller: &Caller,
    profile: &NewProfile,
    role: UserRole,
) -> Result<(), ServiceError> {
    if caller.is_admin() || (caller.role == role && caller.is(profile.cognito_id.trim())) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "only the {} themselves can register this profile",
            role.label()
        )))
    }
}
