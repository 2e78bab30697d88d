use std::sync::Arc;

use tracing::debug;

use crate::marketplace::error::ServiceError;
use crate::marketplace::identity::{Caller, UserRole};
use crate::marketplace::properties::PropertyRepository;

use super::domain::{Lease, LeaseFilter, LeaseId, LeaseQuery};
use super::repository::LeaseRepository;

/// Read access to issued leases, scoped by role.
pub struct LeaseService<S> {
    store: Arc<S>,
}

impl<S> LeaseService<S>
where
    S: LeaseRepository + PropertyRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn list(&self, caller: &Caller, query: LeaseQuery) -> Result<Vec<Lease>, ServiceError> {
        let mut filter = LeaseFilter {
            property_id: query.property_id,
            ..LeaseFilter::default()
        };
        match caller.role {
            UserRole::Tenant => filter.tenant_cognito_id = Some(caller.user_id.clone()),
            UserRole::Manager => filter.manager_cognito_id = Some(caller.user_id.clone()),
            UserRole::Admin => {}
        }

        let leases = self.store.list_leases(&filter)?;
        debug!(count = leases.len(), role = caller.role.label(), "leases listed");
        Ok(leases)
    }

    pub fn get(&self, caller: &Caller, id: LeaseId) -> Result<Lease, ServiceError> {
        let lease = self
            .store
            .fetch_lease(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("lease {id} not found")))?;

        if caller.is_admin() || caller.is(&lease.tenant_cognito_id) {
            return Ok(lease);
        }
        let manages = self
            .store
            .fetch_property(lease.property_id)?
            .map_or(false, |listing| caller.is(&listing.property.manager_cognito_id));
        if manages {
            Ok(lease)
        } else {
            Err(ServiceError::Forbidden(format!(
                "lease {id} is not visible to this user"
            )))
        }
    }
}
