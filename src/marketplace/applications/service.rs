use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::config::LeasingConfig;
use crate::marketplace::error::{RepositoryError, ServiceError};
use crate::marketplace::identity::{Caller, UserRole};
use crate::marketplace::leases::{Lease, LeasePolicy, LeaseRepository};
use crate::marketplace::profiles::ProfileRepository;
use crate::marketplace::properties::{PropertyId, PropertyListing, PropertyRepository};

use super::domain::{
    Application, ApplicationDetails, ApplicationFilter, ApplicationId, ApplicationQuery,
    ApplicationRequest, ApplicationStatus, ContactSnapshot, NewApplication, StatusUpdate,
    TransitionPolicy,
};
use super::repository::ApplicationRepository;

/// Service owning application intake and the status workflow that issues leases.
pub struct ApplicationService<S, L> {
    store: Arc<S>,
    leases: Arc<L>,
    lease_policy: LeasePolicy,
    transitions: TransitionPolicy,
}

impl<S, L> ApplicationService<S, L>
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    pub fn new(store: Arc<S>, leases: Arc<L>, config: &LeasingConfig) -> Self {
        Self {
            store,
            leases,
            lease_policy: LeasePolicy::from(config),
            transitions: config.transitions,
        }
    }

    pub fn lease_policy(&self) -> &LeasePolicy {
        &self.lease_policy
    }

    /// Record a Pending application for a tenant. Missing contact fields are copied from the
    /// tenant profile.
    pub fn submit(
        &self,
        caller: &Caller,
        request: ApplicationRequest,
        now: DateTime<Utc>,
    ) -> Result<Application, ServiceError> {
        let property_id = request
            .property_id
            .ok_or_else(|| ServiceError::Validation("propertyId is required".to_string()))?;
        let tenant_id = request
            .tenant_cognito_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::Validation("tenantCognitoId is required".to_string()))?;

        if !caller.can_act_for(tenant_id) {
            return Err(ServiceError::Forbidden(
                "applications can only be submitted by the applying tenant".to_string(),
            ));
        }

        let tenant = self
            .store
            .fetch_tenant(tenant_id)?
            .ok_or_else(|| ServiceError::NotFound(format!("tenant {tenant_id} not found")))?;
        self.load_property(property_id)?;

        let contact = ContactSnapshot {
            name: non_blank(request.name).unwrap_or_else(|| tenant.name.clone()),
            email: non_blank(request.email).unwrap_or_else(|| tenant.email.clone()),
            phone_number: non_blank(request.phone_number).or_else(|| tenant.phone_number.clone()),
        };

        let application = self.store.insert_application(NewApplication {
            property_id,
            tenant_cognito_id: tenant.cognito_id,
            contact,
            message: non_blank(request.message),
            application_date: now,
        })?;

        info!(
            application_id = %application.id,
            property_id = %application.property_id,
            tenant = %application.tenant_cognito_id,
            "application submitted"
        );
        Ok(application)
    }

    /// Applications visible to the caller, each with its currently active lease.
    pub fn list(
        &self,
        caller: &Caller,
        query: ApplicationQuery,
        now: DateTime<Utc>,
    ) -> Result<Vec<ApplicationDetails>, ServiceError> {
        let status = query
            .status
            .as_deref()
            .map(ApplicationStatus::normalize)
            .transpose()
            .map_err(|err| ServiceError::Validation(err.to_string()))?;

        let mut filter = ApplicationFilter {
            status,
            property_id: query.property_id,
            ..ApplicationFilter::default()
        };

        match caller.role {
            UserRole::Admin => {
                if let Some(user_id) = query.user_id {
                    let user_type = query.user_type.as_deref().and_then(UserRole::parse);
                    match user_type {
                        Some(UserRole::Tenant) => filter.tenant_cognito_id = Some(user_id),
                        Some(UserRole::Manager) => filter.manager_cognito_id = Some(user_id),
                        _ => {
                            return Err(ServiceError::Validation(
                                "userType must be tenant or manager when userId is given"
                                    .to_string(),
                            ))
                        }
                    }
                }
            }
            role => {
                if let Some(user_id) = query.user_id.as_deref() {
                    if !caller.is(user_id) {
                        return Err(ServiceError::Forbidden(
                            "cannot list applications of another user".to_string(),
                        ));
                    }
                }
                if role == UserRole::Tenant {
                    filter.tenant_cognito_id = Some(caller.user_id.clone());
                } else {
                    filter.manager_cognito_id = Some(caller.user_id.clone());
                }
            }
        }

        let applications = self.store.list_applications(&filter)?;
        debug!(count = applications.len(), role = caller.role.label(), "applications listed");

        applications
            .into_iter()
            .map(|application| {
                let property = self.load_property(application.property_id)?;
                let lease = self.leases.active_lease(
                    application.property_id,
                    &application.tenant_cognito_id,
                    now,
                )?;
                self.details(application, property, lease)
            })
            .collect()
    }

    /// One application, visible to the applicant, the owning manager, or an admin.
    pub fn get(
        &self,
        caller: &Caller,
        id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<ApplicationDetails, ServiceError> {
        let application = self.load_application(id)?;
        let property = self.load_property(application.property_id)?;

        if !caller.is(&application.tenant_cognito_id)
            && !caller.can_manage(&property.property.manager_cognito_id)
        {
            return Err(ServiceError::Forbidden(format!(
                "application {id} is not visible to this user"
            )));
        }

        let lease =
            self.leases
                .active_lease(application.property_id, &application.tenant_cognito_id, now)?;
        self.details(application, property, lease)
    }

    pub fn update_status(
        &self,
        caller: &Caller,
        id: ApplicationId,
        raw_status: &str,
    ) -> Result<StatusUpdate, ServiceError> {
        self.update_status_at(caller, id, raw_status, Utc::now())
    }

    /// Move an application to a new status. Approval makes sure exactly one lease is active
    /// for the (property, tenant) pair; a failure while issuing the lease is logged and the
    /// status change still stands.
    pub fn update_status_at(
        &self,
        caller: &Caller,
        id: ApplicationId,
        raw_status: &str,
        now: DateTime<Utc>,
    ) -> Result<StatusUpdate, ServiceError> {
        let target = ApplicationStatus::normalize(raw_status)
            .map_err(|err| ServiceError::Validation(err.to_string()))?;

        let current = self.load_application(id)?;
        let property = self.load_property(current.property_id)?;

        if !caller.can_manage(&property.property.manager_cognito_id) {
            return Err(ServiceError::Forbidden(format!(
                "only the manager of property {} can decide application {id}",
                property.property.id
            )));
        }

        let (application, transition) = self
            .store
            .update_application_status(id, target, self.transitions, now)
            .map_err(|err| match err {
                RepositoryError::Conflict(reason) => ServiceError::Conflict(reason),
                other => ServiceError::Repository(other),
            })?;
        info!(
            application_id = %id,
            from = %transition.from,
            to = %transition.to,
            changed = transition.changed,
            "application status updated"
        );

        let lease = if target == ApplicationStatus::Approved {
            self.issue_lease(&application, &property, now)
        } else {
            None
        };

        let details = self.details(application, property, lease.clone())?;
        Ok(StatusUpdate {
            application: details,
            lease,
            transition,
        })
    }

    /// Lease failures never undo an approval; they are logged and the caller gets no lease.
    fn issue_lease(
        &self,
        application: &Application,
        property: &PropertyListing,
        now: DateTime<Utc>,
    ) -> Option<Lease> {
        let draft = match self.lease_policy.draft_for(
            &property.property,
            &application.tenant_cognito_id,
            now,
        ) {
            Ok(draft) => draft,
            Err(err) => {
                error!(
                    application_id = %application.id,
                    property_id = %application.property_id,
                    error = %err,
                    "lease term cannot be drafted for approved application"
                );
                return None;
            }
        };

        match self.leases.ensure_active(draft, now) {
            Ok(outcome) => {
                info!(
                    application_id = %application.id,
                    lease_id = %outcome.lease().id,
                    created = outcome.was_created(),
                    "lease ensured for approved application"
                );
                Some(outcome.into_lease())
            }
            Err(err) => {
                error!(
                    application_id = %application.id,
                    property_id = %application.property_id,
                    error = %err,
                    "failed to issue lease for approved application"
                );
                None
            }
        }
    }

    fn load_application(&self, id: ApplicationId) -> Result<Application, ServiceError> {
        self.store
            .fetch_application(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("application {id} not found")))
    }

    fn load_property(&self, id: PropertyId) -> Result<PropertyListing, ServiceError> {
        self.store
            .fetch_property(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("property {id} not found")))
    }

    fn details(
        &self,
        application: Application,
        property: PropertyListing,
        lease: Option<Lease>,
    ) -> Result<ApplicationDetails, ServiceError> {
        let tenant = self.store.fetch_tenant(&application.tenant_cognito_id)?;
        Ok(ApplicationDetails {
            application,
            property,
            tenant,
            lease,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}
