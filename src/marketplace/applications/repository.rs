use chrono::{DateTime, Utc};

use crate::marketplace::error::RepositoryError;

use super::domain::{
    Application, ApplicationFilter, ApplicationId, ApplicationStatus, NewApplication,
    StatusTransition, TransitionPolicy,
};

/// Storage abstraction for applications. Applications are never deleted.
pub trait ApplicationRepository: Send + Sync {
    fn insert_application(&self, application: NewApplication)
        -> Result<Application, RepositoryError>;
    fn fetch_application(&self, id: ApplicationId)
        -> Result<Option<Application>, RepositoryError>;
    /// Sets the status and bumps `updated_at`. The edge from the stored status is checked
    /// against `policy` in the same transaction as the write; a refused edge is `Conflict`.
    /// Writing the current status again is allowed.
    fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        policy: TransitionPolicy,
        updated_at: DateTime<Utc>,
    ) -> Result<(Application, StatusTransition), RepositoryError>;
    /// `manager_cognito_id` filters through the referenced property's manager.
    fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError>;
}
