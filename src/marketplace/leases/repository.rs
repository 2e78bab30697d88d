use chrono::{DateTime, Utc};

use crate::marketplace::error::RepositoryError;
use crate::marketplace::properties::PropertyId;

use super::domain::{Lease, LeaseDraft, LeaseFilter, LeaseId, LeaseOutcome};

/// Storage abstraction for leases.
pub trait LeaseRepository: Send + Sync {
    /// Returns the lease for the draft's (property, tenant) pair that is active at `now`, or
    /// failing that one whose range overlaps the draft's, as `Existing`. Otherwise inserts the
    /// draft. Look-up and insert must happen as one atomic unit so concurrent approvals cannot
    /// both insert, whatever order their `now` values arrive in.
    fn ensure_active(
        &self,
        draft: LeaseDraft,
        now: DateTime<Utc>,
    ) -> Result<LeaseOutcome, RepositoryError>;
    fn active_lease(
        &self,
        property_id: PropertyId,
        tenant_cognito_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Lease>, RepositoryError>;
    fn fetch_lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError>;
    fn list_leases(&self, filter: &LeaseFilter) -> Result<Vec<Lease>, RepositoryError>;
}
