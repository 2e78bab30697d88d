use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{LeasingConfig, MAX_LEASE_TERM_DAYS};
use crate::marketplace::properties::{Property, PropertyId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub u64);

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lease {
    pub id: LeaseId,
    pub property_id: PropertyId,
    pub tenant_cognito_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rent: u32,
    pub deposit: u32,
}

impl Lease {
    /// Both ends of the range are inclusive.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    pub fn belongs_to(&self, property_id: PropertyId, tenant_cognito_id: &str) -> bool {
        self.property_id == property_id && self.tenant_cognito_id == tenant_cognito_id
    }
}

/// Unsaved lease terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseDraft {
    pub property_id: PropertyId,
    pub tenant_cognito_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub rent: u32,
    pub deposit: u32,
}

/// The lease end date would fall outside the representable calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a {term_days}-day lease starting {start} ends outside the supported date range")]
pub struct LeaseTermError {
    pub start: DateTime<Utc>,
    pub term_days: i64,
}

/// Result of the atomic look-up-or-create performed on approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseOutcome {
    Existing(Lease),
    Created(Lease),
}

impl LeaseOutcome {
    pub fn lease(&self) -> &Lease {
        match self {
            LeaseOutcome::Existing(lease) | LeaseOutcome::Created(lease) => lease,
        }
    }

    pub fn into_lease(self) -> Lease {
        match self {
            LeaseOutcome::Existing(lease) | LeaseOutcome::Created(lease) => lease,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, LeaseOutcome::Created(_))
    }
}

/// Default terms for leases issued on approval: fixed term, deposit of one month's rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeasePolicy {
    term: Duration,
    fallback_rent: u32,
}

impl LeasePolicy {
    /// The term is clamped to `1..=MAX_LEASE_TERM_DAYS`.
    pub fn new(term_days: i64, fallback_rent: u32) -> Self {
        Self {
            term: Duration::days(term_days.clamp(1, MAX_LEASE_TERM_DAYS)),
            fallback_rent,
        }
    }

    pub fn term(&self) -> Duration {
        self.term
    }

    pub fn fallback_rent(&self) -> u32 {
        self.fallback_rent
    }

    /// Property price when set, otherwise the configured fallback.
    pub fn rent_for(&self, property: &Property) -> u32 {
        match property.price_per_month {
            0 => self.fallback_rent,
            price => price,
        }
    }

    pub fn draft_for(
        &self,
        property: &Property,
        tenant_cognito_id: &str,
        now: DateTime<Utc>,
    ) -> Result<LeaseDraft, LeaseTermError> {
        let end_date = now
            .checked_add_signed(self.term)
            .ok_or(LeaseTermError {
                start: now,
                term_days: self.term.num_days(),
            })?;
        let rent = self.rent_for(property);
        Ok(LeaseDraft {
            property_id: property.id,
            tenant_cognito_id: tenant_cognito_id.to_string(),
            start_date: now,
            end_date,
            rent,
            deposit: rent,
        })
    }
}

impl Default for LeasePolicy {
    fn default() -> Self {
        Self::from(&LeasingConfig::default())
    }
}

impl From<&LeasingConfig> for LeasePolicy {
    fn from(config: &LeasingConfig) -> Self {
        Self::new(config.term_days, config.fallback_rent)
    }
}

/// Query string of `GET /leases`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LeaseQuery {
    pub property_id: Option<PropertyId>,
}

/// Narrowing criteria for lease listings.
#[derive(Debug, Clone, Default)]
pub struct LeaseFilter {
    pub tenant_cognito_id: Option<String>,
    pub manager_cognito_id: Option<String>,
    pub property_id: Option<PropertyId>,
}
