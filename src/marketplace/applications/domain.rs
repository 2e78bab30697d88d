use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::forms::lenient_optional_string;
use crate::marketplace::leases::Lease;
use crate::marketplace::profiles::Tenant;
use crate::marketplace::properties::{PropertyId, PropertyListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a rental application. Serialized in canonical form (`"Approved"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status '{raw}' is not one of Pending, Approved, Denied")]
pub struct InvalidStatus {
    pub raw: String,
}

impl ApplicationStatus {
    /// Case-insensitive; no trimming or aliases.
    pub fn normalize(raw: &str) -> Result<Self, InvalidStatus> {
        match raw.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "denied" => Ok(Self::Denied),
            _ => Err(InvalidStatus {
                raw: raw.to_string(),
            }),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Denied => "Denied",
        }
    }

    /// The transition graph. `Permissive` accepts every edge; `Strict` refuses to flip a
    /// decided application straight to the opposite decision.
    pub fn transition_to(
        self,
        target: ApplicationStatus,
        policy: TransitionPolicy,
    ) -> Result<StatusTransition, TransitionRejected> {
        use ApplicationStatus::{Approved, Denied};

        if self == target {
            return Ok(StatusTransition::unchanged(self));
        }

        let allowed = match policy {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => {
                !matches!((self, target), (Denied, Approved) | (Approved, Denied))
            }
        };

        if allowed {
            Ok(StatusTransition {
                from: self,
                to: target,
                changed: true,
            })
        } else {
            Err(TransitionRejected {
                from: self,
                to: target,
            })
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which status edges are accepted once an application has been decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Permissive,
    Strict,
}

impl TransitionPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "permissive" => Some(Self::Permissive),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
    pub changed: bool,
}

impl StatusTransition {
    fn unchanged(status: ApplicationStatus) -> Self {
        Self {
            from: status,
            to: status,
            changed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("application cannot move from {from} to {to} under the strict transition policy")]
pub struct TransitionRejected {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Contact details captured at the time of application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSnapshot {
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub property_id: PropertyId,
    pub tenant_cognito_id: String,
    pub status: ApplicationStatus,
    pub application_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub contact: ContactSnapshot,
    pub message: Option<String>,
}

/// Unsaved application; the store assigns the identifier.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub property_id: PropertyId,
    pub tenant_cognito_id: String,
    pub contact: ContactSnapshot,
    pub message: Option<String>,
    pub application_date: DateTime<Utc>,
}

/// `POST /applications` body. Required fields are optional here so that missing values map
/// to a validation error with a useful message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApplicationRequest {
    pub property_id: Option<PropertyId>,
    pub tenant_cognito_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub phone_number: Option<String>,
    pub message: Option<String>,
}

/// `PUT /applications/{id}/status` body.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    pub status: String,
}

/// Query string of `GET /applications`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationQuery {
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub status: Option<String>,
    pub property_id: Option<PropertyId>,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
    pub tenant_cognito_id: Option<String>,
    pub manager_cognito_id: Option<String>,
    pub status: Option<ApplicationStatus>,
    pub property_id: Option<PropertyId>,
}

/// Application with its property, location, and tenant resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDetails {
    #[serde(flatten)]
    pub application: Application,
    pub property: PropertyListing,
    pub tenant: Option<Tenant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease: Option<Lease>,
}

/// Result of a status change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub application: ApplicationDetails,
    pub lease: Option<Lease>,
    pub transition: StatusTransition,
}
