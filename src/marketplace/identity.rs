//! Caller identity resolution.
//!
//! Token verification happens upstream. The service only consumes the verified subject and
//! role through an [`AuthVerifier`], which keeps the provider swappable and the routes testable.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use super::error::ServiceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Tenant,
    Manager,
    Admin,
}

impl UserRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tenant" => Some(Self::Tenant),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Tenant => "tenant",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }
}

/// Authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: UserRole,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Admins manage everything; anyone else only what is registered under their identity.
    pub fn can_manage(&self, manager_cognito_id: &str) -> bool {
        self.is_admin() || self.is(manager_cognito_id)
    }

    /// Same rule for profile-scoped resources.
    pub fn can_act_for(&self, cognito_id: &str) -> bool {
        self.is_admin() || self.is(cognito_id)
    }
}

/// Resolves a request's headers to a verified identity, or `None` when unauthenticated.
pub trait AuthVerifier: Send + Sync {
    fn verify(&self, headers: &HeaderMap) -> Option<Caller>;
}

pub type SharedAuthVerifier = Arc<dyn AuthVerifier>;

/// Trusts identity headers injected by an authenticating gateway in front of the service.
#[derive(Debug, Clone, Default)]
pub struct HeaderAuthVerifier;

impl AuthVerifier for HeaderAuthVerifier {
    fn verify(&self, headers: &HeaderMap) -> Option<Caller> {
        let user_id = headers
            .get(USER_ID_HEADER)?
            .to_str()
            .ok()
            .map(str::trim)
            .filter(|value| !value.is_empty())?;
        let role = headers
            .get(USER_ROLE_HEADER)?
            .to_str()
            .ok()
            .and_then(UserRole::parse)?;

        Some(Caller::new(user_id, role))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let verifier = parts
            .extensions
            .get::<SharedAuthVerifier>()
            .cloned()
            .ok_or_else(|| ServiceError::Internal("auth verifier not configured".to_string()))?;

        verifier
            .verify(&parts.headers)
            .ok_or(ServiceError::Unauthenticated)
    }
}
