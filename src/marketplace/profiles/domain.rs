use serde::{Deserialize, Serialize};

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::lenient_optional_string;
use crate::marketplace::properties::PropertyId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub cognito_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub favorites: Vec<PropertyId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub cognito_id: String,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

/// Registration payload shared by tenants and managers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewProfile {
    pub cognito_id: String,
    pub name: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub phone_number: Option<String>,
}

impl NewProfile {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.cognito_id.trim().is_empty() {
            return Err(ServiceError::Validation("cognitoId is required".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }
        validate_email(&self.email)
    }

    pub fn into_tenant(self) -> Tenant {
        Tenant {
            cognito_id: self.cognito_id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number,
            favorites: Vec::new(),
        }
    }

    pub fn into_manager(self) -> Manager {
        Manager {
            cognito_id: self.cognito_id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone_number: self.phone_number,
        }
    }
}

/// Partial contact update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub phone_number: Option<String>,
}

impl ContactPatch {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("name cannot be blank".to_string()));
            }
        }
        match &self.email {
            Some(email) => validate_email(email),
            None => Ok(()),
        }
    }

    fn apply(self, name: &mut String, email: &mut String, phone: &mut Option<String>) {
        if let Some(value) = self.name {
            *name = value.trim().to_string();
        }
        if let Some(value) = self.email {
            *email = value.trim().to_string();
        }
        if self.phone_number.is_some() {
            *phone = self.phone_number;
        }
    }
}

impl Tenant {
    pub fn apply(&mut self, patch: ContactPatch) {
        patch.apply(&mut self.name, &mut self.email, &mut self.phone_number);
    }
}

impl Manager {
    pub fn apply(&mut self, patch: ContactPatch) {
        patch.apply(&mut self.name, &mut self.email, &mut self.phone_number);
    }
}

fn validate_email(email: &str) -> Result<(), ServiceError> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ServiceError::Validation(format!(
            "email '{trimmed}' is not a valid address"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> NewProfile {
        NewProfile {
            cognito_id: "t1".to_string(),
            name: " Ada Lovelace ".to_string(),
            email: "ada@example.ac.uk".to_string(),
            phone_number: None,
        }
    }

    #[test]
    fn registration_requires_identity_and_valid_email() {
        assert!(registration().validate().is_ok());

        let mut missing_id = registration();
        missing_id.cognito_id = " ".to_string();
        assert!(missing_id.validate().is_err());

        let mut bad_email = registration();
        bad_email.email = "ada-at-example".to_string();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn contact_patch_only_touches_present_fields() {
        let mut tenant = registration().into_tenant();
        assert_eq!(tenant.name, "Ada Lovelace");

        tenant.apply(ContactPatch {
            phone_number: Some("+44 1223 000000".to_string()),
            ..ContactPatch::default()
        });
        assert_eq!(tenant.name, "Ada Lovelace");
        assert_eq!(tenant.phone_number.as_deref(), Some("+44 1223 000000"));
    }
}
