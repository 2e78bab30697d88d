use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::{
    lenient_optional_string, lenient_string, optional_string_list, split_list, string_list,
};
use crate::marketplace::gateways::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    Rooms,
    Tinyhouse,
    Apartment,
    Villa,
    Townhouse,
    Cottage,
}

impl PropertyType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rooms" => Some(Self::Rooms),
            "tinyhouse" => Some(Self::Tinyhouse),
            "apartment" => Some(Self::Apartment),
            "villa" => Some(Self::Villa),
            "townhouse" => Some(Self::Townhouse),
            "cottage" => Some(Self::Cottage),
            _ => None,
        }
    }
}

/// Normalized postal address of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub country: String,
    #[serde(deserialize_with = "lenient_string")]
    pub postal_code: String,
}

impl AddressFields {
    pub fn validate(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            ("address", &self.address),
            ("city", &self.city),
            ("country", &self.country),
            ("postalCode", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(ServiceError::Validation(format!("{field} is required")));
            }
        }
        Ok(())
    }

    /// Single-line form handed to the geocoder.
    pub fn one_line(&self) -> String {
        [
            self.address.as_str(),
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
            self.country.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: LocationId,
    #[serde(flatten)]
    pub address: AddressFields,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub description: String,
    pub price_per_month: u32,
    pub security_deposit: u32,
    pub application_fee: u32,
    pub photo_urls: Vec<String>,
    pub amenities: Vec<String>,
    pub highlights: Vec<String>,
    pub is_pets_allowed: bool,
    pub is_parking_included: bool,
    pub beds: u8,
    pub baths: f32,
    pub square_feet: u32,
    pub property_type: PropertyType,
    pub posted_date: DateTime<Utc>,
    pub location_id: LocationId,
    pub manager_cognito_id: String,
}

/// Property read model with its location embedded, as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyListing {
    #[serde(flatten)]
    pub property: Property,
    pub location: Location,
}

/// Listing attributes supplied on creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyDraft {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    pub price_per_month: u32,
    #[serde(default)]
    pub security_deposit: u32,
    #[serde(default)]
    pub application_fee: u32,
    #[serde(default, deserialize_with = "string_list")]
    pub amenities: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub is_pets_allowed: bool,
    #[serde(default)]
    pub is_parking_included: bool,
    pub beds: u8,
    pub baths: f32,
    #[serde(default)]
    pub square_feet: u32,
    pub property_type: PropertyType,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(deserialize_with = "lenient_string")]
    pub country: String,
    #[serde(deserialize_with = "lenient_string")]
    pub postal_code: String,
    #[serde(default)]
    pub manager_cognito_id: Option<String>,
}

impl PropertyDraft {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("name is required".to_string()));
        }
        validate_baths(self.baths)?;
        self.address_fields().validate()
    }

    pub fn address_fields(&self) -> AddressFields {
        AddressFields {
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            country: self.country.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
        }
    }
}

/// Unsaved property produced by the service; the store assigns identifiers.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub name: String,
    pub description: String,
    pub price_per_month: u32,
    pub security_deposit: u32,
    pub application_fee: u32,
    pub photo_urls: Vec<String>,
    pub amenities: Vec<String>,
    pub highlights: Vec<String>,
    pub is_pets_allowed: bool,
    pub is_parking_included: bool,
    pub beds: u8,
    pub baths: f32,
    pub square_feet: u32,
    pub property_type: PropertyType,
    pub posted_date: DateTime<Utc>,
    pub manager_cognito_id: String,
}

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub address: AddressFields,
    pub coordinates: Coordinates,
}

/// Partial update. Address fields, when any is present, are merged with the stored address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyPatch {
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub description: Option<String>,
    pub price_per_month: Option<u32>,
    pub security_deposit: Option<u32>,
    pub application_fee: Option<u32>,
    #[serde(default, deserialize_with = "optional_string_list")]
    pub amenities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "optional_string_list")]
    pub highlights: Option<Vec<String>>,
    pub is_pets_allowed: Option<bool>,
    pub is_parking_included: Option<bool>,
    pub beds: Option<u8>,
    pub baths: Option<f32>,
    pub square_feet: Option<u32>,
    pub property_type: Option<PropertyType>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_optional_string")]
    pub postal_code: Option<String>,
    /// Replace the stored photo set instead of appending to it.
    #[serde(default)]
    pub replace_photos: bool,
}

impl PropertyPatch {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ServiceError::Validation("name cannot be blank".to_string()));
            }
        }
        if let Some(baths) = self.baths {
            validate_baths(baths)?;
        }
        Ok(())
    }

    pub fn touches_address(&self) -> bool {
        self.address.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.country.is_some()
            || self.postal_code.is_some()
    }

    /// Address after applying the patch, or `None` when unchanged.
    pub fn merged_address(&self, current: &AddressFields) -> Option<AddressFields> {
        if !self.touches_address() {
            return None;
        }
        let pick = |patched: &Option<String>, stored: &String| {
            patched.clone().unwrap_or_else(|| stored.clone())
        };
        let merged = AddressFields {
            address: pick(&self.address, &current.address),
            city: pick(&self.city, &current.city),
            state: pick(&self.state, &current.state),
            country: pick(&self.country, &current.country),
            postal_code: pick(&self.postal_code, &current.postal_code),
        };
        (merged != *current).then_some(merged)
    }

    /// Applies the scalar fields; photos and address are handled by the service.
    pub fn apply_to(&self, property: &mut Property) {
        if let Some(value) = &self.name {
            property.name = value.trim().to_string();
        }
        if let Some(value) = &self.description {
            property.description = value.clone();
        }
        if let Some(value) = self.price_per_month {
            property.price_per_month = value;
        }
        if let Some(value) = self.security_deposit {
            property.security_deposit = value;
        }
        if let Some(value) = self.application_fee {
            property.application_fee = value;
        }
        if let Some(value) = &self.amenities {
            property.amenities = value.clone();
        }
        if let Some(value) = &self.highlights {
            property.highlights = value.clone();
        }
        if let Some(value) = self.is_pets_allowed {
            property.is_pets_allowed = value;
        }
        if let Some(value) = self.is_parking_included {
            property.is_parking_included = value;
        }
        if let Some(value) = self.beds {
            property.beds = value;
        }
        if let Some(value) = self.baths {
            property.baths = value;
        }
        if let Some(value) = self.square_feet {
            property.square_feet = value;
        }
        if let Some(value) = self.property_type {
            property.property_type = value;
        }
    }
}

fn validate_baths(baths: f32) -> Result<(), ServiceError> {
    if baths.is_finite() && baths >= 0.0 {
        Ok(())
    } else {
        Err(ServiceError::Validation(
            "baths must be a non-negative number".to_string(),
        ))
    }
}

/// Search criteria for public listing queries.
#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub manager_cognito_id: Option<String>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub beds: Option<u8>,
    pub baths: Option<f32>,
    pub property_type: Option<PropertyType>,
    pub amenities: Vec<String>,
    pub pets_allowed: Option<bool>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let manager_ok = self
            .manager_cognito_id
            .as_deref()
            .map_or(true, |manager| property.manager_cognito_id == manager);
        let price_ok = self
            .price_min
            .map_or(true, |min| property.price_per_month >= min)
            && self
                .price_max
                .map_or(true, |max| property.price_per_month <= max);
        let rooms_ok = self.beds.map_or(true, |beds| property.beds >= beds)
            && self.baths.map_or(true, |baths| property.baths >= baths);
        let type_ok = self
            .property_type
            .map_or(true, |kind| property.property_type == kind);
        let amenities_ok = self.amenities.iter().all(|wanted| {
            property
                .amenities
                .iter()
                .any(|amenity| amenity.eq_ignore_ascii_case(wanted))
        });
        let pets_ok = self
            .pets_allowed
            .map_or(true, |pets| property.is_pets_allowed == pets);

        manager_ok && price_ok && rooms_ok && type_ok && amenities_ok && pets_ok
    }
}

/// Query string of `GET /properties`. `amenities` is comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyQuery {
    pub manager_cognito_id: Option<String>,
    pub price_min: Option<u32>,
    pub price_max: Option<u32>,
    pub beds: Option<u8>,
    pub baths: Option<f32>,
    pub property_type: Option<String>,
    pub amenities: Option<String>,
    pub pets_allowed: Option<bool>,
}

impl PropertyQuery {
    pub fn into_filter(self) -> Result<PropertyFilter, ServiceError> {
        let property_type = self
            .property_type
            .as_deref()
            .map(|raw| {
                PropertyType::parse(raw).ok_or_else(|| {
                    ServiceError::Validation(format!("unknown propertyType '{raw}'"))
                })
            })
            .transpose()?;
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(ServiceError::Validation(
                    "priceMin cannot exceed priceMax".to_string(),
                ));
            }
        }

        Ok(PropertyFilter {
            manager_cognito_id: self.manager_cognito_id,
            price_min: self.price_min,
            price_max: self.price_max,
            beds: self.beds,
            baths: self.baths,
            property_type,
            amenities: self.amenities.as_deref().map(split_list).unwrap_or_default(),
            pets_allowed: self.pets_allowed,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub property_id: PropertyId,
    pub name: String,
    pub description: String,
    pub price_per_month: u32,
    pub security_deposit: u32,
    pub capacity: u8,
    pub amenities: Vec<String>,
    pub photo_urls: Vec<String>,
    pub is_available: bool,
    pub available_from: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoomDraft {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    pub price_per_month: u32,
    #[serde(default)]
    pub security_deposit: u32,
    #[serde(default = "default_capacity")]
    pub capacity: u8,
    #[serde(default, deserialize_with = "string_list")]
    pub amenities: Vec<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
}

fn default_capacity() -> u8 {
    1
}

fn default_available() -> bool {
    true
}

impl RoomDraft {
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::Validation("room name is required".to_string()));
        }
        if self.capacity == 0 {
            return Err(ServiceError::Validation(
                "room capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_new_room(self, property_id: PropertyId, photo_urls: Vec<String>) -> NewRoom {
        NewRoom {
            property_id,
            name: self.name.trim().to_string(),
            description: self.description,
            price_per_month: self.price_per_month,
            security_deposit: self.security_deposit,
            capacity: self.capacity,
            amenities: self.amenities,
            photo_urls,
            is_available: self.is_available,
            available_from: self.available_from,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub property_id: PropertyId,
    pub name: String,
    pub description: String,
    pub price_per_month: u32,
    pub security_deposit: u32,
    pub capacity: u8,
    pub amenities: Vec<String>,
    pub photo_urls: Vec<String>,
    pub is_available: bool,
    pub available_from: Option<NaiveDate>,
}

/// Everything a cascading delete removed, so the caller can release stored objects.
#[derive(Debug, Clone)]
pub struct RemovedProperty {
    pub listing: PropertyListing,
    pub rooms: Vec<Room>,
}

impl RemovedProperty {
    pub fn photo_urls(&self) -> Vec<String> {
        self.listing
            .property
            .photo_urls
            .iter()
            .chain(self.rooms.iter().flat_map(|room| room.photo_urls.iter()))
            .cloned()
            .collect()
    }
}
