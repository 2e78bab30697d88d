use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::marketplace::error::ServiceError;
use crate::marketplace::gateways::{self, Geocoder, ObjectStorage, PhotoUpload};
use crate::marketplace::identity::{Caller, UserRole};
use crate::marketplace::profiles::ProfileRepository;

use super::domain::{
    NewLocation, NewProperty, PropertyDraft, PropertyFilter, PropertyId, PropertyListing,
    PropertyPatch, RemovedProperty, Room, RoomDraft, RoomId,
};
use super::repository::PropertyRepository;

/// Property and room lifecycle, including geocoding and photo storage.
pub struct PropertyService<S> {
    store: Arc<S>,
    storage: Arc<dyn ObjectStorage>,
    geocoder: Arc<dyn Geocoder>,
}

impl<S> PropertyService<S>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    pub fn new(store: Arc<S>, storage: Arc<dyn ObjectStorage>, geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            store,
            storage,
            geocoder,
        }
    }

    /// Geocode, upload photos, then persist the location and the property. Uploaded objects
    /// are deleted again when the insert fails.
    pub fn create(
        &self,
        caller: &Caller,
        draft: PropertyDraft,
        photos: Vec<PhotoUpload>,
        now: DateTime<Utc>,
    ) -> Result<PropertyListing, ServiceError> {
        let manager_id = owning_manager(caller, draft.manager_cognito_id.as_deref())?;
        draft.validate()?;
        gateways::validate_photos(&photos)?;

        if self.store.fetch_manager(&manager_id)?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "manager {manager_id} not found"
            )));
        }

        let address = draft.address_fields();
        let coordinates = self.geocoder.geocode(&address.one_line())?;
        let photo_urls = gateways::upload_all(self.storage.as_ref(), &photos)?;

        let property = NewProperty {
            name: draft.name.trim().to_string(),
            description: draft.description,
            price_per_month: draft.price_per_month,
            security_deposit: draft.security_deposit,
            application_fee: draft.application_fee,
            photo_urls: photo_urls.clone(),
            amenities: draft.amenities,
            highlights: draft.highlights,
            is_pets_allowed: draft.is_pets_allowed,
            is_parking_included: draft.is_parking_included,
            beds: draft.beds,
            baths: draft.baths,
            square_feet: draft.square_feet,
            property_type: draft.property_type,
            posted_date: now,
            manager_cognito_id: manager_id,
        };

        let listing = match self.store.insert_property(
            NewLocation {
                address,
                coordinates,
            },
            property,
        ) {
            Ok(listing) => listing,
            Err(err) => {
                gateways::discard(self.storage.as_ref(), &photo_urls);
                return Err(err.into());
            }
        };

        info!(
            property_id = %listing.property.id,
            manager = %listing.property.manager_cognito_id,
            photos = listing.property.photo_urls.len(),
            "property created"
        );
        Ok(listing)
    }

    pub fn list(&self, filter: &PropertyFilter) -> Result<Vec<PropertyListing>, ServiceError> {
        let listings = self.store.list_properties(filter)?;
        debug!(count = listings.len(), "properties listed");
        Ok(listings)
    }

    pub fn get(&self, id: PropertyId) -> Result<PropertyListing, ServiceError> {
        self.store
            .fetch_property(id)?
            .ok_or_else(|| ServiceError::NotFound(format!("property {id} not found")))
    }

    /// Partial update. A changed address is re-geocoded; new photos are appended unless the
    /// patch asks to replace the stored set.
    pub fn update(
        &self,
        caller: &Caller,
        id: PropertyId,
        patch: PropertyPatch,
        photos: Vec<PhotoUpload>,
    ) -> Result<PropertyListing, ServiceError> {
        let mut listing = self.get(id)?;
        self.authorize(caller, &listing)?;
        patch.validate()?;
        gateways::validate_photos(&photos)?;

        if let Some(address) = patch.merged_address(&listing.location.address) {
            address.validate()?;
            listing.location.coordinates = self.geocoder.geocode(&address.one_line())?;
            listing.location.address = address;
        }

        patch.apply_to(&mut listing.property);

        let uploaded = gateways::upload_all(self.storage.as_ref(), &photos)?;
        let replaced = if patch.replace_photos {
            std::mem::replace(&mut listing.property.photo_urls, uploaded.clone())
        } else {
            listing.property.photo_urls.extend(uploaded.iter().cloned());
            Vec::new()
        };

        if let Err(err) = self.store.update_property(listing.clone()) {
            gateways::discard(self.storage.as_ref(), &uploaded);
            return Err(err.into());
        }
        gateways::discard(self.storage.as_ref(), &replaced);

        info!(
            property_id = %id,
            added_photos = uploaded.len(),
            removed_photos = replaced.len(),
            "property updated"
        );
        Ok(listing)
    }

    /// Removes the property with its rooms and location, then releases their photos.
    pub fn delete(&self, caller: &Caller, id: PropertyId) -> Result<PropertyListing, ServiceError> {
        let listing = self.get(id)?;
        self.authorize(caller, &listing)?;

        let removed: RemovedProperty = self.store.delete_property(id)?;
        let photo_urls = removed.photo_urls();
        gateways::discard(self.storage.as_ref(), &photo_urls);

        info!(
            property_id = %id,
            rooms = removed.rooms.len(),
            photos = photo_urls.len(),
            "property deleted"
        );
        Ok(removed.listing)
    }

    pub fn add_room(
        &self,
        caller: &Caller,
        property_id: PropertyId,
        draft: RoomDraft,
        photos: Vec<PhotoUpload>,
    ) -> Result<Room, ServiceError> {
        let listing = self.get(property_id)?;
        self.authorize(caller, &listing)?;
        draft.validate()?;

        let photo_urls = gateways::upload_all(self.storage.as_ref(), &photos)?;
        let room = match self
            .store
            .insert_room(draft.into_new_room(property_id, photo_urls.clone()))
        {
            Ok(room) => room,
            Err(err) => {
                gateways::discard(self.storage.as_ref(), &photo_urls);
                return Err(err.into());
            }
        };

        info!(property_id = %property_id, room_id = %room.id, "room created");
        Ok(room)
    }

    pub fn list_rooms(&self, property_id: PropertyId) -> Result<Vec<Room>, ServiceError> {
        self.get(property_id)?;
        Ok(self.store.list_rooms(property_id)?)
    }

    pub fn get_room(&self, property_id: PropertyId, room_id: RoomId) -> Result<Room, ServiceError> {
        self.store
            .fetch_room(property_id, room_id)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "room {room_id} not found on property {property_id}"
                ))
            })
    }

    pub fn delete_room(
        &self,
        caller: &Caller,
        property_id: PropertyId,
        room_id: RoomId,
    ) -> Result<Room, ServiceError> {
        let listing = self.get(property_id)?;
        self.authorize(caller, &listing)?;
        self.get_room(property_id, room_id)?;

        let room = self.store.delete_room(property_id, room_id)?;
        gateways::discard(self.storage.as_ref(), &room.photo_urls);
        info!(property_id = %property_id, room_id = %room_id, "room deleted");
        Ok(room)
    }

    fn authorize(&self, caller: &Caller, listing: &PropertyListing) -> Result<(), ServiceError> {
        if caller.can_manage(&listing.property.manager_cognito_id) {
            return Ok(());
        }
        warn!(
            property_id = %listing.property.id,
            caller = %caller.user_id,
            "property change refused"
        );
        Err(ServiceError::Forbidden(format!(
            "property {} is managed by another user",
            listing.property.id
        )))
    }
}

/// Managers create listings for themselves; admins must say on whose behalf.
fn owning_manager(caller: &Caller, requested: Option<&str>) -> Result<String, ServiceError> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());
    match caller.role {
        UserRole::Admin => requested.map(str::to_string).ok_or_else(|| {
            ServiceError::Validation("managerCognitoId is required for admin callers".to_string())
        }),
        UserRole::Manager => match requested {
            Some(id) if !caller.is(id) => Err(ServiceError::Forbidden(
                "managers can only create properties for themselves".to_string(),
            )),
            _ => Ok(caller.user_id.clone()),
        },
        UserRole::Tenant => Err(ServiceError::Forbidden(
            "only managers can create properties".to_string(),
        )),
    }
}
