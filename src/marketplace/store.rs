//! In-process relational store.
//!
//! All tables sit behind one mutex, so every repository call is a serializable transaction.
//! `ensure_active` relies on that: the lease look-up and the insert happen while the same guard
//! is held. Status updates check the transition against the row they overwrite.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::applications::{
    Application, ApplicationFilter, ApplicationId, ApplicationRepository, ApplicationStatus,
    NewApplication, StatusTransition, TransitionPolicy,
};
use super::error::RepositoryError;
use super::leases::{Lease, LeaseDraft, LeaseFilter, LeaseId, LeaseOutcome, LeaseRepository};
use super::profiles::{ContactPatch, Manager, ProfileRepository, Tenant};
use super::properties::{
    Location, LocationId, NewLocation, NewProperty, NewRoom, Property, PropertyFilter,
    PropertyId, PropertyListing, PropertyRepository, RemovedProperty, Room, RoomId,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    tenants: BTreeMap<String, Tenant>,
    managers: BTreeMap<String, Manager>,
    locations: BTreeMap<LocationId, Location>,
    properties: BTreeMap<PropertyId, Property>,
    rooms: BTreeMap<RoomId, Room>,
    applications: BTreeMap<ApplicationId, Application>,
    leases: BTreeMap<LeaseId, Lease>,
    sequences: Sequences,
}

#[derive(Debug, Default)]
struct Sequences {
    location: u64,
    property: u64,
    room: u64,
    application: u64,
    lease: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl Tables {
    fn listing(&self, property: &Property) -> Result<PropertyListing, RepositoryError> {
        let location = self
            .locations
            .get(&property.location_id)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::Unavailable(format!(
                    "location {} missing for property {}",
                    property.location_id.0, property.id
                ))
            })?;
        Ok(PropertyListing {
            property: property.clone(),
            location,
        })
    }

    fn manager_of(&self, property_id: PropertyId) -> Option<&str> {
        self.properties
            .get(&property_id)
            .map(|property| property.manager_cognito_id.as_str())
    }

    fn active_lease(
        &self,
        property_id: PropertyId,
        tenant_cognito_id: &str,
        now: DateTime<Utc>,
    ) -> Option<&Lease> {
        self.leases
            .values()
            .filter(|lease| lease.belongs_to(property_id, tenant_cognito_id))
            .find(|lease| lease.is_active_at(now))
    }

    fn overlapping_lease(&self, draft: &LeaseDraft) -> Option<&Lease> {
        self.leases.values().find(|lease| {
            lease.belongs_to(draft.property_id, &draft.tenant_cognito_id)
                && lease.overlaps(draft.start_date, draft.end_date)
        })
    }

    /// Range-exclusion constraint on (property, tenant).
    fn insert_lease(&mut self, draft: LeaseDraft) -> Result<Lease, RepositoryError> {
        if self.overlapping_lease(&draft).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "lease for property {} and tenant {} overlaps an existing lease",
                draft.property_id, draft.tenant_cognito_id
            )));
        }

        let lease = Lease {
            id: LeaseId(next(&mut self.sequences.lease)),
            property_id: draft.property_id,
            tenant_cognito_id: draft.tenant_cognito_id,
            start_date: draft.start_date,
            end_date: draft.end_date,
            rent: draft.rent,
            deposit: draft.deposit,
        };
        self.leases.insert(lease.id, lease.clone());
        Ok(lease)
    }
}

impl ProfileRepository for InMemoryStore {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.tenants.contains_key(&tenant.cognito_id) {
            return Err(RepositoryError::Conflict(format!(
                "tenant {} already exists",
                tenant.cognito_id
            )));
        }
        tables
            .tenants
            .insert(tenant.cognito_id.clone(), tenant.clone());
        Ok(tenant)
    }

    fn fetch_tenant(&self, cognito_id: &str) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.tables()?.tenants.get(cognito_id).cloned())
    }

    fn update_tenant_contact(
        &self,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Tenant, RepositoryError> {
        let mut tables = self.tables()?;
        let tenant = tables
            .tenants
            .get_mut(cognito_id)
            .ok_or(RepositoryError::NotFound)?;
        tenant.apply(patch);
        Ok(tenant.clone())
    }

    fn add_favorite(
        &self,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, RepositoryError> {
        let mut tables = self.tables()?;
        let tenant = tables
            .tenants
            .get_mut(cognito_id)
            .ok_or(RepositoryError::NotFound)?;
        if !tenant.favorites.contains(&property_id) {
            tenant.favorites.push(property_id);
        }
        Ok(tenant.clone())
    }

    fn remove_favorite(
        &self,
        cognito_id: &str,
        property_id: PropertyId,
    ) -> Result<Tenant, RepositoryError> {
        let mut tables = self.tables()?;
        let tenant = tables
            .tenants
            .get_mut(cognito_id)
            .ok_or(RepositoryError::NotFound)?;
        tenant.favorites.retain(|favorite| *favorite != property_id);
        Ok(tenant.clone())
    }

    fn insert_manager(&self, manager: Manager) -> Result<Manager, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.managers.contains_key(&manager.cognito_id) {
            return Err(RepositoryError::Conflict(format!(
                "manager {} already exists",
                manager.cognito_id
            )));
        }
        tables
            .managers
            .insert(manager.cognito_id.clone(), manager.clone());
        Ok(manager)
    }

    fn fetch_manager(&self, cognito_id: &str) -> Result<Option<Manager>, RepositoryError> {
        Ok(self.tables()?.managers.get(cognito_id).cloned())
    }

    fn update_manager_contact(
        &self,
        cognito_id: &str,
        patch: ContactPatch,
    ) -> Result<Manager, RepositoryError> {
        let mut tables = self.tables()?;
        let manager = tables
            .managers
            .get_mut(cognito_id)
            .ok_or(RepositoryError::NotFound)?;
        manager.apply(patch);
        Ok(manager.clone())
    }
}

impl PropertyRepository for InMemoryStore {
    fn insert_property(
        &self,
        location: NewLocation,
        property: NewProperty,
    ) -> Result<PropertyListing, RepositoryError> {
        let mut tables = self.tables()?;

        let location = Location {
            id: LocationId(next(&mut tables.sequences.location)),
            address: location.address,
            coordinates: location.coordinates,
        };
        let property = Property {
            id: PropertyId(next(&mut tables.sequences.property)),
            name: property.name,
            description: property.description,
            price_per_month: property.price_per_month,
            security_deposit: property.security_deposit,
            application_fee: property.application_fee,
            photo_urls: property.photo_urls,
            amenities: property.amenities,
            highlights: property.highlights,
            is_pets_allowed: property.is_pets_allowed,
            is_parking_included: property.is_parking_included,
            beds: property.beds,
            baths: property.baths,
            square_feet: property.square_feet,
            property_type: property.property_type,
            posted_date: property.posted_date,
            location_id: location.id,
            manager_cognito_id: property.manager_cognito_id,
        };

        tables.locations.insert(location.id, location.clone());
        tables.properties.insert(property.id, property.clone());
        Ok(PropertyListing { property, location })
    }

    fn fetch_property(&self, id: PropertyId) -> Result<Option<PropertyListing>, RepositoryError> {
        let tables = self.tables()?;
        tables
            .properties
            .get(&id)
            .map(|property| tables.listing(property))
            .transpose()
    }

    fn list_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyListing>, RepositoryError> {
        let tables = self.tables()?;
        tables
            .properties
            .values()
            .filter(|property| filter.matches(property))
            .map(|property| tables.listing(property))
            .collect()
    }

    fn update_property(&self, listing: PropertyListing) -> Result<(), RepositoryError> {
        let mut tables = self.tables()?;
        let PropertyListing { property, location } = listing;
        match tables.properties.get(&property.id) {
            Some(stored) if stored.location_id == location.id => {}
            Some(_) => {
                return Err(RepositoryError::Conflict(format!(
                    "location {} does not belong to property {}",
                    location.id.0, property.id
                )))
            }
            None => return Err(RepositoryError::NotFound),
        }
        tables.locations.insert(location.id, location);
        tables.properties.insert(property.id, property);
        Ok(())
    }

    fn delete_property(&self, id: PropertyId) -> Result<RemovedProperty, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.properties.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }

        let referenced = tables
            .applications
            .values()
            .any(|application| application.property_id == id)
            || tables.leases.values().any(|lease| lease.property_id == id);
        if referenced {
            return Err(RepositoryError::Conflict(format!(
                "property {id} is referenced by applications or leases"
            )));
        }

        let property = tables.properties.remove(&id).ok_or(RepositoryError::NotFound)?;
        let room_ids: Vec<RoomId> = tables
            .rooms
            .values()
            .filter(|room| room.property_id == id)
            .map(|room| room.id)
            .collect();
        let rooms = room_ids
            .iter()
            .filter_map(|room_id| tables.rooms.remove(room_id))
            .collect();
        let location = tables
            .locations
            .remove(&property.location_id)
            .ok_or_else(|| {
                RepositoryError::Unavailable(format!(
                    "location {} missing for property {id}",
                    property.location_id.0
                ))
            })?;

        Ok(RemovedProperty {
            listing: PropertyListing { property, location },
            rooms,
        })
    }

    fn insert_room(&self, room: NewRoom) -> Result<Room, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.properties.contains_key(&room.property_id) {
            return Err(RepositoryError::NotFound);
        }
        let room = Room {
            id: RoomId(next(&mut tables.sequences.room)),
            property_id: room.property_id,
            name: room.name,
            description: room.description,
            price_per_month: room.price_per_month,
            security_deposit: room.security_deposit,
            capacity: room.capacity,
            amenities: room.amenities,
            photo_urls: room.photo_urls,
            is_available: room.is_available,
            available_from: room.available_from,
        };
        tables.rooms.insert(room.id, room.clone());
        Ok(room)
    }

    fn list_rooms(&self, property_id: PropertyId) -> Result<Vec<Room>, RepositoryError> {
        Ok(self
            .tables()?
            .rooms
            .values()
            .filter(|room| room.property_id == property_id)
            .cloned()
            .collect())
    }

    fn fetch_room(
        &self,
        property_id: PropertyId,
        room_id: RoomId,
    ) -> Result<Option<Room>, RepositoryError> {
        Ok(self
            .tables()?
            .rooms
            .get(&room_id)
            .filter(|room| room.property_id == property_id)
            .cloned())
    }

    fn delete_room(
        &self,
        property_id: PropertyId,
        room_id: RoomId,
    ) -> Result<Room, RepositoryError> {
        let mut tables = self.tables()?;
        match tables.rooms.get(&room_id) {
            Some(room) if room.property_id == property_id => {
                tables.rooms.remove(&room_id).ok_or(RepositoryError::NotFound)
            }
            _ => Err(RepositoryError::NotFound),
        }
    }
}

impl ApplicationRepository for InMemoryStore {
    fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        let application = Application {
            id: ApplicationId(next(&mut tables.sequences.application)),
            property_id: application.property_id,
            tenant_cognito_id: application.tenant_cognito_id,
            status: ApplicationStatus::Pending,
            application_date: application.application_date,
            updated_at: application.application_date,
            contact: application.contact,
            message: application.message,
        };
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(&id).cloned())
    }

    fn update_application_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
        policy: TransitionPolicy,
        updated_at: DateTime<Utc>,
    ) -> Result<(Application, StatusTransition), RepositoryError> {
        let mut tables = self.tables()?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        let transition = application
            .status
            .transition_to(status, policy)
            .map_err(|rejected| RepositoryError::Conflict(rejected.to_string()))?;
        application.status = status;
        application.updated_at = updated_at;
        Ok((application.clone(), transition))
    }

    fn list_applications(
        &self,
        filter: &ApplicationFilter,
    ) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .applications
            .values()
            .filter(|application| {
                filter
                    .tenant_cognito_id
                    .as_deref()
                    .map_or(true, |tenant| application.tenant_cognito_id == tenant)
            })
            .filter(|application| {
                filter.manager_cognito_id.as_deref().map_or(true, |manager| {
                    tables.manager_of(application.property_id) == Some(manager)
                })
            })
            .filter(|application| filter.status.map_or(true, |status| application.status == status))
            .filter(|application| {
                filter
                    .property_id
                    .map_or(true, |property_id| application.property_id == property_id)
            })
            .cloned()
            .collect())
    }
}

impl LeaseRepository for InMemoryStore {
    fn ensure_active(
        &self,
        draft: LeaseDraft,
        now: DateTime<Utc>,
    ) -> Result<LeaseOutcome, RepositoryError> {
        let mut tables = self.tables()?;
        let reusable = tables
            .active_lease(draft.property_id, &draft.tenant_cognito_id, now)
            .or_else(|| tables.overlapping_lease(&draft))
            .cloned();
        match reusable {
            Some(existing) => Ok(LeaseOutcome::Existing(existing)),
            None => tables.insert_lease(draft).map(LeaseOutcome::Created),
        }
    }

    fn active_lease(
        &self,
        property_id: PropertyId,
        tenant_cognito_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Lease>, RepositoryError> {
        Ok(self
            .tables()?
            .active_lease(property_id, tenant_cognito_id, now)
            .cloned())
    }

    fn fetch_lease(&self, id: LeaseId) -> Result<Option<Lease>, RepositoryError> {
        Ok(self.tables()?.leases.get(&id).cloned())
    }

    fn list_leases(&self, filter: &LeaseFilter) -> Result<Vec<Lease>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .leases
            .values()
            .filter(|lease| {
                filter
                    .tenant_cognito_id
                    .as_deref()
                    .map_or(true, |tenant| lease.tenant_cognito_id == tenant)
            })
            .filter(|lease| {
                filter.manager_cognito_id.as_deref().map_or(true, |manager| {
                    tables.manager_of(lease.property_id) == Some(manager)
                })
            })
            .filter(|lease| {
                filter
                    .property_id
                    .map_or(true, |property_id| lease.property_id == property_id)
            })
            .cloned()
            .collect())
    }
}
