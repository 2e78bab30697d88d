use crate::marketplace::error::RepositoryError;

use super::domain::{
    NewLocation, NewProperty, NewRoom, PropertyFilter, PropertyId, PropertyListing,
    RemovedProperty, Room, RoomId,
};

/// Storage abstraction for properties, their locations, and rooms.
pub trait PropertyRepository: Send + Sync {
    /// Persists the location first, then the property referencing it.
    fn insert_property(
        &self,
        location: NewLocation,
        property: NewProperty,
    ) -> Result<PropertyListing, RepositoryError>;
    fn fetch_property(&self, id: PropertyId) -> Result<Option<PropertyListing>, RepositoryError>;
    fn list_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyListing>, RepositoryError>;
    /// Writes both the property row and its location row.
    fn update_property(&self, listing: PropertyListing) -> Result<(), RepositoryError>;
    /// Removes the property, its rooms, and its location together. Fails with `Conflict`
    /// while applications or leases still reference the property.
    fn delete_property(&self, id: PropertyId) -> Result<RemovedProperty, RepositoryError>;

    fn insert_room(&self, room: NewRoom) -> Result<Room, RepositoryError>;
    fn list_rooms(&self, property_id: PropertyId) -> Result<Vec<Room>, RepositoryError>;
    fn fetch_room(
        &self,
        property_id: PropertyId,
        room_id: RoomId,
    ) -> Result<Option<Room>, RepositoryError>;
    fn delete_room(&self, property_id: PropertyId, room_id: RoomId)
        -> Result<Room, RepositoryError>;
}
