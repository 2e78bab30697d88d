//! Property listings, their geocoded locations, and room sub-records.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AddressFields, Location, LocationId, NewLocation, NewProperty, NewRoom, Property,
    PropertyDraft, PropertyFilter, PropertyId, PropertyListing, PropertyPatch, PropertyQuery,
    PropertyType, RemovedProperty, Room, RoomDraft, RoomId,
};
pub use repository::PropertyRepository;
pub use router::property_router;
pub use service::PropertyService;
