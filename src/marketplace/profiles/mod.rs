//! Tenant and manager profiles keyed by the identity provider's subject identifier.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;


pub use domain::{ContactPatch, Manager, NewProfile, Tenant};
pub use repository::ProfileRepository;
pub use router::profile_router;
pub use service::ProfileService;
