//! Leases issued when applications are approved.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    Lease, LeaseDraft, LeaseFilter, LeaseId, LeaseOutcome, LeasePolicy, LeaseQuery,
    LeaseTermError,
};
pub use repository::LeaseRepository;
pub use router::lease_router;
pub use service::LeaseService;
