//! Rental applications and the status workflow that issues leases on approval.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Application, ApplicationDetails, ApplicationFilter, ApplicationId, ApplicationQuery,
    ApplicationRequest, ApplicationStatus, ContactSnapshot, InvalidStatus, NewApplication,
    StatusRequest, StatusTransition, StatusUpdate, TransitionPolicy, TransitionRejected,
};
pub use repository::ApplicationRepository;
pub use router::application_router;
pub use service::ApplicationService;
