use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::{path_params, query_params};
use crate::marketplace::identity::Caller;
use crate::marketplace::properties::PropertyRepository;

use super::domain::{LeaseId, LeaseQuery};
use super::repository::LeaseRepository;
use super::service::LeaseService;

pub fn lease_router<S>(service: Arc<LeaseService<S>>) -> Router
where
    S: LeaseRepository + PropertyRepository + 'static,
{
    Router::new()
        .route("/leases", get(list_handler::<S>))
        .route("/leases/:lease_id", get(detail_handler::<S>))
        .with_state(service)
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<LeaseService<S>>>,
    caller: Caller,
    query: Result<Query<LeaseQuery>, QueryRejection>,
) -> Result<Response, ServiceError>
where
    S: LeaseRepository + PropertyRepository + 'static,
{
    let leases = service.list(&caller, query_params(query)?)?;
    Ok(Json(leases).into_response())
}

pub(crate) async fn detail_handler<S>(
    State(service): State<Arc<LeaseService<S>>>,
    caller: Caller,
    id: Result<Path<LeaseId>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: LeaseRepository + PropertyRepository + 'static,
{
    let lease = service.get(&caller, path_params(id)?)?;
    Ok(Json(lease).into_response())
}
