use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::{json_body, path_params, query_params};
use crate::marketplace::identity::Caller;
use crate::marketplace::leases::LeaseRepository;
use crate::marketplace::profiles::ProfileRepository;
use crate::marketplace::properties::PropertyRepository;

use super::domain::{ApplicationId, ApplicationQuery, ApplicationRequest, StatusRequest};
use super::repository::ApplicationRepository;
use super::service::ApplicationService;

/// Router builder exposing application intake, listing, and the status workflow.
pub fn application_router<S, L>(service: Arc<ApplicationService<S, L>>) -> Router
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    Router::new()
        .route(
            "/applications",
            get(list_handler::<S, L>).post(submit_handler::<S, L>),
        )
        .route("/applications/:application_id", get(detail_handler::<S, L>))
        .route(
            "/applications/:application_id/status",
            put(status_handler::<S, L>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<S, L>(
    State(service): State<Arc<ApplicationService<S, L>>>,
    caller: Caller,
    payload: Result<Json<ApplicationRequest>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    let request = json_body(payload)?;
    let application = service.submit(&caller, request, Utc::now())?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn list_handler<S, L>(
    State(service): State<Arc<ApplicationService<S, L>>>,
    caller: Caller,
    query: Result<Query<ApplicationQuery>, QueryRejection>,
) -> Result<Response, ServiceError>
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    let query = query_params(query)?;
    let applications = service.list(&caller, query, Utc::now())?;
    Ok(Json(applications).into_response())
}

pub(crate) async fn detail_handler<S, L>(
    State(service): State<Arc<ApplicationService<S, L>>>,
    caller: Caller,
    id: Result<Path<ApplicationId>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    let details = service.get(&caller, path_params(id)?, Utc::now())?;
    Ok(Json(details).into_response())
}

/// `PUT /applications/{id}/status`. Identity is resolved first so an anonymous request is
/// rejected with 401 whatever the body contains.
pub(crate) async fn status_handler<S, L>(
    State(service): State<Arc<ApplicationService<S, L>>>,
    caller: Caller,
    id: Result<Path<ApplicationId>, PathRejection>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ApplicationRepository + PropertyRepository + ProfileRepository + 'static,
    L: LeaseRepository + 'static,
{
    let id = path_params(id)?;
    let request = json_body(payload)?;
    let update = service.update_status(&caller, id, &request.status)?;
    Ok(Json(update).into_response())
}
