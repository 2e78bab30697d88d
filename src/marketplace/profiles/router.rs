use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::{json_body, path_params};
use crate::marketplace::identity::Caller;
use crate::marketplace::leases::LeaseRepository;
use crate::marketplace::properties::{PropertyId, PropertyRepository};

use super::domain::{ContactPatch, NewProfile};
use super::repository::ProfileRepository;
use super::service::ProfileService;

type SharedService<S> = Arc<ProfileService<S>>;

pub fn profile_router<S>(service: SharedService<S>) -> Router
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    Router::new()
        .route("/tenants", post(create_tenant_handler::<S>))
        .route(
            "/tenants/:cognito_id",
            get(get_tenant_handler::<S>).put(update_tenant_handler::<S>),
        )
        .route(
            "/tenants/:cognito_id/favorites/:property_id",
            post(add_favorite_handler::<S>).delete(remove_favorite_handler::<S>),
        )
        .route(
            "/tenants/:cognito_id/current-residences",
            get(residences_handler::<S>),
        )
        .route("/managers", post(create_manager_handler::<S>))
        .route(
            "/managers/:cognito_id",
            get(get_manager_handler::<S>).put(update_manager_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn create_tenant_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let tenant = service.create_tenant(&caller, json_body(payload)?)?;
    Ok((StatusCode::CREATED, Json(tenant)).into_response())
}

pub(crate) async fn get_tenant_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    cognito_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let tenant = service.get_tenant(&caller, &path_params(cognito_id)?)?;
    Ok(Json(tenant).into_response())
}

pub(crate) async fn update_tenant_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    cognito_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let cognito_id = path_params(cognito_id)?;
    let tenant = service.update_tenant(&caller, &cognito_id, json_body(payload)?)?;
    Ok(Json(tenant).into_response())
}

pub(crate) async fn add_favorite_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    ids: Result<Path<(String, PropertyId)>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let (cognito_id, property_id) = path_params(ids)?;
    let tenant = service.add_favorite(&caller, &cognito_id, property_id)?;
    Ok(Json(tenant).into_response())
}

pub(crate) async fn remove_favorite_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    ids: Result<Path<(String, PropertyId)>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let (cognito_id, property_id) = path_params(ids)?;
    let tenant = service.remove_favorite(&caller, &cognito_id, property_id)?;
    Ok(Json(tenant).into_response())
}

pub(crate) async fn residences_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    cognito_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let cognito_id = path_params(cognito_id)?;
    let residences = service.current_residences(&caller, &cognito_id, Utc::now())?;
    Ok(Json(residences).into_response())
}

pub(crate) async fn create_manager_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let manager = service.create_manager(&caller, json_body(payload)?)?;
    Ok((StatusCode::CREATED, Json(manager)).into_response())
}

pub(crate) async fn get_manager_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    cognito_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let manager = service.get_manager(&caller, &path_params(cognito_id)?)?;
    Ok(Json(manager).into_response())
}

pub(crate) async fn update_manager_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    cognito_id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ContactPatch>, JsonRejection>,
) -> Result<Response, ServiceError>
where
    S: ProfileRepository + PropertyRepository + LeaseRepository + 'static,
{
    let cognito_id = path_params(cognito_id)?;
    let manager = service.update_manager(&caller, &cognito_id, json_body(payload)?)?;
    Ok(Json(manager).into_response())
}
