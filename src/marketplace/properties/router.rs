use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::marketplace::error::ServiceError;
use crate::marketplace::forms::{path_params, query_params, FormPayload};
use crate::marketplace::identity::Caller;
use crate::marketplace::profiles::ProfileRepository;

use super::domain::{
    PropertyDraft, PropertyFilter, PropertyId, PropertyPatch, PropertyQuery, RoomDraft, RoomId,
};
use super::repository::PropertyRepository;
use super::service::PropertyService;

type SharedService<S> = Arc<PropertyService<S>>;

/// Public listing reads plus manager-scoped writes for properties and rooms.
pub fn property_router<S>(service: SharedService<S>) -> Router
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    Router::new()
        .route(
            "/properties",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/properties/:property_id",
            get(detail_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/properties/:property_id/rooms",
            get(list_rooms_handler::<S>).post(create_room_handler::<S>),
        )
        .route(
            "/properties/:property_id/rooms/:room_id",
            get(room_handler::<S>).delete(delete_room_handler::<S>),
        )
        .route(
            "/managers/:cognito_id/properties",
            get(manager_properties_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn create_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    form: FormPayload<PropertyDraft>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let listing = service.create(&caller, form.payload, form.photos, Utc::now())?;
    Ok((StatusCode::CREATED, Json(listing)).into_response())
}

pub(crate) async fn list_handler<S>(
    State(service): State<SharedService<S>>,
    query: Result<Query<PropertyQuery>, QueryRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let query = query_params(query)?;
    let listings = service.list(&query.into_filter()?)?;
    Ok(Json(listings).into_response())
}

pub(crate) async fn detail_handler<S>(
    State(service): State<SharedService<S>>,
    id: Result<Path<PropertyId>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let listing = service.get(path_params(id)?)?;
    Ok(Json(listing).into_response())
}

pub(crate) async fn update_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    id: Result<Path<PropertyId>, PathRejection>,
    form: FormPayload<PropertyPatch>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let listing = service.update(&caller, path_params(id)?, form.payload, form.photos)?;
    Ok(Json(listing).into_response())
}

pub(crate) async fn delete_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    id: Result<Path<PropertyId>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let listing = service.delete(&caller, path_params(id)?)?;
    Ok(Json(listing).into_response())
}

pub(crate) async fn create_room_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    id: Result<Path<PropertyId>, PathRejection>,
    form: FormPayload<RoomDraft>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let room = service.add_room(&caller, path_params(id)?, form.payload, form.photos)?;
    Ok((StatusCode::CREATED, Json(room)).into_response())
}

pub(crate) async fn list_rooms_handler<S>(
    State(service): State<SharedService<S>>,
    id: Result<Path<PropertyId>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let rooms = service.list_rooms(path_params(id)?)?;
    Ok(Json(rooms).into_response())
}

pub(crate) async fn room_handler<S>(
    State(service): State<SharedService<S>>,
    ids: Result<Path<(PropertyId, RoomId)>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let (property_id, room_id) = path_params(ids)?;
    let room = service.get_room(property_id, room_id)?;
    Ok(Json(room).into_response())
}

pub(crate) async fn delete_room_handler<S>(
    State(service): State<SharedService<S>>,
    caller: Caller,
    ids: Result<Path<(PropertyId, RoomId)>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let (property_id, room_id) = path_params(ids)?;
    let room = service.delete_room(&caller, property_id, room_id)?;
    Ok(Json(room).into_response())
}

pub(crate) async fn manager_properties_handler<S>(
    State(service): State<SharedService<S>>,
    cognito_id: Result<Path<String>, PathRejection>,
) -> Result<Response, ServiceError>
where
    S: PropertyRepository + ProfileRepository + 'static,
{
    let filter = PropertyFilter {
        manager_cognito_id: Some(path_params(cognito_id)?),
        ..PropertyFilter::default()
    };
    let listings = service.list(&filter)?;
    Ok(Json(listings).into_response())
}
