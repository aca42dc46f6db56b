//! HTTP surface. Handlers are thin: extract, call a service, shape the reply.

mod clients;
mod delivery_points;
mod health;

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use axum::routing::{delete, get};
use axum::{Json, middleware};
use serde::de::DeserializeOwned;

use crate::db::Store;
use crate::error::Error;
use crate::logging::track_request;
use crate::service::{ClientLinks, ClientService, DeliveryPointLinks, DeliveryPointService};

/// Shared handler state. Everything in here is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clients: ClientService,
    pub delivery_points: DeliveryPointService,
    pub client_links: ClientLinks,
    pub delivery_point_links: DeliveryPointLinks,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            clients: ClientService::new(store.clone()),
            delivery_points: DeliveryPointService::new(store.clone()),
            client_links: ClientLinks::new(store.clone()),
            delivery_point_links: DeliveryPointLinks::new(store.clone()),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route(
            "/api/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/api/clients/",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/api/clients/{client_id}",
            get(clients::get_client)
                .patch(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/api/clients/{client_id}/delivery-points",
            get(clients::list_delivery_points).post(clients::link_delivery_points),
        )
        .route(
            "/api/clients/{client_id}/delivery-points/{delivery_point_id}",
            delete(clients::unlink_delivery_point),
        )
        .route(
            "/api/delivery-points",
            get(delivery_points::list_delivery_points)
                .post(delivery_points::create_delivery_point),
        )
        .route(
            "/api/delivery-points/",
            get(delivery_points::list_delivery_points)
                .post(delivery_points::create_delivery_point),
        )
        .route(
            "/api/delivery-points/{delivery_point_id}",
            get(delivery_points::get_delivery_point)
                .patch(delivery_points::update_delivery_point)
                .delete(delivery_points::delete_delivery_point),
        )
        .route(
            "/api/delivery-points/{delivery_point_id}/clients",
            get(delivery_points::list_clients).post(delivery_points::link_clients),
        )
        .route(
            "/api/delivery-points/{delivery_point_id}/clients/{client_id}",
            delete(delivery_points::unlink_client),
        )
        .layer(middleware::from_fn(track_request))
        .with_state(state)
}

/// `Json` whose rejections come back as our 422 validation error.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// `Path` whose rejections (e.g. a non-integer id) come back as our 422 validation error.
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| Error::Validation(rejection.body_text()))?;
        Ok(Self(value))
    }
}
