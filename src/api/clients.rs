use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::{AppState, JsonBody, PathParam};
use crate::error::Result;
use crate::logging::RequestContext;
use crate::models::{Client, ClientUpdate, DeliveryPoint, DeliveryPointIds, NewClient};

pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>> {
    Ok(Json(state.clients.list().await?))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(new): JsonBody<NewClient>,
) -> Result<(StatusCode, Json<Client>)> {
    let client = state.clients.create(&ctx, new).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    PathParam(client_id): PathParam<i32>,
) -> Result<Json<Client>> {
    Ok(Json(state.clients.get(client_id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(client_id): PathParam<i32>,
    JsonBody(update): JsonBody<ClientUpdate>,
) -> Result<Json<Client>> {
    Ok(Json(state.clients.update(&ctx, client_id, update).await?))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(client_id): PathParam<i32>,
) -> Result<StatusCode> {
    state.clients.delete(&ctx, client_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_delivery_points(
    State(state): State<AppState>,
    PathParam(client_id): PathParam<i32>,
) -> Result<Json<Vec<DeliveryPoint>>> {
    Ok(Json(state.client_links.list_links(client_id).await?))
}

pub async fn link_delivery_points(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(client_id): PathParam<i32>,
    JsonBody(body): JsonBody<DeliveryPointIds>,
) -> Result<Json<Vec<DeliveryPoint>>> {
    let points = state
        .client_links
        .link(&ctx, client_id, &body.delivery_point_ids)
        .await?;
    Ok(Json(points))
}

pub async fn unlink_delivery_point(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam((client_id, delivery_point_id)): PathParam<(i32, i32)>,
) -> Result<StatusCode> {
    state
        .client_links
        .unlink(&ctx, client_id, delivery_point_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
