use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use super::{AppState, JsonBody, PathParam};
use crate::error::Result;
use crate::logging::RequestContext;
use crate::models::{Client, ClientIds, DeliveryPoint, DeliveryPointUpdate, NewDeliveryPoint};

pub async fn list_delivery_points(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeliveryPoint>>> {
    Ok(Json(state.delivery_points.list().await?))
}

pub async fn create_delivery_point(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    JsonBody(new): JsonBody<NewDeliveryPoint>,
) -> Result<(StatusCode, Json<DeliveryPoint>)> {
    let point = state.delivery_points.create(&ctx, new).await?;
    Ok((StatusCode::CREATED, Json(point)))
}

pub async fn get_delivery_point(
    State(state): State<AppState>,
    PathParam(delivery_point_id): PathParam<i32>,
) -> Result<Json<DeliveryPoint>> {
    Ok(Json(state.delivery_points.get(delivery_point_id).await?))
}

pub async fn update_delivery_point(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(delivery_point_id): PathParam<i32>,
    JsonBody(update): JsonBody<DeliveryPointUpdate>,
) -> Result<Json<DeliveryPoint>> {
    let point = state
        .delivery_points
        .update(&ctx, delivery_point_id, update)
        .await?;
    Ok(Json(point))
}

pub async fn delete_delivery_point(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(delivery_point_id): PathParam<i32>,
) -> Result<StatusCode> {
    state.delivery_points.delete(&ctx, delivery_point_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_clients(
    State(state): State<AppState>,
    PathParam(delivery_point_id): PathParam<i32>,
) -> Result<Json<Vec<Client>>> {
    Ok(Json(
        state.delivery_point_links.list_links(delivery_point_id).await?,
    ))
}

pub async fn link_clients(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam(delivery_point_id): PathParam<i32>,
    JsonBody(body): JsonBody<ClientIds>,
) -> Result<Json<Vec<Client>>> {
    let clients = state
        .delivery_point_links
        .link(&ctx, delivery_point_id, &body.client_ids)
        .await?;
    Ok(Json(clients))
}

pub async fn unlink_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    PathParam((delivery_point_id, client_id)): PathParam<(i32, i32)>,
) -> Result<StatusCode> {
    state
        .delivery_point_links
        .unlink(&ctx, delivery_point_id, client_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
