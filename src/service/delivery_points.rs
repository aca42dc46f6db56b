use std::sync::Arc;

use crate::db::Store;
use crate::error::{Error, Result};
use crate::logging::RequestContext;
use crate::models::{DeliveryPoint, DeliveryPointUpdate, EntityKind, NewDeliveryPoint};

#[derive(Clone)]
pub struct DeliveryPointService {
    store: Arc<dyn Store>,
}

impl DeliveryPointService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        new: NewDeliveryPoint,
    ) -> Result<DeliveryPoint> {
        new.validate()?;
        let point = self.store.create_delivery_point(&new.normalized()).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            delivery_point_id = point.id,
            "delivery point created"
        );
        Ok(point)
    }

    pub async fn get(&self, id: i32) -> Result<DeliveryPoint> {
        self.store
            .get_delivery_point(id)
            .await?
            .ok_or(Error::NotFound(EntityKind::DeliveryPoint))
    }

    pub async fn list(&self) -> Result<Vec<DeliveryPoint>> {
        self.store.list_delivery_points().await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        update: DeliveryPointUpdate,
    ) -> Result<DeliveryPoint> {
        update.validate()?;
        let point = self
            .store
            .update_delivery_point(id, &update)
            .await?
            .ok_or(Error::NotFound(EntityKind::DeliveryPoint))?;
        tracing::info!(request_id = %ctx.request_id, delivery_point_id = id, "delivery point updated");
        Ok(point)
    }

    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<()> {
        if !self.store.delete_delivery_point(id).await? {
            return Err(Error::NotFound(EntityKind::DeliveryPoint));
        }
        tracing::info!(request_id = %ctx.request_id, delivery_point_id = id, "delivery point deleted");
        Ok(())
    }
}
