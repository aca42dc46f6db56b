use std::sync::Arc;

use crate::db::Store;
use crate::error::{Error, Result};
use crate::logging::RequestContext;
use crate::models::{Client, ClientUpdate, EntityKind, NewClient};

/// Create, read, update and delete for clients.
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn Store>,
}

impl ClientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, ctx: &RequestContext, new: NewClient) -> Result<Client> {
        new.validate()?;
        let client = self.store.create_client(&new).await?;
        tracing::info!(request_id = %ctx.request_id, client_id = client.id, "client created");
        Ok(client)
    }

    pub async fn get(&self, id: i32) -> Result<Client> {
        self.store
            .get_client(id)
            .await?
            .ok_or(Error::NotFound(EntityKind::Client))
    }

    pub async fn list(&self) -> Result<Vec<Client>> {
        self.store.list_clients().await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: i32,
        update: ClientUpdate,
    ) -> Result<Client> {
        update.validate()?;
        let client = self
            .store
            .update_client(id, &update)
            .await?
            .ok_or(Error::NotFound(EntityKind::Client))?;
        tracing::info!(request_id = %ctx.request_id, client_id = id, "client updated");
        Ok(client)
    }

    /// Deletes the client and every link it had.
    pub async fn delete(&self, ctx: &RequestContext, id: i32) -> Result<()> {
        if !self.store.delete_client(id).await? {
            return Err(Error::NotFound(EntityKind::Client));
        }
        tracing::info!(request_id = %ctx.request_id, client_id = id, "client deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::db::MemoryStore;

    fn service() -> (ClientService, RequestContext) {
        (
            ClientService::new(Arc::new(MemoryStore::new())),
            RequestContext::from_header(None),
        )
    }

    #[tokio::test]
    async fn update_touches_only_named_field() {
        let (clients, ctx) = service();
        let created = clients
            .create(
                &ctx,
                NewClient {
                    name: "Original".into(),
                    email: Some("old@example.com".into()),
                    phone: Some("111".into()),
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let update = ClientUpdate {
            email: Some(Some("new@example.com".into())),
            ..Default::default()
        };
        let updated = clients.update(&ctx, created.id, update).await.unwrap();

        assert_eq!(updated.name, "Original");
        assert_eq!(updated.email.as_deref(), Some("new@example.com"));
        assert_eq!(updated.phone.as_deref(), Some("111"));
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(clients.get(created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn missing_client_is_not_found_everywhere() {
        let (clients, ctx) = service();

        assert!(matches!(
            clients.get(99999).await,
            Err(Error::NotFound(EntityKind::Client))
        ));
        assert!(matches!(
            clients.update(&ctx, 99999, ClientUpdate::default()).await,
            Err(Error::NotFound(EntityKind::Client))
        ));
        assert!(matches!(
            clients.delete(&ctx, 99999).await,
            Err(Error::NotFound(EntityKind::Client))
        ));
    }

    #[tokio::test]
    async fn invalid_create_never_reaches_the_store() {
        let (clients, ctx) = service();
        let result = clients
            .create(
                &ctx,
                NewClient {
                    name: String::new(),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(clients.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let (clients, ctx) = service();
        let created = clients
            .create(
                &ctx,
                NewClient {
                    name: "Gone".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        clients.delete(&ctx, created.id).await.unwrap();
        assert!(clients.get(created.id).await.is_err());
        assert!(clients.delete(&ctx, created.id).await.is_err());
    }
}
