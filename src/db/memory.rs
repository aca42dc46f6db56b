use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Store, dangling_links};
use crate::error::Result;
use crate::models::{
    Client, ClientUpdate, DeliveryPoint, DeliveryPointUpdate, EntityKind, Link, LogEntry,
    NewClient, NewDeliveryPoint, NewLogEntry,
};

/// In-process store. Every operation takes the single lock for its whole
/// duration, which gives the same all-or-nothing behaviour as a transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    next_client_id: i32,
    next_delivery_point_id: i32,
    next_log_id: i32,
    clients: BTreeMap<i32, Client>,
    delivery_points: BTreeMap<i32, DeliveryPoint>,
    links: BTreeSet<Link>,
    log_entries: Vec<LogEntry>,
}

impl State {
    fn unlink_where(&mut self, keep: impl Fn(&Link) -> bool) {
        self.links.retain(keep);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_client(&self, new: &NewClient) -> Result<Client> {
        let mut state = self.state.write().await;
        state.next_client_id += 1;
        let now = Utc::now();
        let client = Client {
            id: state.next_client_id,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            created_at: now,
            updated_at: now,
        };
        state.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: i32) -> Result<Option<Client>> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.state.read().await.clients.values().cloned().collect())
    }

    async fn update_client(&self, id: i32, update: &ClientUpdate) -> Result<Option<Client>> {
        let mut state = self.state.write().await;
        Ok(state.clients.get_mut(&id).map(|client| {
            update.apply(client, Utc::now());
            client.clone()
        }))
    }

    async fn delete_client(&self, id: i32) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.clients.remove(&id).is_none() {
            return Ok(false);
        }
        state.unlink_where(|link| link.client_id != id);
        Ok(true)
    }

    async fn create_delivery_point(&self, new: &NewDeliveryPoint) -> Result<DeliveryPoint> {
        let mut state = self.state.write().await;
        state.next_delivery_point_id += 1;
        let now = Utc::now();
        let point = DeliveryPoint {
            id: state.next_delivery_point_id,
            name: new.name.clone(),
            address: new.address.clone(),
            state: new.state.clone(),
            zip: new.zip.clone(),
            country: new.country.clone(),
            latitude: None,
            longitude: None,
            created_at: now,
            updated_at: now,
        };
        state.delivery_points.insert(point.id, point.clone());
        Ok(point)
    }

    async fn get_delivery_point(&self, id: i32) -> Result<Option<DeliveryPoint>> {
        Ok(self.state.read().await.delivery_points.get(&id).cloned())
    }

    async fn list_delivery_points(&self) -> Result<Vec<DeliveryPoint>> {
        Ok(self
            .state
            .read()
            .await
            .delivery_points
            .values()
            .cloned()
            .collect())
    }

    async fn update_delivery_point(
        &self,
        id: i32,
        update: &DeliveryPointUpdate,
    ) -> Result<Option<DeliveryPoint>> {
        let mut state = self.state.write().await;
        Ok(state.delivery_points.get_mut(&id).map(|point| {
            update.apply(point, Utc::now());
            point.clone()
        }))
    }

    async fn delete_delivery_point(&self, id: i32) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.delivery_points.remove(&id).is_none() {
            return Ok(false);
        }
        state.unlink_where(|link| link.delivery_point_id != id);
        Ok(true)
    }

    async fn existing_ids(&self, kind: EntityKind, ids: &[i32]) -> Result<Vec<i32>> {
        let state = self.state.read().await;
        let found: BTreeSet<i32> = ids
            .iter()
            .copied()
            .filter(|id| match kind {
                EntityKind::Client => state.clients.contains_key(id),
                EntityKind::DeliveryPoint => state.delivery_points.contains_key(id),
            })
            .collect();
        Ok(found.into_iter().collect())
    }

    async fn linked_delivery_points(&self, client_id: i32) -> Result<Vec<DeliveryPoint>> {
        let state = self.state.read().await;
        let mut points: Vec<DeliveryPoint> = state
            .links
            .iter()
            .filter(|link| link.client_id == client_id)
            .filter_map(|link| state.delivery_points.get(&link.delivery_point_id).cloned())
            .collect();
        points.sort_by_key(|point| point.id);
        Ok(points)
    }

    async fn linked_clients(&self, delivery_point_id: i32) -> Result<Vec<Client>> {
        let state = self.state.read().await;
        let mut clients: Vec<Client> = state
            .links
            .iter()
            .filter(|link| link.delivery_point_id == delivery_point_id)
            .filter_map(|link| state.clients.get(&link.client_id).cloned())
            .collect();
        clients.sort_by_key(|client| client.id);
        Ok(clients)
    }

    async fn is_linked(&self, link: Link) -> Result<bool> {
        Ok(self.state.read().await.links.contains(&link))
    }

    async fn add_links(&self, links: &[Link]) -> Result<()> {
        let mut state = self.state.write().await;
        let clients: BTreeSet<i32> = state.clients.keys().copied().collect();
        let points: BTreeSet<i32> = state.delivery_points.keys().copied().collect();
        if let Some(err) = dangling_links(links, &clients, &points) {
            return Err(err);
        }
        state.links.extend(links.iter().copied());
        Ok(())
    }

    async fn remove_link(&self, link: Link) -> Result<bool> {
        Ok(self.state.write().await.links.remove(&link))
    }

    async fn insert_log_entry(&self, entry: &NewLogEntry) -> Result<()> {
        let mut state = self.state.write().await;
        state.next_log_id += 1;
        let entry = LogEntry {
            id: state.next_log_id,
            created_at: entry.created_at,
            level: entry.level.clone(),
            logger_name: entry.logger_name.clone(),
            message: entry.message.clone(),
            context: entry.context.clone(),
        };
        state.log_entries.push(entry);
        Ok(())
    }

    async fn list_log_entries(&self) -> Result<Vec<LogEntry>> {
        Ok(self.state.read().await.log_entries.clone())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dock(name: &str) -> NewDeliveryPoint {
        NewDeliveryPoint {
            name: name.to_string(),
            address: "1 Pier Rd".to_string(),
            state: "WA".to_string(),
            zip: "98101".to_string(),
            country: "US".to_string(),
        }
    }

    #[tokio::test]
    async fn ids_are_assigned_in_insertion_order() {
        let store = MemoryStore::new();
        let a = store
            .create_client(&NewClient {
                name: "A".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let b = store
            .create_client(&NewClient {
                name: "B".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(a.id < b.id);
        assert_eq!(a.created_at, a.updated_at);
        let names: Vec<_> = store
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn add_links_skips_pairs_already_present() {
        let store = MemoryStore::new();
        let client = store
            .create_client(&NewClient {
                name: "Acme".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let point = store.create_delivery_point(&dock("DP1")).await.unwrap();
        let link = Link {
            client_id: client.id,
            delivery_point_id: point.id,
        };

        store.add_links(&[link, link]).await.unwrap();
        store.add_links(&[link]).await.unwrap();

        assert_eq!(store.linked_delivery_points(client.id).await.unwrap().len(), 1);
        assert!(store.is_linked(link).await.unwrap());
        assert!(store.remove_link(link).await.unwrap());
        assert!(!store.remove_link(link).await.unwrap());
    }

    #[tokio::test]
    async fn add_links_refuses_pairs_naming_missing_records() {
        let store = MemoryStore::new();
        let client = store
            .create_client(&NewClient {
                name: "Acme".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let point = store.create_delivery_point(&dock("DP1")).await.unwrap();
        let good = Link {
            client_id: client.id,
            delivery_point_id: point.id,
        };
        let dangling = Link {
            client_id: client.id,
            delivery_point_id: 999,
        };

        let err = store.add_links(&[good, dangling]).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::MissingPeers { kind: EntityKind::DeliveryPoint, ref ids } if ids == &[999]
        ));
        // All or nothing: the valid pair was not inserted either.
        assert!(!store.is_linked(good).await.unwrap());
        assert!(!store.is_linked(dangling).await.unwrap());

        assert!(store.delete_client(client.id).await.unwrap());
        let err = store.add_links(&[good]).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::MissingPeers { kind: EntityKind::Client, ref ids } if ids == &[client.id]
        ));
        assert!(store.linked_clients(point.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_either_side_drops_its_links() {
        let store = MemoryStore::new();
        let client = store
            .create_client(&NewClient {
                name: "Acme".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let first = store.create_delivery_point(&dock("DP1")).await.unwrap();
        let second = store.create_delivery_point(&dock("DP2")).await.unwrap();
        store
            .add_links(&[
                Link {
                    client_id: client.id,
                    delivery_point_id: first.id,
                },
                Link {
                    client_id: client.id,
                    delivery_point_id: second.id,
                },
            ])
            .await
            .unwrap();

        assert!(store.delete_delivery_point(first.id).await.unwrap());
        let remaining = store.linked_delivery_points(client.id).await.unwrap();
        assert_eq!(remaining, vec![second.clone()]);

        assert!(store.delete_client(client.id).await.unwrap());
        assert!(store.linked_clients(second.id).await.unwrap().is_empty());
        assert!(!store.delete_client(client.id).await.unwrap());
    }

    #[tokio::test]
    async fn existing_ids_filters_and_dedups() {
        let store = MemoryStore::new();
        let point = store.create_delivery_point(&dock("DP1")).await.unwrap();

        let found = store
            .existing_ids(EntityKind::DeliveryPoint, &[point.id, 42, point.id])
            .await
            .unwrap();
        assert_eq!(found, vec![point.id]);
        assert!(
            store
                .existing_ids(EntityKind::Client, &[point.id])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
