mod memory;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    Client, ClientUpdate, DeliveryPoint, DeliveryPointUpdate, EntityKind, Link, LogEntry,
    NewClient, NewDeliveryPoint, NewLogEntry,
};

pub use memory::MemoryStore;

/// Persistence for clients, delivery points and the association between them.
///
/// Each method is one atomic unit: either all of its writes land or none do.
/// Lookups that miss return `None`/`false` rather than an error; deciding
/// whether a miss is a caller-visible failure is left to the services.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_client(&self, new: &NewClient) -> Result<Client>;
    async fn get_client(&self, id: i32) -> Result<Option<Client>>;
    async fn list_clients(&self) -> Result<Vec<Client>>;
    async fn update_client(&self, id: i32, update: &ClientUpdate) -> Result<Option<Client>>;
    /// Removes the client together with its links. Returns `false` if it did not exist.
    async fn delete_client(&self, id: i32) -> Result<bool>;

    async fn create_delivery_point(&self, new: &NewDeliveryPoint) -> Result<DeliveryPoint>;
    async fn get_delivery_point(&self, id: i32) -> Result<Option<DeliveryPoint>>;
    async fn list_delivery_points(&self) -> Result<Vec<DeliveryPoint>>;
    async fn update_delivery_point(
        &self,
        id: i32,
        update: &DeliveryPointUpdate,
    ) -> Result<Option<DeliveryPoint>>;
    async fn delete_delivery_point(&self, id: i32) -> Result<bool>;

    /// The subset of `ids` that name existing records of `kind`.
    async fn existing_ids(&self, kind: EntityKind, ids: &[i32]) -> Result<Vec<i32>>;

    /// Delivery points linked to a client, ordered by id.
    async fn linked_delivery_points(&self, client_id: i32) -> Result<Vec<DeliveryPoint>>;
    /// Clients linked to a delivery point, ordered by id.
    async fn linked_clients(&self, delivery_point_id: i32) -> Result<Vec<Client>>;

    async fn is_linked(&self, link: Link) -> Result<bool>;
    /// Inserts every pair in one transaction. Pairs already present are skipped.
    /// If any pair names a record that no longer exists nothing is inserted
    /// and the missing ids come back as [`Error::MissingPeers`], clients first.
    async fn add_links(&self, links: &[Link]) -> Result<()>;
    /// Returns `false` if the pair was not linked.
    async fn remove_link(&self, link: Link) -> Result<bool>;

    async fn insert_log_entry(&self, entry: &NewLogEntry) -> Result<()>;
    async fn list_log_entries(&self) -> Result<Vec<LogEntry>>;

    /// Round-trip to the backend, used by the health check.
    async fn ping(&self) -> Result<()>;
}

/// Open the store selected by `config.database_url`. Postgres stores are
/// migrated unless `migrate` is false.
pub async fn init(config: &Config, migrate: bool) -> Result<Arc<dyn Store>> {
    if config.uses_memory_store() {
        tracing::info!("using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = Database::new(config).await?;
    if migrate {
        db.migrate().await?;
    }
    Ok(Arc::new(db))
}

/// Postgres-backed store
pub struct Database {
    pool: PgPool,
}

const CLIENT_COLUMNS: &str = "id, name, email, phone, created_at, updated_at";
const DELIVERY_POINT_COLUMNS: &str =
    "id, name, address, state, zip, country, latitude, longitude, created_at, updated_at";

/// The error `add_links` reports when `links` refers to records that do not
/// exist, or `None` when every endpoint is present.
pub(crate) fn dangling_links(
    links: &[Link],
    clients: &BTreeSet<i32>,
    delivery_points: &BTreeSet<i32>,
) -> Option<Error> {
    let missing_clients: BTreeSet<i32> = links
        .iter()
        .map(|link| link.client_id)
        .filter(|id| !clients.contains(id))
        .collect();
    if !missing_clients.is_empty() {
        return Some(Error::MissingPeers {
            kind: EntityKind::Client,
            ids: missing_clients.into_iter().collect(),
        });
    }

    let missing_points: BTreeSet<i32> = links
        .iter()
        .map(|link| link.delivery_point_id)
        .filter(|id| !delivery_points.contains(id))
        .collect();
    if !missing_points.is_empty() {
        return Some(Error::MissingPeers {
            kind: EntityKind::DeliveryPoint,
            ids: missing_points.into_iter().collect(),
        });
    }
    None
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Work out which endpoints of `links` are gone after a foreign key violation.
    async fn missing_endpoints(&self, links: &[Link]) -> Result<Option<Error>> {
        let client_ids: Vec<i32> = links.iter().map(|link| link.client_id).collect();
        let point_ids: Vec<i32> = links.iter().map(|link| link.delivery_point_id).collect();
        let clients = self.existing_ids(EntityKind::Client, &client_ids).await?;
        let points = self
            .existing_ids(EntityKind::DeliveryPoint, &point_ids)
            .await?;

        Ok(dangling_links(
            links,
            &clients.into_iter().collect(),
            &points.into_iter().collect(),
        ))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Store for Database {
    // Client operations
    async fn create_client(&self, new: &NewClient) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (name, email, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .bind(Utc::now())
        .fetch_one(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn get_client(&self, id: i32) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id ASC"
        ))
        .fetch_all(self.get_pool())
        .await?;

        Ok(clients)
    }

    async fn update_client(&self, id: i32, update: &ClientUpdate) -> Result<Option<Client>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut client) = current else {
            return Ok(None);
        };
        update.apply(&mut client, Utc::now());

        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = $1, email = $2, phone = $3, updated_at = $4
            WHERE id = $5
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(client))
    }

    async fn delete_client(&self, id: i32) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM client_delivery_points WHERE client_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }

    // Delivery point operations
    async fn create_delivery_point(&self, new: &NewDeliveryPoint) -> Result<DeliveryPoint> {
        let point = sqlx::query_as::<_, DeliveryPoint>(&format!(
            r#"
            INSERT INTO delivery_points (name, address, state, zip, country, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {DELIVERY_POINT_COLUMNS}
            "#
        ))
        .bind(&new.name)
        .bind(&new.address)
        .bind(&new.state)
        .bind(&new.zip)
        .bind(&new.country)
        .bind(Utc::now())
        .fetch_one(self.get_pool())
        .await?;

        Ok(point)
    }

    async fn get_delivery_point(&self, id: i32) -> Result<Option<DeliveryPoint>> {
        let point = sqlx::query_as::<_, DeliveryPoint>(&format!(
            "SELECT {DELIVERY_POINT_COLUMNS} FROM delivery_points WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(point)
    }

    async fn list_delivery_points(&self) -> Result<Vec<DeliveryPoint>> {
        let points = sqlx::query_as::<_, DeliveryPoint>(&format!(
            "SELECT {DELIVERY_POINT_COLUMNS} FROM delivery_points ORDER BY id ASC"
        ))
        .fetch_all(self.get_pool())
        .await?;

        Ok(points)
    }

    async fn update_delivery_point(
        &self,
        id: i32,
        update: &DeliveryPointUpdate,
    ) -> Result<Option<DeliveryPoint>> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, DeliveryPoint>(&format!(
            "SELECT {DELIVERY_POINT_COLUMNS} FROM delivery_points WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut point) = current else {
            return Ok(None);
        };
        update.apply(&mut point, Utc::now());

        let point = sqlx::query_as::<_, DeliveryPoint>(&format!(
            r#"
            UPDATE delivery_points
            SET name = $1, address = $2, state = $3, zip = $4, country = $5,
                latitude = $6, longitude = $7, updated_at = $8
            WHERE id = $9
            RETURNING {DELIVERY_POINT_COLUMNS}
            "#
        ))
        .bind(&point.name)
        .bind(&point.address)
        .bind(&point.state)
        .bind(&point.zip)
        .bind(&point.country)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(point.updated_at)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(point))
    }

    async fn delete_delivery_point(&self, id: i32) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM client_delivery_points WHERE delivery_point_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM delivery_points WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }

    // Association operations
    async fn existing_ids(&self, kind: EntityKind, ids: &[i32]) -> Result<Vec<i32>> {
        let sql = match kind {
            EntityKind::Client => "SELECT id FROM clients WHERE id = ANY($1) ORDER BY id",
            EntityKind::DeliveryPoint => {
                "SELECT id FROM delivery_points WHERE id = ANY($1) ORDER BY id"
            }
        };
        let found = sqlx::query_scalar::<_, i32>(sql)
            .bind(ids)
            .fetch_all(self.get_pool())
            .await?;

        Ok(found)
    }

    async fn linked_delivery_points(&self, client_id: i32) -> Result<Vec<DeliveryPoint>> {
        let points = sqlx::query_as::<_, DeliveryPoint>(
            r#"
            SELECT dp.id, dp.name, dp.address, dp.state, dp.zip, dp.country,
                   dp.latitude, dp.longitude, dp.created_at, dp.updated_at
            FROM delivery_points dp
            JOIN client_delivery_points cdp ON cdp.delivery_point_id = dp.id
            WHERE cdp.client_id = $1
            ORDER BY dp.id ASC
            "#,
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(points)
    }

    async fn linked_clients(&self, delivery_point_id: i32) -> Result<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            r#"
            SELECT c.id, c.name, c.email, c.phone, c.created_at, c.updated_at
            FROM clients c
            JOIN client_delivery_points cdp ON cdp.client_id = c.id
            WHERE cdp.delivery_point_id = $1
            ORDER BY c.id ASC
            "#,
        )
        .bind(delivery_point_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(clients)
    }

    async fn is_linked(&self, link: Link) -> Result<bool> {
        let linked = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM client_delivery_points
                WHERE client_id = $1 AND delivery_point_id = $2
            )
            "#,
        )
        .bind(link.client_id)
        .bind(link.delivery_point_id)
        .fetch_one(self.get_pool())
        .await?;

        Ok(linked)
    }

    async fn add_links(&self, links: &[Link]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for link in links {
            let inserted = sqlx::query(
                r#"
                INSERT INTO client_delivery_points (client_id, delivery_point_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(link.client_id)
            .bind(link.delivery_point_id)
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                if !is_foreign_key_violation(&err) {
                    return Err(err.into());
                }
                tx.rollback().await?;
                return Err(self.missing_endpoints(links).await?.unwrap_or(err.into()));
            }
        }

        tx.commit().await?;

        Ok(())
    }

    async fn remove_link(&self, link: Link) -> Result<bool> {
        let removed = sqlx::query(
            "DELETE FROM client_delivery_points WHERE client_id = $1 AND delivery_point_id = $2",
        )
        .bind(link.client_id)
        .bind(link.delivery_point_id)
        .execute(self.get_pool())
        .await?
        .rows_affected();

        Ok(removed > 0)
    }

    // Log entries
    async fn insert_log_entry(&self, entry: &NewLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO log_entries (created_at, level, logger_name, message, context)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.created_at)
        .bind(&entry.level)
        .bind(&entry.logger_name)
        .bind(&entry.message)
        .bind(&entry.context)
        .execute(self.get_pool())
        .await?;

        Ok(())
    }

    async fn list_log_entries(&self) -> Result<Vec<LogEntry>> {
        let entries = sqlx::query_as::<_, LogEntry>(
            "SELECT id, created_at, level, logger_name, message, context FROM log_entries ORDER BY id ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.get_pool()).await?;
        Ok(())
    }
}
