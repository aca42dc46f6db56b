#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

use where2now::api::{AppState, router};
use where2now::db::{MemoryStore, Store};
use where2now::models::{
    Client, ClientUpdate, DeliveryPoint, DeliveryPointUpdate, EntityKind, Link, LogEntry,
    NewClient, NewDeliveryPoint, NewLogEntry,
};
use where2now::{Error, Result};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn Store>,
}

pub struct Reply {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn detail(&self) -> String {
        self.json()["detail"].as_str().unwrap_or_default().to_string()
    }

    pub fn ids(&self) -> Vec<i64> {
        self.json()
            .as_array()
            .expect("expected a JSON array")
            .iter()
            .map(|item| item["id"].as_i64().unwrap())
            .collect()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        Self {
            router: router(AppState::new(store.clone())),
            store,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response: Response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        Reply {
            status,
            request_id,
            body,
        }
    }

    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> Reply {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> Reply {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> Reply {
        self.call(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> Reply {
        self.call(Method::DELETE, uri, None).await
    }

    pub async fn create_client(&self, name: &str) -> i64 {
        let reply = self
            .post("/api/clients/", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.json()["id"].as_i64().unwrap()
    }

    pub async fn create_delivery_point(&self, name: &str) -> i64 {
        let reply = self
            .post(
                "/api/delivery-points/",
                serde_json::json!({
                    "name": name,
                    "address": "123 Main St",
                    "state": "CA",
                    "zip": "90210",
                    "country": "US",
                }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.json()["id"].as_i64().unwrap()
    }
}

/// A store whose backend is unreachable: every call fails the way an
/// exhausted connection pool does.
pub struct UnreachableStore;

fn offline<T>() -> Result<T> {
    Err(Error::Storage(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl Store for UnreachableStore {
    async fn create_client(&self, _new: &NewClient) -> Result<Client> {
        offline()
    }
    async fn get_client(&self, _id: i32) -> Result<Option<Client>> {
        offline()
    }
    async fn list_clients(&self) -> Result<Vec<Client>> {
        offline()
    }
    async fn update_client(&self, _id: i32, _update: &ClientUpdate) -> Result<Option<Client>> {
        offline()
    }
    async fn delete_client(&self, _id: i32) -> Result<bool> {
        offline()
    }

    async fn create_delivery_point(&self, _new: &NewDeliveryPoint) -> Result<DeliveryPoint> {
        offline()
    }
    async fn get_delivery_point(&self, _id: i32) -> Result<Option<DeliveryPoint>> {
        offline()
    }
    async fn list_delivery_points(&self) -> Result<Vec<DeliveryPoint>> {
        offline()
    }
    async fn update_delivery_point(
        &self,
        _id: i32,
        _update: &DeliveryPointUpdate,
    ) -> Result<Option<DeliveryPoint>> {
        offline()
    }
    async fn delete_delivery_point(&self, _id: i32) -> Result<bool> {
        offline()
    }

    async fn existing_ids(&self, _kind: EntityKind, _ids: &[i32]) -> Result<Vec<i32>> {
        offline()
    }
    async fn linked_delivery_points(&self, _client_id: i32) -> Result<Vec<DeliveryPoint>> {
        offline()
    }
    async fn linked_clients(&self, _delivery_point_id: i32) -> Result<Vec<Client>> {
        offline()
    }
    async fn is_linked(&self, _link: Link) -> Result<bool> {
        offline()
    }
    async fn add_links(&self, _links: &[Link]) -> Result<()> {
        offline()
    }
    async fn remove_link(&self, _link: Link) -> Result<bool> {
        offline()
    }

    async fn insert_log_entry(&self, _entry: &NewLogEntry) -> Result<()> {
        offline()
    }
    async fn list_log_entries(&self) -> Result<Vec<LogEntry>> {
        offline()
    }

    async fn ping(&self) -> Result<()> {
        offline()
    }
}
