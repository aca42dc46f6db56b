//! Clients, delivery points and the many-to-many links between them, served
//! over HTTP on top of Postgres.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;

pub use error::{Error, Result};
