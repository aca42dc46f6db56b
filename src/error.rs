//! Error types shared by the store, the services and the HTTP layer.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::EntityKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The entity addressed by the request does not exist.
    #[error("{0} not found.")]
    NotFound(EntityKind),

    /// Some of the ids named in a link request do not exist. `ids` is sorted.
    #[error("{} not found: {ids:?}.", .kind.plural())]
    MissingPeers { kind: EntityKind, ids: Vec<i32> },

    /// Unlink named a pair that is not currently linked.
    #[error("{peer} not associated with {}.", .owner.noun())]
    NotAssociated { owner: EntityKind, peer: EntityKind },

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound(_) | Error::MissingPeers { .. } | Error::NotAssociated { .. } => {
                StatusCode::NOT_FOUND
            }
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Storage(_) | Error::Migration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
