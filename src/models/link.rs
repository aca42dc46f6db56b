use std::fmt;

use serde::Deserialize;

/// The two record types that can sit on either end of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Client,
    DeliveryPoint,
}

impl EntityKind {
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Client => "Clients",
            EntityKind::DeliveryPoint => "Delivery points",
        }
    }

    /// Lower-case form for use mid-sentence.
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::DeliveryPoint => "delivery point",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Client => f.write_str("Client"),
            EntityKind::DeliveryPoint => f.write_str("Delivery point"),
        }
    }
}

/// One row of the client/delivery point association. The pair is unordered in
/// meaning; the fields just fix which id is which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Link {
    pub client_id: i32,
    pub delivery_point_id: i32,
}

/// Body of `POST /clients/{id}/delivery-points`.
#[derive(Deserialize, Debug, Clone)]
pub struct DeliveryPointIds {
    pub delivery_point_ids: Vec<i32>,
}

/// Body of `POST /delivery-points/{id}/clients`.
#[derive(Deserialize, Debug, Clone)]
pub struct ClientIds {
    pub client_ids: Vec<i32>,
}
