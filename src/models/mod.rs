mod client;
mod delivery_point;
mod link;
mod log_entry;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

pub use client::{Client, ClientUpdate, NewClient};
pub use delivery_point::{DeliveryPoint, DeliveryPointUpdate, NewDeliveryPoint};
pub use link::{ClientIds, DeliveryPointIds, EntityKind, Link};
pub use log_entry::{LogEntry, NewLogEntry};

/// Maps a field that is present in the payload to `Some`, even when its value
/// is `null`. Combined with `#[serde(default)]`, an absent field stays `None`.
fn deserialize_present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
