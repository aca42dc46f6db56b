use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_present, require_text};
use crate::error::{Error, Result};

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct DeliveryPoint {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a delivery point. Coordinates are not accepted here;
/// they can only be filled in later through an update.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewDeliveryPoint {
    pub name: String,
    pub address: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl NewDeliveryPoint {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        require_text("address", &self.address)?;
        require_text("state", &self.state)?;
        require_text("zip", &self.zip)?;
        validate_country(&self.country)
    }

    /// Country codes are stored upper-cased.
    pub fn normalized(mut self) -> Self {
        self.country = self.country.trim().to_ascii_uppercase();
        self
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct DeliveryPointUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub longitude: Option<Option<f64>>,
}

impl DeliveryPointUpdate {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("address", &self.address),
            ("state", &self.state),
            ("zip", &self.zip),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }
        if let Some(country) = &self.country {
            validate_country(country)?;
        }
        if let Some(Some(latitude)) = self.latitude {
            validate_range("latitude", latitude, 90.0)?;
        }
        if let Some(Some(longitude)) = self.longitude {
            validate_range("longitude", longitude, 180.0)?;
        }
        Ok(())
    }

    pub fn apply(&self, point: &mut DeliveryPoint, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            point.name = name.clone();
        }
        if let Some(address) = &self.address {
            point.address = address.clone();
        }
        if let Some(state) = &self.state {
            point.state = state.clone();
        }
        if let Some(zip) = &self.zip {
            point.zip = zip.clone();
        }
        if let Some(country) = &self.country {
            point.country = country.trim().to_ascii_uppercase();
        }
        if let Some(latitude) = self.latitude {
            point.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            point.longitude = longitude;
        }
        point.updated_at = now;
    }
}

fn validate_country(country: &str) -> Result<()> {
    let country = country.trim();
    if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "country must be a 2-letter code, got {country:?}"
        )))
    }
}

fn validate_range(field: &str, value: f64, bound: f64) -> Result<()> {
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "{field} must be between -{bound} and {bound}"
        )))
    }
}
