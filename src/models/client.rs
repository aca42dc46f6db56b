use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{deserialize_present, require_text};
use crate::error::Result;

#[derive(sqlx::FromRow, Serialize, Debug, Clone, PartialEq)]
pub struct Client {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a client.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewClient {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)
    }
}

/// Partial update. `None` leaves the stored value alone; for the nullable
/// columns `Some(None)` clears it.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ClientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub phone: Option<Option<String>>,
}

impl ClientUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        Ok(())
    }

    /// Merge the supplied fields into `client` and stamp `updated_at`.
    pub fn apply(&self, client: &mut Client, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(email) = &self.email {
            client.email = email.clone();
        }
        if let Some(phone) = &self.phone {
            client.phone = phone.clone();
        }
        client.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn sample() -> Client {
        let at = Utc::now();
        Client {
            id: 1,
            name: "Acme".to_string(),
            email: Some("ops@acme.test".to_string()),
            phone: Some("555".to_string()),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn update_leaves_absent_fields_untouched() {
        let update: ClientUpdate = serde_json::from_str(r#"{"phone": "777"}"#).unwrap();
        let mut client = sample();
        let later = client.updated_at + chrono::Duration::seconds(1);
        update.apply(&mut client, later);

        assert_eq!(client.name, "Acme");
        assert_eq!(client.email.as_deref(), Some("ops@acme.test"));
        assert_eq!(client.phone.as_deref(), Some("777"));
        assert_eq!(client.updated_at, later);
    }

    #[test]
    fn explicit_null_clears_nullable_field() {
        let update: ClientUpdate = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(update.email, Some(None));
        assert!(update.phone.is_none());

        let mut client = sample();
        update.apply(&mut client, Utc::now());
        assert!(client.email.is_none());
        assert_eq!(client.phone.as_deref(), Some("555"));
    }

    #[test]
    fn null_name_is_treated_as_absent() {
        let update: ClientUpdate = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert!(update.name.is_none());
        assert!(update.validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let new = NewClient {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert!(matches!(new.validate(), Err(Error::Validation(_))));

        let update = ClientUpdate {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(update.validate(), Err(Error::Validation(_))));
    }
}
