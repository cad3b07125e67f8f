use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Manager {
    pub id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub first_time_seen: Option<DateTime<Utc>>,
    pub privacy_policy_confirmed: bool,
    pub privacy_policy_confirmation_time: Option<DateTime<Utc>>,
    pub access_token_received: bool,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub hh_data: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields taken from the Telegram account on first contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}
