use chrono::{DateTime, Utc};

/// Every stored timestamp is UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
