use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vacancy {
    pub id: i64,
    pub manager_id: String,
    pub name: Option<String>,
    pub vacancy_description_received: bool,
    pub sourcing_criteria_received: bool,
    pub description_json: Option<JsonValue>,
    pub sourcing_criteria_json: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pipeline readiness of the vacancy a manager is currently working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VacancyStatus {
    pub id: i64,
    pub name: Option<String>,
    pub vacancy_description_received: bool,
    pub sourcing_criteria_received: bool,
}

impl VacancyStatus {
    pub fn ready_for_resume_analysis(&self) -> bool {
        self.vacancy_description_received && self.sourcing_criteria_received
    }
}
