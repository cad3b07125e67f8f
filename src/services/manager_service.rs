use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::manager::{Manager, ManagerProfile};
use crate::models::record_kind::{ColumnValue, RecordKind};
use crate::models::vacancy::VacancyStatus;
use crate::services::admin_service::AdminRecords;
use crate::services::record_service::{RecordService, WriteOutcome};
use crate::services::vacancy_service::VacancyService;
use crate::utils::time;
use crate::utils::validation::is_numeric_id;

const MANAGER_COLUMNS: &str = "id, username, first_name, last_name, first_time_seen, privacy_policy_confirmed, privacy_policy_confirmation_time, access_token_received, access_token, access_token_expires_at, hh_data, created_at, updated_at";

#[derive(Clone)]
pub struct ManagerService {
    pool: PgPool,
    records: RecordService,
    vacancies: VacancyService,
}

impl ManagerService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            records: RecordService::new(pool.clone()),
            vacancies: VacancyService::new(pool.clone()),
            pool,
        }
    }

    /// First contact from a manager: creates the record if needed and fills
    /// in the Telegram profile fields that are present. Returns `true` when
    /// the manager is new.
    pub async fn register_contact(&self, manager_id: &str, profile: &ManagerProfile) -> Result<bool> {
        if !is_numeric_id(manager_id) {
            return Err(Error::BadRequest(format!(
                "Invalid manager id: {}",
                manager_id
            )));
        }

        let created = self
            .records
            .create_record_if_absent(RecordKind::Manager, manager_id)
            .await?;

        let mut updates = BTreeMap::new();
        for (field, value) in [
            ("username", &profile.username),
            ("first_name", &profile.first_name),
            ("last_name", &profile.last_name),
        ] {
            if let Some(value) = value {
                updates.insert(field, ColumnValue::Text(value.clone()));
            }
        }
        if !updates.is_empty() {
            self.records
                .update_column_value(RecordKind::Manager, manager_id, &updates)
                .await?;
        }

        if created {
            info!(manager_id, username = ?profile.username, "New manager registered");
        }
        Ok(created)
    }

    pub async fn get(&self, manager_id: &str) -> Result<Option<Manager>> {
        let sql = format!("SELECT {} FROM managers WHERE id = $1", MANAGER_COLUMNS);
        let manager = sqlx::query_as::<_, Manager>(&sql)
            .bind(manager_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(manager)
    }

    /// Removes the manager together with their vacancies and resumes.
    pub async fn delete(&self, manager_id: &str) -> Result<bool> {
        let query = sqlx::query("DELETE FROM managers WHERE id = $1").bind(manager_id);
        let deleted = self
            .records
            .execute_write(RecordKind::Manager, manager_id, query)
            .await?
            > 0;
        if deleted {
            info!(manager_id, "Manager deleted");
        }
        Ok(deleted)
    }

    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM managers ORDER BY first_time_seen NULLS LAST, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn exists(&self, manager_id: &str) -> bool {
        self.records.record_exists(RecordKind::Manager, manager_id).await
    }

    /// Employer id from the stored job board profile, if the manager has
    /// authorized and the profile carries one.
    pub async fn employer_id(&self, manager_id: &str) -> Option<String> {
        let hh_data = self
            .records
            .get_column_value(RecordKind::Manager, manager_id, "hh_data")
            .await?;
        hh_data.as_json().and_then(employer_id_from_hh_data)
    }

    pub async fn confirm_privacy_policy(&self, manager_id: &str) -> Result<WriteOutcome> {
        let updates = BTreeMap::from([
            ("privacy_policy_confirmed", ColumnValue::Boolean(true)),
            (
                "privacy_policy_confirmation_time",
                ColumnValue::Timestamp(time::now()),
            ),
        ]);
        self.records
            .update_column_value(RecordKind::Manager, manager_id, &updates)
            .await
    }

    pub async fn store_access_token(
        &self,
        manager_id: &str,
        access_token: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
        hh_data: Option<JsonValue>,
    ) -> Result<WriteOutcome> {
        let mut updates = BTreeMap::from([
            ("access_token", ColumnValue::Text(access_token.to_string())),
            ("access_token_received", ColumnValue::Boolean(true)),
            ("access_token_expires_at", ColumnValue::Timestamp(expires_at)),
        ]);
        if let Some(hh_data) = hh_data {
            updates.insert("hh_data", ColumnValue::Json(hh_data));
        }

        let outcome = self
            .records
            .update_column_value(RecordKind::Manager, manager_id, &updates)
            .await?;
        if outcome != WriteOutcome::Applied {
            warn!(manager_id, ?outcome, "Access token was not stored");
        }
        Ok(outcome)
    }
}

#[async_trait]
impl AdminRecords for ManagerService {
    async fn manager_exists(&self, manager_id: &str) -> bool {
        self.exists(manager_id).await
    }

    async fn target_vacancy(&self, manager_id: &str) -> Option<VacancyStatus> {
        self.vacancies.target_for_manager(manager_id).await
    }

    async fn list_manager_ids(&self) -> Result<Vec<String>> {
        self.list_ids().await
    }
}

/// `employer.id` of a job board `/me` payload; the API has returned it both
/// as a string and as a number.
pub fn employer_id_from_hh_data(hh_data: &JsonValue) -> Option<String> {
    match hh_data.get("employer")?.get("id")? {
        JsonValue::String(id) if !id.is_empty() => Some(id.clone()),
        JsonValue::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn employer_id_accepts_string_and_number() {
        assert_eq!(
            employer_id_from_hh_data(&json!({"employer": {"id": "4521"}})),
            Some("4521".to_string())
        );
        assert_eq!(
            employer_id_from_hh_data(&json!({"employer": {"id": 4521}})),
            Some("4521".to_string())
        );
    }

    #[test]
    fn employer_id_is_absent_without_employer() {
        assert_eq!(employer_id_from_hh_data(&json!({"first_name": "Anna"})), None);
        assert_eq!(employer_id_from_hh_data(&json!({"employer": null})), None);
        assert_eq!(employer_id_from_hh_data(&json!({"employer": {"id": ""}})), None);
    }
}
