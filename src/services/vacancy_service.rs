use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::models::record_kind::RecordKind;
use crate::models::vacancy::{Vacancy, VacancyStatus};
use crate::services::record_service::{PgQuery, RecordService, WriteOutcome};

const VACANCY_COLUMNS: &str = "id, manager_id, name, vacancy_description_received, sourcing_criteria_received, description_json, sourcing_criteria_json, created_at, updated_at";

/// Vacancies are keyed by the job board's numeric id, which the generic
/// column accessor refuses, so their writes live here.
#[derive(Clone)]
pub struct VacancyService {
    pool: PgPool,
    records: RecordService,
}

impl VacancyService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            records: RecordService::new(pool.clone()),
            pool,
        }
    }

    pub async fn create_if_absent(
        &self,
        vacancy_id: i64,
        manager_id: &str,
        name: Option<&str>,
    ) -> Result<bool> {
        let query = sqlx::query(
            r#"
            INSERT INTO vacancies (id, manager_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(vacancy_id)
        .bind(manager_id)
        .bind(name);

        let record_id = vacancy_id.to_string();
        let inserted = self
            .records
            .execute_write(RecordKind::Vacancy, &record_id, query)
            .await?
            > 0;
        if inserted {
            info!(vacancy_id, manager_id, "Vacancy created");
        } else {
            debug!(vacancy_id, manager_id, "Vacancy already exists");
        }
        Ok(inserted)
    }

    pub async fn get(&self, vacancy_id: i64) -> Result<Option<Vacancy>> {
        let sql = format!("SELECT {} FROM vacancies WHERE id = $1", VACANCY_COLUMNS);
        let vacancy = sqlx::query_as::<_, Vacancy>(&sql)
            .bind(vacancy_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vacancy)
    }

    /// The vacancy the manager selected most recently, if any.
    pub async fn target_for_manager(&self, manager_id: &str) -> Option<VacancyStatus> {
        let result = sqlx::query_as::<_, VacancyStatus>(
            r#"
            SELECT id, name, vacancy_description_received, sourcing_criteria_received
            FROM vacancies
            WHERE manager_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(manager_id)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(status) => status,
            Err(e) => {
                error!(manager_id, error = %e, "Failed to look up target vacancy");
                None
            }
        }
    }

    pub async fn save_description(&self, vacancy_id: i64, description: JsonValue) -> Result<WriteOutcome> {
        let query = sqlx::query(
            r#"
            UPDATE vacancies
            SET description_json = $1, vacancy_description_received = TRUE, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(description)
        .bind(vacancy_id);
        self.write(vacancy_id, query).await
    }

    pub async fn save_sourcing_criteria(&self, vacancy_id: i64, criteria: JsonValue) -> Result<WriteOutcome> {
        let query = sqlx::query(
            r#"
            UPDATE vacancies
            SET sourcing_criteria_json = $1, sourcing_criteria_received = TRUE, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(criteria)
        .bind(vacancy_id);
        self.write(vacancy_id, query).await
    }

    async fn write(
        &self,
        vacancy_id: i64,
        query: PgQuery<'_>,
    ) -> Result<WriteOutcome> {
        let record_id = vacancy_id.to_string();
        let rows = self
            .records
            .execute_write(RecordKind::Vacancy, &record_id, query)
            .await?;
        if rows == 0 {
            debug!(vacancy_id, "Vacancy update matched no record");
            return Ok(WriteOutcome::NoMatchingRecord);
        }
        Ok(WriteOutcome::Applied)
    }
}
