use std::collections::BTreeMap;
use std::path::PathBuf;

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::record_kind::{ColumnValue, RecordKind};
use crate::models::resume::Resume;
use crate::services::record_service::{RecordService, WriteOutcome};
use crate::services::user_data_service::{DataSubdir, UserDataDirs};

const RESUME_COLUMNS: &str = "id, vacancy_id, manager_id, first_name, last_name, phone, email, ai_analysis, resume_sorting_status, link_to_tg_bot_sent, resume_video_received, resume_video_path, resume_recommended, resume_accepted, interview_invitation_sent, created_at, updated_at";

#[derive(Clone)]
pub struct ResumeService {
    pool: PgPool,
    records: RecordService,
    data_dirs: UserDataDirs,
}

impl ResumeService {
    pub fn new(pool: PgPool, data_dirs: UserDataDirs) -> Self {
        Self {
            records: RecordService::new(pool.clone()),
            pool,
            data_dirs,
        }
    }

    /// Creates the resume under `vacancy_id`, owned by that vacancy's manager.
    /// Returns `false` when a resume with this id already exists.
    pub async fn create_if_absent(&self, resume_id: &str, vacancy_id: i64) -> Result<bool> {
        if !self
            .records
            .record_exists(RecordKind::Vacancy, &vacancy_id.to_string())
            .await
        {
            return Err(Error::NotFound(format!("Vacancy {} not found", vacancy_id)));
        }

        let query = sqlx::query(
            r#"
            INSERT INTO resumes (id, vacancy_id, manager_id)
            SELECT $1, v.id, v.manager_id
            FROM vacancies v
            WHERE v.id = $2
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(resume_id)
        .bind(vacancy_id);

        let inserted = self
            .records
            .execute_write(RecordKind::Resume, resume_id, query)
            .await?
            > 0;
        if inserted {
            info!(resume_id, vacancy_id, "Resume created");
        } else {
            debug!(resume_id, vacancy_id, "Resume already exists");
        }
        Ok(inserted)
    }

    pub async fn get(&self, resume_id: &str) -> Result<Option<Resume>> {
        let sql = format!("SELECT {} FROM resumes WHERE id = $1", RESUME_COLUMNS);
        let resume = sqlx::query_as::<_, Resume>(&sql)
            .bind(resume_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(resume)
    }

    /// Reserves `videos/<resume_id>.<extension>` for the applicant's video and
    /// marks the resume as having one. The caller writes the file.
    pub async fn attach_video(&self, resume_id: &str, extension: &str) -> Result<PathBuf> {
        let path = self
            .data_dirs
            .record_file_path(DataSubdir::Videos, resume_id, extension)
            .await?;

        let updates = BTreeMap::from([
            ("resume_video_received", ColumnValue::Boolean(true)),
            (
                "resume_video_path",
                ColumnValue::Text(path.display().to_string()),
            ),
        ]);
        match self
            .records
            .update_column_value(RecordKind::Resume, resume_id, &updates)
            .await?
        {
            WriteOutcome::Applied => {
                info!(resume_id, path = %path.display(), "Resume video attached");
                Ok(path)
            }
            WriteOutcome::NoMatchingRecord => {
                Err(Error::NotFound(format!("Resume {} not found", resume_id)))
            }
            outcome => {
                warn!(resume_id, ?outcome, "Resume video update was not applied");
                Err(Error::Internal(format!(
                    "Failed to record video for resume {}",
                    resume_id
                )))
            }
        }
    }
}
