use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::workflow_job::WorkflowJob;

/// Long-running pipeline steps that the admin can trigger for a manager.
/// They are executed by the workers that consume the `workflow_jobs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum WorkflowTask {
    DefineSourcingCriteria { manager_id: String },
    SendSourcingCriteria { manager_id: String },
    SourceNegotiations { manager_id: String },
    SourceResumes { manager_id: String },
    AnalyzeResumes { manager_id: String },
    UpdateVideoStatus { manager_id: String, vacancy_id: i64 },
    RecommendResumes { manager_id: String },
}

impl WorkflowTask {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowTask::DefineSourcingCriteria { .. } => "define_sourcing_criteria",
            WorkflowTask::SendSourcingCriteria { .. } => "send_sourcing_criteria",
            WorkflowTask::SourceNegotiations { .. } => "source_negotiations",
            WorkflowTask::SourceResumes { .. } => "source_resumes",
            WorkflowTask::AnalyzeResumes { .. } => "analyze_resumes",
            WorkflowTask::UpdateVideoStatus { .. } => "update_video_status",
            WorkflowTask::RecommendResumes { .. } => "recommend_resumes",
        }
    }

    pub fn manager_id(&self) -> &str {
        match self {
            WorkflowTask::DefineSourcingCriteria { manager_id }
            | WorkflowTask::SendSourcingCriteria { manager_id }
            | WorkflowTask::SourceNegotiations { manager_id }
            | WorkflowTask::SourceResumes { manager_id }
            | WorkflowTask::AnalyzeResumes { manager_id }
            | WorkflowTask::UpdateVideoStatus { manager_id, .. }
            | WorkflowTask::RecommendResumes { manager_id } => manager_id,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn run(&self, task: WorkflowTask) -> Result<()>;
}

impl WorkflowJob {
    pub fn task(&self) -> Result<WorkflowTask> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[derive(Clone)]
pub struct WorkflowQueue {
    pool: PgPool,
}

impl WorkflowQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, task: &WorkflowTask) -> Result<Uuid> {
        let payload = serde_json::to_value(task)?;
        let row = sqlx::query(
            r#"
            INSERT INTO workflow_jobs (task, manager_id, payload)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(task.name())
        .bind(task.manager_id())
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        let id: Uuid = row.try_get("id")?;
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<WorkflowJob> {
        let job = sqlx::query_as::<_, WorkflowJob>(
            r#"
            SELECT id, task, manager_id, payload, status, error, created_at, started_at, finished_at
            FROM workflow_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    /// Moves the oldest pending job to `running` and returns it. Concurrent
    /// workers never receive the same job.
    pub async fn claim_next(&self) -> Result<Option<WorkflowJob>> {
        let job = sqlx::query_as::<_, WorkflowJob>(
            r#"
            UPDATE workflow_jobs SET status = 'running', started_at = NOW()
            WHERE id = (
                SELECT id FROM workflow_jobs WHERE status = 'pending'
                ORDER BY created_at ASC FOR UPDATE SKIP LOCKED LIMIT 1
            )
            RETURNING id, task, manager_id, payload, status, error, created_at, started_at, finished_at
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn finish(&self, id: Uuid, outcome: std::result::Result<(), String>) -> Result<()> {
        let (status, error_message) = match outcome {
            Ok(()) => ("done", None),
            Err(message) => {
                error!(job_id = %id, error = %message, "Workflow job failed");
                ("failed", Some(message))
            }
        };
        let result = sqlx::query(
            "UPDATE workflow_jobs SET status = $1, error = $2, finished_at = NOW() WHERE id = $3",
        )
        .bind(status)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Workflow job {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowRunner for WorkflowQueue {
    async fn run(&self, task: WorkflowTask) -> Result<()> {
        let id = self.enqueue(&task).await?;
        info!(job_id = %id, task = task.name(), manager_id = task.manager_id(), "Workflow job queued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tasks_serialize_with_a_tag() {
        let task = WorkflowTask::UpdateVideoStatus {
            manager_id: "7853115214".to_string(),
            vacancy_id: 120_334_455,
        };
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({
                "task": "update_video_status",
                "manager_id": "7853115214",
                "vacancy_id": 120_334_455
            })
        );
        assert_eq!(task.name(), "update_video_status");
    }

    #[test]
    fn job_payload_decodes_back_to_the_task() {
        let job = WorkflowJob {
            id: Uuid::new_v4(),
            task: "analyze_resumes".to_string(),
            manager_id: "42".to_string(),
            payload: json!({"task": "analyze_resumes", "manager_id": "42"}),
            status: "pending".to_string(),
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
        };
        assert_eq!(
            job.task().unwrap(),
            WorkflowTask::AnalyzeResumes {
                manager_id: "42".to_string()
            }
        );
    }
}
