use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resume {
    pub id: String,
    pub vacancy_id: i64,
    pub manager_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub ai_analysis: Option<JsonValue>,
    pub resume_sorting_status: String,
    pub link_to_tg_bot_sent: bool,
    pub resume_video_received: bool,
    pub resume_video_path: Option<String>,
    pub resume_recommended: bool,
    pub resume_accepted: Option<bool>,
    pub interview_invitation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
