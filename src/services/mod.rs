pub mod admin_service;
pub mod manager_service;
pub mod record_service;
pub mod resume_service;
pub mod telegram_service;
pub mod upload_session_service;
pub mod user_data_service;
pub mod vacancy_service;
pub mod workflow_service;
