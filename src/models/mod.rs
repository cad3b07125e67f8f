pub mod manager;
pub mod record_kind;
pub mod resume;
pub mod vacancy;
pub mod workflow_job;
