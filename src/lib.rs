pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    admin_service::AdminService,
    manager_service::ManagerService,
    telegram_service::{BotRegistry, BotRole},
    upload_session_service::UploadSessions,
    user_data_service::UserDataDirs,
    workflow_service::WorkflowQueue,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub manager_service: ManagerService,
    pub data_dirs: UserDataDirs,
    pub admin_service: Arc<AdminService>,
    pub bots: BotRegistry,
    pub webhook_secret: Option<String>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, bots: BotRegistry) -> Result<Self> {
        let notifier = bots
            .get(BotRole::Manager)
            .ok_or_else(|| Error::Config("Manager bot is not configured".to_string()))?;

        let data_dirs = UserDataDirs::new(config.users_data_dir.clone());
        let manager_service = ManagerService::new(pool.clone());

        let admin_service = AdminService::new(
            config.admin_id.clone(),
            Arc::new(manager_service.clone()),
            Arc::new(WorkflowQueue::new(pool.clone())),
            notifier,
            data_dirs.clone(),
            UploadSessions::from_secs(config.upload_session_ttl_secs),
        );

        Ok(Self {
            pool,
            manager_service,
            data_dirs,
            admin_service: Arc::new(admin_service),
            bots,
            webhook_secret: config.telegram_webhook_secret.clone(),
        })
    }
}
