use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:8080";
pub const DEFAULT_USERS_DATA_DIR: &str = "/users_data";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_UPLOAD_SESSION_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Telegram user id of the single administrator. Admin commands are denied when unset.
    pub admin_id: Option<String>,
    pub users_data_dir: PathBuf,
    pub manager_bot_token: String,
    pub applicant_bot_token: Option<String>,
    pub consultant_bot_token: Option<String>,
    pub telegram_webhook_secret: Option<String>,
    /// Public base URL; webhooks are registered with Telegram only when it is set.
    pub webapp_url: Option<String>,
    pub upload_session_ttl_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_optional("SERVER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            database_url: database_url_from_env()?,
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            admin_id: get_env_optional("ADMIN_ID"),
            users_data_dir: get_env_optional("USERS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_USERS_DATA_DIR)),
            manager_bot_token: get_env("MANAGER_BOT_TOKEN")?,
            applicant_bot_token: get_env_optional("APPLICANT_BOT_TOKEN"),
            consultant_bot_token: get_env_optional("CONSULTANT_BOT_TOKEN"),
            telegram_webhook_secret: get_env_optional("TELEGRAM_WEBHOOK_SECRET"),
            webapp_url: get_env_optional("WEBAPP_URL"),
            upload_session_ttl_secs: get_env_parse_or(
                "UPLOAD_SESSION_TTL_SECS",
                DEFAULT_UPLOAD_SESSION_TTL_SECS,
            )?,
        })
    }
}

/// Reads `DATABASE_URL` on its own, for tools that need the database but none of the bot settings.
pub fn database_url_from_env() -> Result<String> {
    dotenv().ok();
    get_env("DATABASE_URL").map(|raw| normalize_database_url(&raw))
}

/// Connection strings pasted from hosting dashboards sometimes carry whitespace or a trailing `%`.
pub fn normalize_database_url(raw: &str) -> String {
    raw.trim().trim_end_matches('%').to_string()
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
