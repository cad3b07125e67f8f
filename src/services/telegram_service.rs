use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Outbound side of a bot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_document(&self, chat_id: i64, path: &Path) -> Result<()>;

    /// Downloads a file the user sent to the bot into `destination`,
    /// returning the number of bytes written.
    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    description: Option<String>,
    result: Option<T>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self, method: &str) -> Result<T> {
        if !self.ok {
            return Err(Error::Telegram(format!(
                "{} failed: {}",
                method,
                self.description.unwrap_or_else(|| "no description".to_string())
            )));
        }
        self.result
            .ok_or_else(|| Error::Telegram(format!("{} returned no result", method)))
    }
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookInfo {
    #[serde(default)]
    url: String,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
    api_base: String,
}

impl fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(token, TELEGRAM_API_BASE)
    }

    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_base, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;
        let parsed: TelegramResponse<T> = response.json().await?;
        parsed.into_result(method)
    }

    /// Points the bot's webhook at `url` unless it already is.
    pub async fn ensure_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let current: WebhookInfo = self.call("getWebhookInfo", json!({})).await?;
        if current.url == url {
            info!(url, "Telegram webhook is already up to date");
            return Ok(());
        }

        info!(from = %current.url, to = url, "Updating Telegram webhook");
        let mut body = json!({ "url": url });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", body).await?;
        info!(url, "Telegram webhook registered successfully");
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        debug!(chat_id, "Sending Telegram message");
        let _: serde_json::Value = self
            .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("document")
            .to_string();
        let data = tokio::fs::read(path).await?;
        debug!(chat_id, file_name, size = data.len(), "Sending Telegram document");

        let form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", multipart::Part::bytes(data).file_name(file_name));
        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let parsed: TelegramResponse<serde_json::Value> = response.json().await?;
        parsed.into_result("sendDocument")?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str, destination: &Path) -> Result<u64> {
        let file: TelegramFile = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| Error::Telegram(format!("getFile returned no path for {}", file_id)))?;

        let mut response = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await? {
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;

        debug!(file_id, destination = %destination.display(), written, "Telegram file downloaded");
        Ok(written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotRole {
    Manager,
    Applicant,
    Consultant,
}

impl BotRole {
    pub const ALL: [BotRole; 3] = [BotRole::Manager, BotRole::Applicant, BotRole::Consultant];

    pub fn as_str(self) -> &'static str {
        match self {
            BotRole::Manager => "manager",
            BotRole::Applicant => "applicant",
            BotRole::Consultant => "consultant",
        }
    }
}

impl fmt::Display for BotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a client for every bot that has a token. The manager bot is mandatory.
pub fn telegram_clients(config: &Config) -> Result<Vec<(BotRole, TelegramClient)>> {
    let mut clients = vec![(
        BotRole::Manager,
        TelegramClient::new(config.manager_bot_token.clone())?,
    )];
    for (role, token) in [
        (BotRole::Applicant, &config.applicant_bot_token),
        (BotRole::Consultant, &config.consultant_bot_token),
    ] {
        if let Some(token) = token {
            clients.push((role, TelegramClient::new(token.clone())?));
        }
    }
    Ok(clients)
}

/// Registers `<base_url>/api/webhook/telegram/<role>` for every bot.
/// Failures are logged and do not stop the others.
pub async fn register_webhooks(
    clients: &[(BotRole, TelegramClient)],
    base_url: &str,
    secret: Option<&str>,
) {
    let base_url = base_url.trim_end_matches('/');
    for (role, client) in clients {
        let url = format!("{}/api/webhook/telegram/{}", base_url, role);
        if let Err(e) = client.ensure_webhook(&url, secret).await {
            warn!(role = %role, error = %e, "Failed to register Telegram webhook");
        }
    }
}

#[derive(Clone, Default)]
pub struct BotRegistry {
    bots: HashMap<BotRole, Arc<dyn Messenger>>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clients(clients: Vec<(BotRole, TelegramClient)>) -> Self {
        clients
            .into_iter()
            .fold(Self::new(), |registry, (role, client)| {
                registry.with_bot(role, Arc::new(client))
            })
    }

    pub fn with_bot(mut self, role: BotRole, messenger: Arc<dyn Messenger>) -> Self {
        self.bots.insert(role, messenger);
        self
    }

    pub fn get(&self, role: BotRole) -> Option<Arc<dyn Messenger>> {
        self.bots.get(&role).cloned()
    }
}
