//! Admin command dispatch.
//!
//! Every command goes through the same pipeline: authorize the caller against
//! the configured admin id, check the argument count, run the command and
//! report back. Failures after authorization are logged and forwarded to the
//! admin chat.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::dto::admin_dto::{FileCommandArgs, ManagerCommandArgs, SendMessageArgs};
use crate::dto::telegram_dto::TelegramDocument;
use crate::error::{Error, Result};
use crate::models::vacancy::VacancyStatus;
use crate::services::telegram_service::Messenger;
use crate::services::upload_session_service::{UploadClaim, UploadSessions};
use crate::services::user_data_service::{
    format_extensions, has_allowed_extension, UserDataDirs, PULL_FILE_EXTENSIONS,
    PUSH_FILE_EXTENSIONS,
};
use crate::services::workflow_service::{WorkflowRunner, WorkflowTask};
use crate::utils::time;
use crate::utils::validation::{parse_chat_id, validate};

pub const FAIL_TO_IDENTIFY_USER_AS_ADMIN_TEXT: &str =
    "⛔ Эта команда доступна только администратору.";
pub const FAIL_TECHNICAL_SUPPORT_TEXT: &str =
    "Произошла техническая ошибка. Пожалуйста, обратитесь в техническую поддержку.";

/// Who sent the update: the Telegram user and the chat to answer in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub chat_id: i64,
}

impl Caller {
    pub fn new(user_id: i64, chat_id: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            chat_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminCommand {
    GetUsers,
    AnalyzeCriteria,
    SendCriteria,
    UpdateNegotiations,
    GetFreshResumes,
    AnalyzeResumes,
    UpdateVideoStatus,
    RecommendResumes,
    SendMessage,
    PullFile,
    PushFile,
    CancelPush,
}

impl AdminCommand {
    pub const ALL: [AdminCommand; 12] = [
        AdminCommand::GetUsers,
        AdminCommand::AnalyzeCriteria,
        AdminCommand::SendCriteria,
        AdminCommand::UpdateNegotiations,
        AdminCommand::GetFreshResumes,
        AdminCommand::AnalyzeResumes,
        AdminCommand::UpdateVideoStatus,
        AdminCommand::RecommendResumes,
        AdminCommand::SendMessage,
        AdminCommand::PullFile,
        AdminCommand::PushFile,
        AdminCommand::CancelPush,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AdminCommand::GetUsers => "admin_get_users",
            AdminCommand::AnalyzeCriteria => "admin_analyze_criteria",
            AdminCommand::SendCriteria => "admin_send_criteria",
            AdminCommand::UpdateNegotiations => "admin_update_negotiations",
            AdminCommand::GetFreshResumes => "admin_get_fresh_resumes",
            AdminCommand::AnalyzeResumes => "admin_analyze_resumes",
            AdminCommand::UpdateVideoStatus => "admin_update_video_status",
            AdminCommand::RecommendResumes => "admin_recommend_resumes",
            AdminCommand::SendMessage => "admin_send_message",
            AdminCommand::PullFile => "admin_pull_file",
            AdminCommand::PushFile => "admin_push_file",
            AdminCommand::CancelPush => "admin_cancel_push",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            AdminCommand::GetUsers | AdminCommand::CancelPush => Arity::Exact(0),
            AdminCommand::SendMessage => Arity::AtLeast(2),
            _ => Arity::Exact(1),
        }
    }

    pub fn usage(self) -> String {
        let args = match self {
            AdminCommand::GetUsers | AdminCommand::CancelPush => "",
            AdminCommand::SendMessage => " <user_id> <message_text>",
            AdminCommand::PullFile | AdminCommand::PushFile => " <file_relative_path>",
            _ => " <user_id>",
        };
        format!("/{}{}", self.name(), args)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }

    /// Splits `/command@bot arg1 arg2` into the command and its arguments.
    /// Returns `None` for text that is not an admin command.
    pub fn parse(text: &str) -> Option<(Self, Vec<String>)> {
        let command = Self::from_name(command_name(text)?)?;
        Some((command, text.split_whitespace().skip(1).map(str::to_string).collect()))
    }

    fn manager_task(self, manager_id: String, vacancy: &VacancyStatus) -> Option<WorkflowTask> {
        let task = match self {
            AdminCommand::AnalyzeCriteria => WorkflowTask::DefineSourcingCriteria { manager_id },
            AdminCommand::SendCriteria => WorkflowTask::SendSourcingCriteria { manager_id },
            AdminCommand::UpdateNegotiations => WorkflowTask::SourceNegotiations { manager_id },
            AdminCommand::GetFreshResumes => WorkflowTask::SourceResumes { manager_id },
            AdminCommand::AnalyzeResumes => WorkflowTask::AnalyzeResumes { manager_id },
            AdminCommand::UpdateVideoStatus => WorkflowTask::UpdateVideoStatus {
                manager_id,
                vacancy_id: vacancy.id,
            },
            AdminCommand::RecommendResumes => WorkflowTask::RecommendResumes { manager_id },
            _ => return None,
        };
        Some(task)
    }
}

impl fmt::Display for AdminCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of the bot command that opens `text`, without the slash and any
/// `@bot` suffix.
pub fn command_name(text: &str) -> Option<&str> {
    let head = text.split_whitespace().next()?.strip_prefix('/')?;
    Some(head.split_once('@').map(|(name, _)| name).unwrap_or(head))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Denied,
    InvalidArguments,
    Completed,
    Failed,
    Ignored,
}

/// Record lookups the admin commands depend on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AdminRecords: Send + Sync {
    async fn manager_exists(&self, manager_id: &str) -> bool;

    async fn target_vacancy(&self, manager_id: &str) -> Option<VacancyStatus>;

    async fn list_manager_ids(&self) -> Result<Vec<String>>;
}

enum CommandArgs {
    None,
    Manager(ManagerCommandArgs),
    SendMessage(SendMessageArgs),
    File(FileCommandArgs),
}

impl CommandArgs {
    fn parse(command: AdminCommand, args: &[String]) -> Result<Self> {
        let parsed = match command {
            AdminCommand::GetUsers | AdminCommand::CancelPush => CommandArgs::None,
            AdminCommand::SendMessage => {
                let parsed = SendMessageArgs {
                    chat_id: args[0].clone(),
                    text: args[1..].join(" "),
                };
                validate(&parsed)?;
                parse_chat_id(&parsed.chat_id)?;
                CommandArgs::SendMessage(parsed)
            }
            AdminCommand::PullFile | AdminCommand::PushFile => {
                let parsed = FileCommandArgs {
                    relative_path: args[0].clone(),
                };
                validate(&parsed)?;
                CommandArgs::File(parsed)
            }
            _ => {
                let parsed = ManagerCommandArgs {
                    manager_id: args[0].clone(),
                };
                validate(&parsed)?;
                CommandArgs::Manager(parsed)
            }
        };
        Ok(parsed)
    }
}

/// Vacancy readiness a command needs before its task may be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    DescriptionReceived,
    CriteriaReceived,
    VacancySelected,
    ReadyForAnalysis,
}

impl Requirement {
    fn for_command(command: AdminCommand) -> Self {
        match command {
            AdminCommand::AnalyzeCriteria => Requirement::DescriptionReceived,
            AdminCommand::SendCriteria => Requirement::CriteriaReceived,
            AdminCommand::UpdateNegotiations => Requirement::VacancySelected,
            _ => Requirement::ReadyForAnalysis,
        }
    }

    fn is_met(self, vacancy: &VacancyStatus) -> bool {
        match self {
            Requirement::DescriptionReceived => vacancy.vacancy_description_received,
            Requirement::CriteriaReceived => vacancy.sourcing_criteria_received,
            Requirement::VacancySelected => true,
            Requirement::ReadyForAnalysis => vacancy.ready_for_resume_analysis(),
        }
    }

    fn missing(self, manager_id: &str) -> String {
        match self {
            Requirement::DescriptionReceived => {
                format!("User {} does not have vacancy description received.", manager_id)
            }
            Requirement::CriteriaReceived => {
                format!("User {} does not have sourcing criteria received.", manager_id)
            }
            Requirement::VacancySelected => {
                format!("User {} has not selected a vacancy.", manager_id)
            }
            Requirement::ReadyForAnalysis => format!(
                "User {} does not have enough vacancy data for resume analysis.",
                manager_id
            ),
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    admin_id: Option<String>,
    records: Arc<dyn AdminRecords>,
    workflow: Arc<dyn WorkflowRunner>,
    notifier: Arc<dyn Messenger>,
    data_dirs: UserDataDirs,
    uploads: UploadSessions,
}

impl AdminService {
    pub fn new(
        admin_id: Option<String>,
        records: Arc<dyn AdminRecords>,
        workflow: Arc<dyn WorkflowRunner>,
        notifier: Arc<dyn Messenger>,
        data_dirs: UserDataDirs,
        uploads: UploadSessions,
    ) -> Self {
        Self {
            admin_id,
            records,
            workflow,
            notifier,
            data_dirs,
            uploads,
        }
    }

    pub fn uploads(&self) -> &UploadSessions {
        &self.uploads
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        matches!(&self.admin_id, Some(admin_id) if admin_id == user_id)
    }

    /// Runs one admin command for `caller`, answering through `messenger`.
    pub async fn handle_command(
        &self,
        messenger: &dyn Messenger,
        caller: &Caller,
        command: AdminCommand,
        args: &[String],
    ) -> DispatchOutcome {
        info!(command = command.name(), user_id = %caller.user_id, "Admin command started");

        if !self.is_admin(&caller.user_id) {
            error!(command = command.name(), user_id = %caller.user_id, "Unauthorized admin command");
            self.reply(messenger, caller.chat_id, FAIL_TO_IDENTIFY_USER_AS_ADMIN_TEXT)
                .await;
            return DispatchOutcome::Denied;
        }

        if !command.arity().accepts(args.len()) {
            warn!(command = command.name(), count = args.len(), "Wrong number of arguments");
            let text = format!("Invalid arguments.\nValid: {}", command.usage());
            self.reply(messenger, caller.chat_id, &text).await;
            return DispatchOutcome::InvalidArguments;
        }

        let parsed = match CommandArgs::parse(command, args) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(command = command.name(), error = %e, "Invalid command arguments");
                let text = format!("Invalid arguments: {}\nValid: {}", e, command.usage());
                self.reply(messenger, caller.chat_id, &text).await;
                return DispatchOutcome::InvalidArguments;
            }
        };

        match self.execute(messenger, caller, command, parsed).await {
            Ok(reply) => {
                if let Some(text) = reply {
                    self.reply(messenger, caller.chat_id, &text).await;
                }
                info!(command = command.name(), user_id = %caller.user_id, "Admin command completed");
                DispatchOutcome::Completed
            }
            Err(e) => {
                error!(command = command.name(), user_id = %caller.user_id, error = %e, "Admin command failed");
                if command == AdminCommand::SendMessage {
                    self.reply(messenger, caller.chat_id, FAIL_TECHNICAL_SUPPORT_TEXT)
                        .await;
                }
                self.notify_admin(&format!(
                    "⚠️ Error {}: {}\nAdmin ID: {}",
                    command.name(),
                    e,
                    caller.user_id
                ))
                .await;
                DispatchOutcome::Failed
            }
        }
    }

    /// Handles a document sent to the bot. Only the admin's document that
    /// answers a pending `/admin_push_file` is saved; everything else is ignored.
    pub async fn handle_document(
        &self,
        messenger: &dyn Messenger,
        caller: &Caller,
        document: &TelegramDocument,
    ) -> DispatchOutcome {
        if !self.is_admin(&caller.user_id) {
            debug!(user_id = %caller.user_id, "Document from non-admin ignored");
            return DispatchOutcome::Ignored;
        }

        let pending = match self.uploads.pending(&caller.user_id, time::now()) {
            UploadClaim::Idle => {
                debug!(user_id = %caller.user_id, "No pending upload, document ignored");
                return DispatchOutcome::Ignored;
            }
            UploadClaim::Expired => {
                self.reply_expired(messenger, caller.chat_id).await;
                return DispatchOutcome::Failed;
            }
            UploadClaim::Ready(pending) => pending,
        };

        let file_name = document
            .file_name
            .clone()
            .or_else(|| {
                pending
                    .target
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        if !has_allowed_extension(&file_name, PUSH_FILE_EXTENSIONS) {
            warn!(file_name, "Uploaded document has an invalid extension");
            self.reply(
                messenger,
                caller.chat_id,
                &format!(
                    "❌ Invalid file extension: {}\nValid extensions: {}",
                    file_name,
                    format_extensions(PUSH_FILE_EXTENSIONS)
                ),
            )
            .await;
            return DispatchOutcome::InvalidArguments;
        }

        // One document per session, taken before the download starts.
        let pending = match self.uploads.claim(&caller.user_id, time::now()) {
            UploadClaim::Ready(pending) => pending,
            UploadClaim::Expired => {
                self.reply_expired(messenger, caller.chat_id).await;
                return DispatchOutcome::Failed;
            }
            UploadClaim::Idle => {
                debug!(user_id = %caller.user_id, "Pending upload already taken, document ignored");
                return DispatchOutcome::Ignored;
            }
        };

        info!(file_name, file_id = %document.file_id, target = %pending.target.display(), "Saving uploaded document");
        let result = messenger
            .download_file(&document.file_id, &pending.target)
            .await;

        match result {
            Ok(written) => {
                info!(target = %pending.target.display(), written, "Uploaded document saved");
                self.reply(
                    messenger,
                    caller.chat_id,
                    &format!(
                        "✅ File successfully uploaded!\nPath: {}",
                        self.data_dirs.display_relative(&pending.target)
                    ),
                )
                .await;
                DispatchOutcome::Completed
            }
            Err(e) => {
                error!(user_id = %caller.user_id, error = %e, "Failed to save uploaded document");
                self.reply(
                    messenger,
                    caller.chat_id,
                    &format!("❌ Error uploading file: {}", e),
                )
                .await;
                self.notify_admin(&format!(
                    "⚠️ Error admin_push_file upload: {}\nAdmin ID: {}",
                    e, caller.user_id
                ))
                .await;
                DispatchOutcome::Failed
            }
        }
    }

    async fn execute(
        &self,
        messenger: &dyn Messenger,
        caller: &Caller,
        command: AdminCommand,
        args: CommandArgs,
    ) -> Result<Option<String>> {
        match (command, args) {
            (AdminCommand::GetUsers, _) => {
                let ids = self.records.list_manager_ids().await?;
                Ok(Some(format!("📋 List of users: [{}]", ids.join(", "))))
            }
            (AdminCommand::CancelPush, _) => {
                let text = if self.uploads.cancel(&caller.user_id) {
                    "Pending upload cancelled."
                } else {
                    "No pending upload to cancel."
                };
                Ok(Some(text.to_string()))
            }
            (AdminCommand::SendMessage, CommandArgs::SendMessage(args)) => {
                let chat_id = parse_chat_id(&args.chat_id)?;
                messenger.send_text(chat_id, &args.text).await?;
                info!(admin_id = %caller.user_id, target = chat_id, "Admin message delivered");
                Ok(Some(format!(
                    "✅ Message sent to user {}:\n'{}'",
                    args.chat_id, args.text
                )))
            }
            (AdminCommand::PullFile, CommandArgs::File(args)) => {
                let path = self
                    .data_dirs
                    .resolve_admin_file(&args.relative_path, PULL_FILE_EXTENSIONS)?;
                if !tokio::fs::try_exists(&path).await? {
                    return Err(Error::NotFound(format!(
                        "Invalid file relative path '{}'. File not found",
                        args.relative_path
                    )));
                }
                messenger.send_document(caller.chat_id, &path).await?;
                info!(path = %path.display(), "File sent to admin");
                Ok(None)
            }
            (AdminCommand::PushFile, CommandArgs::File(args)) => {
                let path = self
                    .data_dirs
                    .resolve_admin_file(&args.relative_path, PUSH_FILE_EXTENSIONS)?;
                let pending = self.uploads.begin(&caller.user_id, path, time::now());
                Ok(Some(format!(
                    "📤 Ready to receive file.\nTarget path: {}\n\nPlease send the file as a document ({}). Expires at {}.",
                    args.relative_path,
                    format_extensions(PUSH_FILE_EXTENSIONS),
                    pending.expires_at.format("%H:%M:%S UTC")
                )))
            }
            (command, CommandArgs::Manager(args)) => {
                self.queue_manager_task(command, args.manager_id).await
            }
            (command, _) => Err(Error::Internal(format!(
                "Unexpected arguments for {}",
                command.name()
            ))),
        }
    }

    async fn queue_manager_task(
        &self,
        command: AdminCommand,
        manager_id: String,
    ) -> Result<Option<String>> {
        if !self.records.manager_exists(&manager_id).await {
            return Err(Error::NotFound(format!(
                "User {} not found in records.",
                manager_id
            )));
        }

        let requirement = Requirement::for_command(command);
        let vacancy = self
            .records
            .target_vacancy(&manager_id)
            .await
            .filter(|vacancy| requirement.is_met(vacancy))
            .ok_or_else(|| Error::BadRequest(requirement.missing(&manager_id)))?;

        let task = command
            .manager_task(manager_id.clone(), &vacancy)
            .ok_or_else(|| Error::Internal(format!("{} has no workflow task", command.name())))?;
        let task_name = task.name();
        self.workflow.run(task).await?;

        Ok(Some(format!(
            "Task {} is queued for user {} (vacancy {}).",
            task_name, manager_id, vacancy.id
        )))
    }

    async fn reply_expired(&self, messenger: &dyn Messenger, chat_id: i64) {
        self.reply(
            messenger,
            chat_id,
            &format!(
                "⌛ Upload session expired. Please run {} again.",
                AdminCommand::PushFile.usage()
            ),
        )
        .await;
    }

    async fn reply(&self, messenger: &dyn Messenger, chat_id: i64, text: &str) {
        if let Err(e) = messenger.send_text(chat_id, text).await {
            error!(chat_id, error = %e, "Failed to send reply");
        }
    }

    async fn notify_admin(&self, text: &str) {
        let Some(admin_chat) = self
            .admin_id
            .as_deref()
            .and_then(|id| parse_chat_id(id).ok())
        else {
            warn!("Admin chat is not configured, notification dropped");
            return;
        };
        if let Err(e) = self.notifier.send_text(admin_chat, text).await {
            error!(error = %e, "Failed to notify admin");
        }
    }
}
