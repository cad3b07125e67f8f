use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use subtle::ConstantTimeEq;

use crate::dto::telegram_dto::{TelegramMessage, TelegramUpdate};
use crate::error::{Error, Result};
use crate::services::admin_service::{command_name, AdminCommand, Caller};
use crate::services::telegram_service::{BotRole, Messenger};
use crate::AppState;

pub const SECRET_TOKEN_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

const MANAGER_WELCOME_TEXT: &str =
    "Здравствуйте! Я помогу с подбором кандидатов на вашу вакансию.";
const MANAGER_WELCOME_BACK_TEXT: &str = "С возвращением! Продолжим работу с вашей вакансией.";

pub async fn handle_webhook(
    State(state): State<AppState>,
    Path(role): Path<BotRole>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> Result<StatusCode> {
    verify_secret(state.webhook_secret.as_deref(), &headers)?;
    let messenger = state
        .bots
        .get(role)
        .ok_or_else(|| Error::NotFound(format!("Bot {} is not configured", role)))?;

    tracing::debug!(role = %role, update_id = update.update_id, "Received Telegram update");
    if let Some(message) = update.message {
        handle_message(&state, role, messenger.as_ref(), message).await;
    }

    Ok(StatusCode::OK)
}

fn verify_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let provided = headers
        .get(SECRET_TOKEN_HEADER)
        .map(|value| value.as_bytes())
        .unwrap_or_default();
    if bool::from(provided.ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        tracing::warn!("Rejected Telegram update with an invalid secret token");
        Err(Error::Unauthorized("Invalid webhook secret".to_string()))
    }
}

async fn handle_message(
    state: &AppState,
    role: BotRole,
    messenger: &dyn Messenger,
    message: TelegramMessage,
) {
    let Some(from) = message.from.as_ref() else {
        tracing::debug!(message_id = message.message_id, "Message without sender ignored");
        return;
    };
    let caller = Caller::new(from.id, message.chat.id);

    if let Some(document) = &message.document {
        state
            .admin_service
            .handle_document(messenger, &caller, document)
            .await;
        return;
    }

    let Some(text) = message.text.as_deref() else {
        return;
    };

    if let Some((command, args)) = AdminCommand::parse(text) {
        state
            .admin_service
            .handle_command(messenger, &caller, command, &args)
            .await;
        return;
    }

    if role == BotRole::Manager && command_name(text) == Some("start") {
        let reply = match state
            .manager_service
            .register_contact(&caller.user_id, &from.profile())
            .await
        {
            Ok(true) => MANAGER_WELCOME_TEXT,
            Ok(false) => MANAGER_WELCOME_BACK_TEXT,
            Err(e) => {
                tracing::error!(user_id = %caller.user_id, error = %e, "Failed to register manager");
                return;
            }
        };
        if let Err(e) = messenger.send_text(caller.chat_id, reply).await {
            tracing::warn!(chat_id = caller.chat_id, error = %e, "Failed to send welcome message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn secret_is_optional() {
        assert!(verify_secret(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn secret_must_match_exactly() {
        let mut headers = HeaderMap::new();
        assert!(verify_secret(Some("s3cret"), &headers).is_err());

        headers.insert(SECRET_TOKEN_HEADER, HeaderValue::from_static("s3cre"));
        assert!(verify_secret(Some("s3cret"), &headers).is_err());

        headers.insert(SECRET_TOKEN_HEADER, HeaderValue::from_static("s3cret"));
        assert!(verify_secret(Some("s3cret"), &headers).is_ok());
    }
}
