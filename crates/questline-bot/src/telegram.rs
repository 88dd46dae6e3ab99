// Telegram Bot API transport.
//
// Implements `ChatTransport` over the HTTP Bot API and exposes long-poll
// update fetching for the dispatch loop. Messages go out with HTML parse
// mode; incoming updates are normalized into the closed `Incoming` type
// before any handler sees them.

use anyhow::anyhow;
use questline_core::transport::{
    Button, ChatTransport, CommandSpec, Keyboard, Markup, MessageRef,
};
use questline_core::{QuestlineError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dispatch::Incoming;

const API_BASE: &str = "https://api.telegram.org";
/// Long-poll wait, seconds
const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUpdate {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    message_id: i64,
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgCallbackQuery {
    id: String,
    from: TgUser,
    message: Option<TgMessage>,
    data: Option<String>,
}

#[derive(Debug, Serialize)]
struct TgCommand<'a> {
    command: &'a str,
    description: &'a str,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Long-poll the next batch of updates, normalized. Returns each
    /// update's id (for the next poll offset) with its normalized form;
    /// updates we don't handle (stickers, joins, ...) still advance the
    /// offset but yield no `Incoming`.
    pub async fn poll_updates(&self, offset: i64) -> Result<Vec<(i64, Option<Incoming>)>> {
        let raw: Vec<TgUpdate> = self
            .call(
                "getUpdates",
                json!({ "offset": offset, "timeout": POLL_TIMEOUT_SECS }),
            )
            .await?;

        Ok(raw
            .into_iter()
            .map(|update| {
                let incoming = normalize(&update);
                (update.update_id, incoming)
            })
            .collect())
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, body: Value) -> Result<T> {
        let url = format!("{}/bot{}/{method}", self.base_url, self.token);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuestlineError::Internal(anyhow!("telegram {method}: {e}")))?;

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| QuestlineError::Internal(anyhow!("telegram {method}: {e}")))?;

        if !envelope.ok {
            return Err(QuestlineError::Internal(anyhow!(
                "telegram {method}: {}",
                envelope.description.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        envelope
            .result
            .ok_or_else(|| QuestlineError::Internal(anyhow!("telegram {method}: empty result")))
    }

    fn markup_json(markup: &Markup) -> Value {
        match markup {
            Markup::Inline(keyboard) => inline_keyboard_json(keyboard),
            Markup::Reply(rows) => json!({
                "keyboard": rows
                    .iter()
                    .map(|row| row.iter().map(|text| json!({ "text": text })).collect::<Vec<_>>())
                    .collect::<Vec<_>>(),
                "resize_keyboard": true,
            }),
            Markup::RemoveReply => json!({ "remove_keyboard": true }),
        }
    }
}

fn inline_keyboard_json(keyboard: &Keyboard) -> Value {
    json!({
        "inline_keyboard": keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|Button { label, token }| {
                        json!({ "text": label, "callback_data": token })
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    })
}

fn normalize(update: &TgUpdate) -> Option<Incoming> {
    if let Some(message) = &update.message {
        let user_id = message.from.as_ref()?.id;
        let text = message.text.clone()?;
        let incoming = match text.strip_prefix('/') {
            // "/start", "/start args", and the "/start@botname" group form
            // all route by the bare command name.
            Some(command) => Incoming::Command {
                user_id,
                chat_id: message.chat.id,
                name: command
                    .split_whitespace()
                    .next()?
                    .split('@')
                    .next()?
                    .to_string(),
            },
            None => Incoming::Text {
                user_id,
                chat_id: message.chat.id,
                text,
            },
        };
        return Some(incoming);
    }

    if let Some(query) = &update.callback_query {
        let message = query.message.as_ref()?;
        return Some(Incoming::Callback {
            user_id: query.from.id,
            callback_id: query.id.clone(),
            token: query.data.clone()?,
            message: MessageRef {
                chat_id: message.chat.id,
                message_id: message.message_id,
            },
        });
    }

    None
}

#[async_trait::async_trait]
impl ChatTransport for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> Result<MessageRef> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(markup) = &markup {
            body["reply_markup"] = Self::markup_json(markup);
        }

        let sent: TgMessage = self.call("sendMessage", body).await?;
        Ok(MessageRef {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = &keyboard {
            body["reply_markup"] = inline_keyboard_json(keyboard);
        }

        // editMessageText returns either the edited message or `true`;
        // we only care that the call was accepted.
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn delete_message(&self, message: MessageRef) -> Result<()> {
        let _: Value = self
            .call(
                "deleteMessage",
                json!({
                    "chat_id": message.chat_id,
                    "message_id": message.message_id,
                }),
            )
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[CommandSpec]) -> Result<()> {
        let commands: Vec<TgCommand> = commands
            .iter()
            .map(|spec| TgCommand {
                command: spec.command,
                description: spec.description,
            })
            .collect();
        let _: Value = self
            .call("setMyCommands", json!({ "commands": commands }))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}
