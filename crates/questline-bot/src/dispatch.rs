// Update dispatch.
//
// Every inbound interaction lands here: the registration gate runs first
// (mirroring the original middleware), then commands, conversation steps,
// and button callbacks are routed. Callback routing is an exhaustive match
// over the closed `CallbackPayload` enum, so a new interaction kind cannot
// be added without the compiler pointing at this file.
//
// No per-session state is kept for mini-game runs; their entire state
// rides in the callback token. The only in-process state is the multi-step
// conversations (registration, game authoring), which the original kept in
// its FSM storage.

use std::collections::HashMap;
use std::sync::Arc;

use questline_core::transport::MessageRef;
use questline_core::{
    CallbackPayload, ChatTransport, Config, EventDetail, QuestlineError, Result, Role, User,
};
use questline_catalog::CatalogClient;
use questline_gigachat::GigaChatClient;
use questline_storage::Database;
use tokio::sync::RwLock;

use crate::handlers;

/// A normalized inbound interaction
#[derive(Debug, Clone)]
pub enum Incoming {
    Command {
        user_id: i64,
        chat_id: i64,
        name: String,
    },
    Text {
        user_id: i64,
        chat_id: i64,
        text: String,
    },
    Callback {
        user_id: i64,
        callback_id: String,
        token: String,
        message: MessageRef,
    },
}

/// In-flight multi-step conversation state, keyed by user id
#[derive(Debug, Clone)]
pub enum Conversation {
    AwaitingName,
    AwaitingRole { full_name: String },
    AuthorCheckpoints { event: EventDetail },
    AuthorQuestions {
        event: EventDetail,
        checkpoints: Vec<String>,
    },
}

#[derive(Clone)]
pub struct BotApp {
    pub db: Database,
    pub transport: Arc<dyn ChatTransport>,
    pub catalog: CatalogClient,
    pub generator: Option<GigaChatClient>,
    pub config: Config,
    conversations: Arc<RwLock<HashMap<i64, Conversation>>>,
}

impl BotApp {
    pub fn new(
        db: Database,
        transport: Arc<dyn ChatTransport>,
        catalog: CatalogClient,
        generator: Option<GigaChatClient>,
        config: Config,
    ) -> Self {
        Self {
            db,
            transport,
            catalog,
            generator,
            config,
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn conversation(&self, user_id: i64) -> Option<Conversation> {
        self.conversations.read().await.get(&user_id).cloned()
    }

    pub async fn set_conversation(&self, user_id: i64, state: Conversation) {
        self.conversations.write().await.insert(user_id, state);
    }

    pub async fn clear_conversation(&self, user_id: i64) {
        self.conversations.write().await.remove(&user_id);
    }

    /// Handle one normalized update. Never returns an error: everything in
    /// the taxonomy maps to a user-facing reply here.
    pub async fn dispatch(&self, incoming: Incoming) {
        match incoming {
            Incoming::Command {
                user_id,
                chat_id,
                name,
            } => {
                tracing::info!(user_id, command = %name, "inbound command");
                if let Err(error) = self.on_command(user_id, chat_id, &name).await {
                    self.report_to_chat(chat_id, error).await;
                }
            }
            Incoming::Text {
                user_id,
                chat_id,
                text,
            } => {
                tracing::info!(user_id, kind = "text", "inbound message");
                if let Err(error) = self.on_text(user_id, chat_id, &text).await {
                    self.report_to_chat(chat_id, error).await;
                }
            }
            Incoming::Callback {
                user_id,
                callback_id,
                token,
                message,
            } => {
                tracing::info!(user_id, token = %token, "inbound callback");
                if let Err(error) = self.on_callback(user_id, &callback_id, &token, message).await
                {
                    log_error(&error);
                    let reply = user_reply(&error);
                    if let Err(error) = self
                        .transport
                        .answer_callback(&callback_id, Some(&reply))
                        .await
                    {
                        tracing::warn!(%error, "failed to answer callback");
                    }
                }
            }
        }
    }

    async fn on_command(&self, user_id: i64, chat_id: i64, name: &str) -> Result<()> {
        let user = self.db.get_user(user_id).await?;

        let Some(user) = user else {
            if name == "register" {
                return handlers::registration::start(self, user_id, chat_id).await;
            }
            return self.gate_reply(chat_id).await;
        };

        match name {
            "register" => handlers::registration::already_registered(self, chat_id).await,
            "start" => handlers::catalog::cmd_start(self, &user, chat_id).await,
            "me" => handlers::profile::cmd_me(self, &user, chat_id).await,
            "checkpoints" => handlers::minigames::cmd_checkpoints(self, &user, chat_id).await,
            "quiz" => handlers::minigames::cmd_quiz(self, &user, chat_id).await,
            "cancel" => handlers::authoring::cmd_cancel(self, &user, chat_id).await,
            _ => self.fallback_reply(chat_id).await,
        }
    }

    async fn on_text(&self, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
        let user = self.db.get_user(user_id).await?;
        let conversation = self.conversation(user_id).await;

        match (user, conversation) {
            (None, Some(Conversation::AwaitingName)) => {
                handlers::registration::on_name(self, user_id, chat_id, text).await
            }
            (None, Some(Conversation::AwaitingRole { full_name })) => {
                handlers::registration::on_role(self, user_id, chat_id, &full_name, text).await
            }
            (None, _) => self.gate_reply(chat_id).await,
            (Some(user), Some(Conversation::AuthorCheckpoints { event })) => {
                handlers::authoring::on_checkpoints_input(self, &user, chat_id, &event, text)
                    .await
            }
            (Some(user), Some(Conversation::AuthorQuestions { event, checkpoints })) => {
                handlers::authoring::on_questions_input(
                    self,
                    &user,
                    chat_id,
                    &event,
                    checkpoints,
                    text,
                )
                .await
            }
            // A registration conversation can't outlive registration itself.
            (Some(_), Some(_)) => {
                self.clear_conversation(user_id).await;
                self.fallback_reply(chat_id).await
            }
            (Some(_), None) => self.fallback_reply(chat_id).await,
        }
    }

    async fn on_callback(
        &self,
        user_id: i64,
        callback_id: &str,
        token: &str,
        message: MessageRef,
    ) -> Result<()> {
        let Some(user) = self.db.get_user(user_id).await? else {
            self.gate_reply(message.chat_id).await?;
            return self.transport.answer_callback(callback_id, None).await;
        };

        match CallbackPayload::decode(token)? {
            CallbackPayload::CatalogPage { page } => {
                handlers::catalog::on_page(self, &user, message, page).await?;
            }
            CallbackPayload::EventInfo {
                event_id,
                from_page,
            } => {
                handlers::catalog::on_event_info(self, &user, message, &event_id, from_page)
                    .await?;
            }
            CallbackPayload::Join { event_id } => {
                self.require_role(&user, Role::Participant)?;
                handlers::catalog::on_join(self, &user, message, &event_id).await?;
            }
            CallbackPayload::AuthorGame { event_id } => {
                self.require_role(&user, Role::Organizer)?;
                handlers::authoring::on_author_game(self, &user, message, &event_id).await?;
            }
            CallbackPayload::CheckpointListPage { page } => {
                handlers::minigames::on_checkpoint_list_page(self, &user, message, page).await?;
            }
            CallbackPayload::QuizListPage { page } => {
                handlers::minigames::on_quiz_list_page(self, &user, message, page).await?;
            }
            CallbackPayload::Checkpoint(state) => {
                self.require_role(&user, Role::Participant)?;
                return handlers::minigames::on_checkpoint(
                    self, &user, callback_id, message, state,
                )
                .await;
            }
            CallbackPayload::Quiz(state) => {
                self.require_role(&user, Role::Participant)?;
                return handlers::minigames::on_quiz(self, &user, callback_id, message, state)
                    .await;
            }
        }

        self.transport.answer_callback(callback_id, None).await
    }

    fn require_role(&self, user: &User, role: Role) -> Result<()> {
        if user.role == role {
            Ok(())
        } else {
            Err(QuestlineError::validation(
                "This action is not available for your role.",
            ))
        }
    }

    async fn gate_reply(&self, chat_id: i64) -> Result<()> {
        self.transport
            .send_message(chat_id, "You are not registered yet. Send /register.", None)
            .await?;
        Ok(())
    }

    async fn fallback_reply(&self, chat_id: i64) -> Result<()> {
        self.transport
            .send_message(
                chat_id,
                "Sorry, I didn't understand that. Pick a command from the menu or send /start.",
                None,
            )
            .await?;
        Ok(())
    }

    async fn report_to_chat(&self, chat_id: i64, error: QuestlineError) {
        log_error(&error);
        let reply = user_reply(&error);
        if let Err(error) = self.transport.send_message(chat_id, &reply, None).await {
            tracing::warn!(%error, "failed to send error reply");
        }
    }
}

fn log_error(error: &QuestlineError) {
    match error {
        QuestlineError::Internal(_) => tracing::error!(%error, "handler failed"),
        _ => tracing::debug!(%error, "handler rejected interaction"),
    }
}

/// Map the error taxonomy to what the user sees
pub fn user_reply(error: &QuestlineError) -> String {
    match error {
        QuestlineError::MalformedToken(_) => {
            "Sorry, I didn't understand that. Pick a command from the menu or send /start."
                .to_string()
        }
        QuestlineError::UnknownEventGame(_) => "That event can't be found anymore.".to_string(),
        QuestlineError::SourceUnavailable(_) => {
            "The event catalog is unavailable right now. Please try again.".to_string()
        }
        QuestlineError::GenerationFailed(_) => {
            "The draft couldn't be generated. Try again or write the content yourself."
                .to_string()
        }
        QuestlineError::Validation(hint) => hint.clone(),
        QuestlineError::Internal(_) => "Something went wrong. Please try again.".to_string(),
    }
}
