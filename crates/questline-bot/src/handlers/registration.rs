// Registration: a two-step conversation assigning display name and role.

use questline_core::transport::Markup;
use questline_core::{Result, Role};

use crate::dispatch::{BotApp, Conversation};

pub const PARTICIPANT_LABEL: &str = "Participant";
pub const ORGANIZER_LABEL: &str = "Organizer";

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Participant => PARTICIPANT_LABEL,
        Role::Organizer => ORGANIZER_LABEL,
    }
}

pub async fn start(app: &BotApp, user_id: i64, chat_id: i64) -> Result<()> {
    app.set_conversation(user_id, Conversation::AwaitingName).await;
    app.transport
        .send_message(
            chat_id,
            "Hello! Let's get you registered.\n\nSend your name.",
            None,
        )
        .await?;
    Ok(())
}

pub async fn already_registered(app: &BotApp, chat_id: i64) -> Result<()> {
    app.transport
        .send_message(chat_id, "You are already registered. Send /start.", None)
        .await?;
    Ok(())
}

pub async fn on_name(app: &BotApp, user_id: i64, chat_id: i64, text: &str) -> Result<()> {
    let full_name = text.trim().to_string();
    app.set_conversation(user_id, Conversation::AwaitingRole { full_name })
        .await;
    app.transport
        .send_message(
            chat_id,
            &format!("<b>{}, nice to meet you!</b>\n\nChoose your role.", text.trim()),
            Some(Markup::Reply(vec![
                vec![PARTICIPANT_LABEL.to_string()],
                vec![ORGANIZER_LABEL.to_string()],
            ])),
        )
        .await?;
    Ok(())
}

pub async fn on_role(
    app: &BotApp,
    user_id: i64,
    chat_id: i64,
    full_name: &str,
    text: &str,
) -> Result<()> {
    let role = match text.trim() {
        PARTICIPANT_LABEL => Some(Role::Participant),
        ORGANIZER_LABEL => Some(Role::Organizer),
        _ => None,
    };

    let Some(role) = role else {
        app.transport
            .send_message(
                chat_id,
                "That role isn't on the list. Choose one of the buttons.",
                None,
            )
            .await?;
        return Ok(());
    };

    app.db.create_user(user_id, full_name, role.as_str()).await?;
    app.clear_conversation(user_id).await;
    tracing::info!(user_id, role = role.as_str(), "user registered");

    app.transport
        .send_message(
            chat_id,
            "Thanks for registering! Send /start.",
            Some(Markup::RemoveReply),
        )
        .await?;
    Ok(())
}
