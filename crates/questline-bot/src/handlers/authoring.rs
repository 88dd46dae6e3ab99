// Organizer game authoring: a two-phase conversation (checkpoints, then
// questions), each phase accepting typed content or a generator draft.
//
// Validation failures reject the input with a correction hint and leave the
// conversation exactly where it was; only a successful parse advances it.

use questline_core::authoring::{parse_checkpoints, parse_questions};
use questline_core::transport::{Markup, MessageRef};
use questline_core::{EventDetail, Question, Result, User};
use questline_gigachat::{draft_checkpoints, draft_questions};
use questline_storage::CreateEventGame;

use crate::dispatch::{BotApp, Conversation};

pub const DRAFT_CHECKPOINTS_LABEL: &str = "✨ Draft checkpoints";
pub const DRAFT_QUESTIONS_LABEL: &str = "✨ Draft questions";

pub async fn on_author_game(
    app: &BotApp,
    user: &User,
    message: MessageRef,
    event_id: &str,
) -> Result<()> {
    let event = app.catalog.event_detail(event_id).await?;
    tracing::info!(user_id = user.user_id, event_id, "authoring started");

    app.transport
        .send_message(
            message.chat_id,
            &format!(
                "Event: <b>{}</b>\n\nSend the checkpoints a participant must pass, one \
                 per line. Each passed checkpoint earns the participant +1 point.\n\n\
                 To cancel, send /cancel.",
                event.title
            ),
            Some(Markup::Reply(vec![vec![DRAFT_CHECKPOINTS_LABEL.to_string()]])),
        )
        .await?;

    app.set_conversation(user.user_id, Conversation::AuthorCheckpoints { event })
        .await;
    app.transport.delete_message(message).await
}

pub async fn cmd_cancel(app: &BotApp, user: &User, chat_id: i64) -> Result<()> {
    let text = match app.conversation(user.user_id).await {
        Some(Conversation::AuthorCheckpoints { .. }) => {
            "Cancelled checkpoint entry and game authoring. /start"
        }
        Some(Conversation::AuthorQuestions { .. }) => {
            "Cancelled question entry and game authoring. /start"
        }
        _ => "Nothing to cancel.",
    };
    app.clear_conversation(user.user_id).await;
    app.transport
        .send_message(chat_id, text, Some(Markup::RemoveReply))
        .await?;
    Ok(())
}

pub async fn on_checkpoints_input(
    app: &BotApp,
    user: &User,
    chat_id: i64,
    event: &EventDetail,
    text: &str,
) -> Result<()> {
    if text == DRAFT_CHECKPOINTS_LABEL {
        let Some(generator) = &app.generator else {
            return generation_unavailable(app, chat_id).await;
        };
        app.transport
            .send_message(chat_id, "One moment, please...", None)
            .await?;
        let draft = draft_checkpoints(generator, &event.title, &event.description).await?;
        app.transport
            .send_message(
                chat_id,
                &format!(
                    "Here is a draft of the checkpoints:\n\n<code>{}</code>\n\n\
                     Use it as a base and send us the final checkpoints in a reply, \
                     or press the button to draft again.",
                    draft.join("\n")
                ),
                None,
            )
            .await?;
        return Ok(());
    }

    let checkpoints = parse_checkpoints(text)?;
    app.set_conversation(
        user.user_id,
        Conversation::AuthorQuestions {
            event: event.clone(),
            checkpoints,
        },
    )
    .await;

    app.transport
        .send_message(chat_id, "Noted.", Some(Markup::RemoveReply))
        .await?;
    app.transport
        .send_message(
            chat_id,
            &format!(
                "Event: <b>{}</b>\n\nNow send the quiz questions. Each question has \
                 three answers and the first one must be the correct one; each \
                 correctly answered question earns the participant +1 point.\n\n\
                 Format:\n<i>Question 1\nAnswer 1 - correct\nAnswer 2\nAnswer 3\n\n\
                 Question 2\nAnswer 1 - correct\nAnswer 2\nAnswer 3\n\n...</i>\n\n\
                 Note the blank line between question blocks.\n\nTo cancel, send /cancel.",
                event.title
            ),
            Some(Markup::Reply(vec![vec![DRAFT_QUESTIONS_LABEL.to_string()]])),
        )
        .await?;
    Ok(())
}

pub async fn on_questions_input(
    app: &BotApp,
    user: &User,
    chat_id: i64,
    event: &EventDetail,
    checkpoints: Vec<String>,
    text: &str,
) -> Result<()> {
    if text == DRAFT_QUESTIONS_LABEL {
        let Some(generator) = &app.generator else {
            return generation_unavailable(app, chat_id).await;
        };
        app.transport
            .send_message(chat_id, "One moment, please...", None)
            .await?;
        let draft = draft_questions(generator, &event.title, &event.description).await?;
        app.transport
            .send_message(
                chat_id,
                &format!(
                    "Here is a draft of the questions:\n\n<code>{}</code>\n\n\
                     Use it as a base and send us the final questions in a reply, \
                     or press the button to draft again.",
                    format_question_blocks(&draft)
                ),
                None,
            )
            .await?;
        return Ok(());
    }

    let questions = parse_questions(text)?;
    app.db
        .create_event_game(CreateEventGame {
            event_id: event.id.clone(),
            title: event.title.clone(),
            checkpoints,
            questions,
            start_at: event.start_at,
            end_at: event.end_at,
        })
        .await?;
    app.clear_conversation(user.user_id).await;
    tracing::info!(user_id = user.user_id, event_id = %event.id, "event game created");

    app.transport
        .send_message(
            chat_id,
            "The game is live! Participants of this bot can now join your event.",
            Some(Markup::RemoveReply),
        )
        .await?;
    Ok(())
}

async fn generation_unavailable(app: &BotApp, chat_id: i64) -> Result<()> {
    app.transport
        .send_message(
            chat_id,
            "Draft generation is not configured. Please write the content yourself.",
            None,
        )
        .await?;
    Ok(())
}

fn format_question_blocks(questions: &[Question]) -> String {
    questions
        .iter()
        .map(|q| {
            format!(
                "{}\n{}\n{}\n{}",
                q.prompt, q.answers[0], q.answers[1], q.answers[2]
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
