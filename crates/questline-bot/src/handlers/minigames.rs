// Mini-game entry listings and the traversal callbacks.
//
// The traversal handlers are thin: decode already happened in dispatch, the
// progression engine computes the transition, and the terminal commit goes
// through the storage transaction whose completion-flag guard makes a
// replayed terminal token a no-op.

use chrono::Utc;
use questline_core::gate;
use questline_core::progression::{answer_feedback, checkpoint_step, quiz_step};
use questline_core::text::pluralize;
use questline_core::transport::{Keyboard, MessageRef};
use questline_core::{
    CallbackPayload, CheckpointState, EventGame, MiniGame, QuestlineError, QuizState, Result,
    Role, StepOutcome, User,
};

use crate::dispatch::BotApp;
use crate::handlers::{choice_keyboard, listing_keyboard, page_slice};

pub async fn cmd_checkpoints(app: &BotApp, user: &User, chat_id: i64) -> Result<()> {
    if user.role != Role::Participant {
        return participants_only(app, chat_id).await;
    }
    let (text, keyboard) = render_list(app, user, MiniGame::Checkpoints, 0).await?;
    app.transport.send_message(chat_id, &text, keyboard.map(Into::into)).await?;
    Ok(())
}

pub async fn cmd_quiz(app: &BotApp, user: &User, chat_id: i64) -> Result<()> {
    if user.role != Role::Participant {
        return participants_only(app, chat_id).await;
    }
    let (text, keyboard) = render_list(app, user, MiniGame::Quiz, 0).await?;
    app.transport.send_message(chat_id, &text, keyboard.map(Into::into)).await?;
    Ok(())
}

async fn participants_only(app: &BotApp, chat_id: i64) -> Result<()> {
    app.transport
        .send_message(chat_id, "Only participants can use this command.", None)
        .await?;
    Ok(())
}

pub async fn on_checkpoint_list_page(
    app: &BotApp,
    user: &User,
    message: MessageRef,
    page: u32,
) -> Result<()> {
    let (text, keyboard) = render_list(app, user, MiniGame::Checkpoints, page).await?;
    app.transport.edit_message(message, &text, keyboard).await
}

pub async fn on_quiz_list_page(
    app: &BotApp,
    user: &User,
    message: MessageRef,
    page: u32,
) -> Result<()> {
    let (text, keyboard) = render_list(app, user, MiniGame::Quiz, page).await?;
    app.transport.edit_message(message, &text, keyboard).await
}

/// List the user's enrolled events currently eligible for one mini-game,
/// each select button carrying the freshly encoded initial token.
async fn render_list(
    app: &BotApp,
    user: &User,
    kind: MiniGame,
    page: u32,
) -> Result<(String, Option<Keyboard>)> {
    let now = Utc::now();
    let window = app.config.eligibility_window();

    let mut games: Vec<EventGame> = Vec::new();
    for enrollment in app.db.enrollments_for_user(user.user_id).await? {
        let Some(game) = app.db.get_event_game(&enrollment.event_id).await? else {
            continue;
        };
        let eligible = match kind {
            MiniGame::Checkpoints => {
                gate::checkpoints_eligible(&game, &enrollment, now, window)
            }
            MiniGame::Quiz => gate::quiz_eligible(&game, &enrollment, now, window),
        };
        if eligible {
            games.push(game);
        }
    }

    if games.is_empty() {
        let text = format!(
            "Hello, <b>{}</b>! You are not taking part in any event with {} right now. \
             If you've finished them all — well done! /start",
            user.full_name,
            match kind {
                MiniGame::Checkpoints => "checkpoints to walk",
                MiniGame::Quiz => "a quiz to answer",
            }
        );
        return Ok((text, None));
    }

    let (on_page, max_page) = page_slice(&games, page);
    let page = page.min(max_page);

    let listing = on_page
        .iter()
        .enumerate()
        .map(|(i, game)| {
            format!(
                "{}) <b>{}</b>",
                page as usize * super::PAGE_SIZE + i + 1,
                game.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let text = format!(
        "Hello, <b>{}</b>! Choose the event whose {} you want to take on:\n\n{}\n\nTap a number below to begin.",
        user.full_name,
        match kind {
            MiniGame::Checkpoints => "checkpoints",
            MiniGame::Quiz => "quiz",
        },
        listing,
    );

    let keyboard = listing_keyboard(
        page,
        max_page,
        on_page.len(),
        |i| initial_token(kind, &on_page[i].event_id),
        |page| match kind {
            MiniGame::Checkpoints => CallbackPayload::CheckpointListPage { page },
            MiniGame::Quiz => CallbackPayload::QuizListPage { page },
        },
    );

    Ok((text, Some(keyboard)))
}

fn initial_token(kind: MiniGame, event_id: &str) -> CallbackPayload {
    match kind {
        MiniGame::Checkpoints => CallbackPayload::Checkpoint(CheckpointState {
            event_id: event_id.to_string(),
            step: 0,
            points: 0,
        }),
        MiniGame::Quiz => CallbackPayload::Quiz(QuizState {
            event_id: event_id.to_string(),
            question: 0,
            points: 0,
            last_correct: true,
        }),
    }
}

pub async fn on_checkpoint(
    app: &BotApp,
    user: &User,
    callback_id: &str,
    message: MessageRef,
    state: CheckpointState,
) -> Result<()> {
    let game = app
        .db
        .get_event_game(&state.event_id)
        .await?
        .ok_or_else(|| QuestlineError::unknown_event(state.event_id.as_str()))?;

    match checkpoint_step(&state, &game)? {
        StepOutcome::Prompt { text, choices } => {
            app.transport
                .edit_message(message, &text, Some(choice_keyboard(choices)))
                .await?;
        }
        StepOutcome::Terminal { points } => {
            let fresh = app
                .db
                .complete_minigame(user.user_id, &state.event_id, MiniGame::Checkpoints, points)
                .await?;
            let text = if fresh {
                format!(
                    "<b>{}</b>\n\nYou walked every checkpoint of this event and earned \
                     <b>{}</b>! After the event, don't forget to answer its quiz: /quiz.",
                    game.title,
                    pluralize(points, "point", "points"),
                )
            } else {
                format!(
                    "<b>{}</b>\n\nYou have already completed this event's checkpoints; \
                     your points were credited back then.",
                    game.title,
                )
            };
            app.transport.edit_message(message, &text, None).await?;
        }
    }

    app.transport.answer_callback(callback_id, None).await
}

pub async fn on_quiz(
    app: &BotApp,
    user: &User,
    callback_id: &str,
    message: MessageRef,
    state: QuizState,
) -> Result<()> {
    let game = app
        .db
        .get_event_game(&state.event_id)
        .await?
        .ok_or_else(|| QuestlineError::unknown_event(state.event_id.as_str()))?;

    let feedback = answer_feedback(&state);
    let outcome = {
        let mut rng = rand::thread_rng();
        quiz_step(&state, &game, &mut rng)?
    };

    match outcome {
        StepOutcome::Prompt { text, choices } => {
            app.transport
                .edit_message(message, &text, Some(choice_keyboard(choices)))
                .await?;
        }
        StepOutcome::Terminal { points } => {
            let fresh = app
                .db
                .complete_minigame(user.user_id, &state.event_id, MiniGame::Quiz, points)
                .await?;
            let mut text = format!("<b>{}</b>\n\n", game.title);
            if let Some(feedback) = feedback {
                text.push_str(feedback);
                text.push_str("\n\n");
            }
            if fresh {
                text.push_str(&format!(
                    "You answered all of this event's questions and earned <b>{}</b>! \
                     See what else might interest you: /start.",
                    pluralize(points, "point", "points"),
                ));
            } else {
                text.push_str(
                    "You have already completed this event's quiz; \
                     your points were credited back then.",
                );
            }
            app.transport.edit_message(message, &text, None).await?;
        }
    }

    // Toast the verdict on the answer that was just pressed.
    app.transport.answer_callback(callback_id, feedback).await
}
