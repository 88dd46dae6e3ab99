// Catalog browsing: paged event listing, per-event detail, and joining.

use std::collections::HashSet;

use questline_core::gate;
use questline_core::text::format_event_time;
use questline_core::transport::{Button, Keyboard, MessageRef};
use questline_core::{CallbackPayload, QuestlineError, Result, Role, User};

use crate::dispatch::BotApp;
use crate::handlers::{listing_keyboard, page_slice};

pub async fn cmd_start(app: &BotApp, user: &User, chat_id: i64) -> Result<()> {
    // The catalog fetch can be slow; acknowledge first, then edit the
    // placeholder into the listing.
    let placeholder = app
        .transport
        .send_message(
            chat_id,
            &format!(
                "Hello, <b>{}</b>! Fetching the event catalog, one moment...",
                user.full_name
            ),
            None,
        )
        .await?;

    let (text, keyboard) = render_page(app, user, 0).await?;
    app.transport.edit_message(placeholder, &text, keyboard).await
}

pub async fn on_page(app: &BotApp, user: &User, message: MessageRef, page: u32) -> Result<()> {
    let (text, keyboard) = render_page(app, user, page).await?;
    app.transport.edit_message(message, &text, keyboard).await
}

async fn render_page(
    app: &BotApp,
    user: &User,
    page: u32,
) -> Result<(String, Option<Keyboard>)> {
    let announcements = app.catalog.list_announcements().await?;
    let game_ids = app.db.event_game_ids().await?;
    let enrolled_ids: HashSet<String> = app
        .db
        .enrollments_for_user(user.user_id)
        .await?
        .into_iter()
        .map(|e| e.event_id)
        .collect();

    let offered = gate::offerable_events(announcements, user.role, &game_ids, &enrolled_ids);

    if offered.is_empty() {
        let text = format!(
            "Hello, <b>{}</b>! There are no events {} yet.",
            user.full_name,
            match user.role {
                Role::Participant => "you can join",
                Role::Organizer => "waiting for a game",
            }
        );
        return Ok((text, None));
    }

    let (on_page, max_page) = page_slice(&offered, page);
    let page = page.min(max_page);

    let listing = on_page
        .iter()
        .enumerate()
        .map(|(i, event)| {
            format!(
                "{}) {}. <b>{}</b>",
                page as usize * super::PAGE_SIZE + i + 1,
                event.date.format("%d %B %Y"),
                event.title
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let text = format!(
        "Hello, <b>{}</b>! Right now we know about {} {}:\n\n{}\n\nTap a number below to {}.",
        user.full_name,
        offered.len(),
        match user.role {
            Role::Participant => "events you can join",
            Role::Organizer => "events with no game authored yet",
        },
        listing,
        match user.role {
            Role::Participant => "see an event, join it, and start earning points",
            Role::Organizer => "author its checkpoints and questions",
        },
    );

    let keyboard = listing_keyboard(
        page,
        max_page,
        on_page.len(),
        |i| CallbackPayload::EventInfo {
            event_id: on_page[i].id.clone(),
            from_page: page,
        },
        |page| CallbackPayload::CatalogPage { page },
    );

    Ok((text, Some(keyboard)))
}

pub async fn on_event_info(
    app: &BotApp,
    user: &User,
    message: MessageRef,
    event_id: &str,
    from_page: u32,
) -> Result<()> {
    let detail = app.catalog.event_detail(event_id).await?;

    let action = match user.role {
        Role::Participant => Button::new(
            "I want to participate",
            CallbackPayload::Join {
                event_id: detail.id.clone(),
            }
            .encode(),
        ),
        Role::Organizer => Button::new(
            "Author a game",
            CallbackPayload::AuthorGame {
                event_id: detail.id.clone(),
            }
            .encode(),
        ),
    };
    let back = Button::new(
        "↩️",
        CallbackPayload::CatalogPage { page: from_page }.encode(),
    );
    let keyboard = Keyboard::column(vec![action, back]);

    let text = format!(
        "🔸 <b>{}</b>\n\n{}\n\n<b>Where:</b> {}\n<b>Starts:</b> {}\n<b>Ends:</b> {}\n<a href=\"{}\">Event page</a>",
        detail.title,
        detail.description,
        detail.address,
        format_event_time(detail.start_at),
        format_event_time(detail.end_at),
        app.catalog.event_url(&detail.id),
    );

    app.transport.edit_message(message, &text, Some(keyboard)).await
}

pub async fn on_join(
    app: &BotApp,
    user: &User,
    message: MessageRef,
    event_id: &str,
) -> Result<()> {
    // The game must still exist; joining a deleted game would orphan the
    // enrollment.
    app.db
        .get_event_game(event_id)
        .await?
        .ok_or_else(|| QuestlineError::unknown_event(event_id))?;

    app.db.enroll(user.user_id, event_id).await?;
    tracing::info!(user_id = user.user_id, event_id, "user enrolled");

    app.transport
        .edit_message(
            message,
            "<b>You are enrolled in this event!</b> We'll remind you an hour before it \
             starts and again when it begins. During the event you'll get its checkpoint \
             list — pass every one! After the event we'll ask you a few questions about \
             it — each correct answer earns a point.",
            None,
        )
        .await
}
