// Profile display.

use questline_core::{Result, Role, User};

use crate::dispatch::BotApp;
use crate::handlers::registration::role_label;

pub async fn cmd_me(app: &BotApp, user: &User, chat_id: i64) -> Result<()> {
    let mut text = format!(
        "Hello, <b>{}</b>! Here is your profile:\n\n<b>Role:</b> {}",
        user.full_name,
        role_label(user.role)
    );

    if user.role == Role::Participant {
        let enrollments = app.db.enrollments_for_user(user.user_id).await?;
        text.push_str(&format!(
            "\n<b>Points:</b> {}\n<b>Events:</b> {}",
            user.points,
            enrollments.len()
        ));
    }

    app.transport.send_message(chat_id, &text, None).await?;
    Ok(())
}
