// The chat-facing half of questline: the Telegram transport, the update
// dispatch with its registration gate, and one handler module per feature.

pub mod dispatch;
pub mod handlers;
pub mod telegram;

pub use dispatch::{BotApp, Incoming};
pub use telegram::TelegramClient;
