// Chat transport seam.
//
// The transport is a collaborator: it delivers text with optional button
// markup and hands back the user's button presses with the exact token the
// button carried. Handlers and the notification scheduler both talk through
// this trait; tests substitute a recording implementation.

use async_trait::async_trait;

use crate::error::Result;

/// Inline button: a label and the callback token it round-trips
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub token: String,
}

impl Button {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            token: token.into(),
        }
    }
}

/// Inline keyboard: rows of buttons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// One button per row
    pub fn column(buttons: Vec<Button>) -> Self {
        Self {
            rows: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// Message markup: inline buttons, a one-shot reply keyboard, or an order
/// to remove a previously sent reply keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Inline(Keyboard),
    Reply(Vec<Vec<String>>),
    RemoveReply,
}

impl From<Keyboard> for Markup {
    fn from(keyboard: Keyboard) -> Self {
        Markup::Inline(keyboard)
    }
}

/// Address of a delivered message, used for in-place edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// One entry of the bot's command menu
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Deliver a message; returns its address for later edits
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<Markup>,
    ) -> Result<MessageRef>;

    /// Rewrite a previously delivered message in place
    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;

    /// Remove a previously delivered message
    async fn delete_message(&self, message: MessageRef) -> Result<()>;

    /// Acknowledge a button press, optionally with toast feedback
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Publish the bot's command menu
    async fn set_commands(&self, commands: &[CommandSpec]) -> Result<()>;
}
