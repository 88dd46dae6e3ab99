// GigaChat content generator client.
//
// Drafts checkpoint lines and quiz questions for an event from its title
// and description. Only the draft's shape is validated (expected line
// count); semantic correctness is the organizer's call. A request whose
// answer fails the shape check is retried up to the attempt limit, then
// reported as `GenerationFailed` so the organizer can author manually.

mod client;
mod draft;

pub use client::GigaChatClient;
pub use draft::{draft_checkpoints, draft_questions, GENERATION_ATTEMPTS};
