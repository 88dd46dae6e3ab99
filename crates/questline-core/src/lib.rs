// Core domain logic for the questline event game.
//
// The callback codec, the two mini-game state machines, the enrollment gate,
// and the notification trigger computation are pure functions over domain
// values; the only other thing here is the `ChatTransport` seam the sibling
// crates implement and talk through. Actual I/O (storage, transport, catalog,
// generation) lives in those crates.

pub mod authoring;
pub mod callback;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod notify;
pub mod progression;
pub mod text;
pub mod transport;

pub use callback::{CallbackPayload, CheckpointState, QuizState};
pub use config::Config;
pub use domain::{Enrollment, EventDetail, EventGame, MiniGame, Question, Role, RoughEvent, User};
pub use error::{QuestlineError, Result};
pub use notify::Trigger;
pub use progression::{Choice, StepOutcome};
pub use transport::{Button, ChatTransport, CommandSpec, Keyboard, Markup, MessageRef};
