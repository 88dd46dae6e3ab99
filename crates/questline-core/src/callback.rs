// Callback token codec.
//
// The entire state of an in-progress interaction rides inside the token
// attached to each inline button: the server holds no per-session memory
// between steps. Tokens are compact colon-delimited ASCII, bounded well
// under the transport's 64-byte callback limit; the leading tag names the
// interaction kind and doubles as the schema discriminator. Decoding never
// infers or defaults a field.

use crate::error::{QuestlineError, Result};

/// Transition state of a checkpoint traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointState {
    pub event_id: String,
    /// 0-based index of the checkpoint about to be presented
    pub step: u32,
    pub points: u32,
}

/// Transition state of a quiz traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizState {
    pub event_id: String,
    /// 0-based index of the question about to be presented
    pub question: u32,
    pub points: u32,
    /// Whether the immediately preceding answer was canonical-correct.
    /// Meaningless at question 0.
    pub last_correct: bool,
}

/// The closed set of interaction kinds carried by inline buttons.
/// Adding a mini-game means adding a variant here, and the compiler will
/// point at every match that needs extending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackPayload {
    /// Flip the catalog listing to `page`
    CatalogPage { page: u32 },
    /// Show full detail for one catalog event
    EventInfo { event_id: String, from_page: u32 },
    /// Enroll the user in the event
    Join { event_id: String },
    /// Start the organizer's game-authoring conversation
    AuthorGame { event_id: String },
    /// Flip the checkpoint-eligible listing to `page`
    CheckpointListPage { page: u32 },
    /// Flip the quiz-eligible listing to `page`
    QuizListPage { page: u32 },
    /// One checkpoint traversal transition
    Checkpoint(CheckpointState),
    /// One quiz traversal transition
    Quiz(QuizState),
}

impl CallbackPayload {
    /// Serialize into the wire token. Lossless and deterministic;
    /// `decode` is the exact inverse.
    pub fn encode(&self) -> String {
        match self {
            CallbackPayload::CatalogPage { page } => format!("ev:{page}"),
            CallbackPayload::EventInfo {
                event_id,
                from_page,
            } => format!("ei:{event_id}:{from_page}"),
            CallbackPayload::Join { event_id } => format!("jn:{event_id}"),
            CallbackPayload::AuthorGame { event_id } => format!("cg:{event_id}"),
            CallbackPayload::CheckpointListPage { page } => format!("cl:{page}"),
            CallbackPayload::QuizListPage { page } => format!("ql:{page}"),
            CallbackPayload::Checkpoint(s) => {
                format!("cp:{}:{}:{}", s.event_id, s.step, s.points)
            }
            CallbackPayload::Quiz(s) => format!(
                "qz:{}:{}:{}:{}",
                s.event_id,
                s.question,
                s.points,
                if s.last_correct { 1 } else { 0 }
            ),
        }
    }

    /// Parse a wire token. Unknown tag, wrong field count, or a field that
    /// does not parse all fail with `MalformedToken`.
    pub fn decode(token: &str) -> Result<CallbackPayload> {
        let parts: Vec<&str> = token.split(':').collect();
        let payload = match parts.as_slice() {
            ["ev", page] => CallbackPayload::CatalogPage {
                page: parse_num(token, page)?,
            },
            ["ei", event_id, from_page] => CallbackPayload::EventInfo {
                event_id: parse_id(token, event_id)?,
                from_page: parse_num(token, from_page)?,
            },
            ["jn", event_id] => CallbackPayload::Join {
                event_id: parse_id(token, event_id)?,
            },
            ["cg", event_id] => CallbackPayload::AuthorGame {
                event_id: parse_id(token, event_id)?,
            },
            ["cl", page] => CallbackPayload::CheckpointListPage {
                page: parse_num(token, page)?,
            },
            ["ql", page] => CallbackPayload::QuizListPage {
                page: parse_num(token, page)?,
            },
            ["cp", event_id, step, points] => CallbackPayload::Checkpoint(CheckpointState {
                event_id: parse_id(token, event_id)?,
                step: parse_num(token, step)?,
                points: parse_num(token, points)?,
            }),
            ["qz", event_id, question, points, last] => CallbackPayload::Quiz(QuizState {
                event_id: parse_id(token, event_id)?,
                question: parse_num(token, question)?,
                points: parse_num(token, points)?,
                last_correct: parse_flag(token, last)?,
            }),
            _ => return Err(QuestlineError::malformed(token)),
        };
        Ok(payload)
    }
}

/// Numeric fields are plain decimal digits; in particular signs and empty
/// strings are rejected so negative indices never parse.
fn parse_num(token: &str, field: &str) -> Result<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuestlineError::malformed(token));
    }
    field
        .parse()
        .map_err(|_| QuestlineError::malformed(token))
}

fn parse_id(token: &str, field: &str) -> Result<String> {
    if field.is_empty() {
        return Err(QuestlineError::malformed(token));
    }
    Ok(field.to_string())
}

fn parse_flag(token: &str, field: &str) -> Result<bool> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(QuestlineError::malformed(token)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(payload: CallbackPayload) {
        let token = payload.encode();
        assert_eq!(CallbackPayload::decode(&token).unwrap(), payload);
    }

    #[test]
    fn decode_inverts_encode_for_every_kind() {
        roundtrip(CallbackPayload::CatalogPage { page: 3 });
        roundtrip(CallbackPayload::EventInfo {
            event_id: "986754320".to_string(),
            from_page: 1,
        });
        roundtrip(CallbackPayload::Join {
            event_id: "986754320".to_string(),
        });
        roundtrip(CallbackPayload::AuthorGame {
            event_id: "986754320".to_string(),
        });
        roundtrip(CallbackPayload::CheckpointListPage { page: 0 });
        roundtrip(CallbackPayload::QuizListPage { page: 7 });
        roundtrip(CallbackPayload::Checkpoint(CheckpointState {
            event_id: "986754320".to_string(),
            step: 4,
            points: 3,
        }));
        roundtrip(CallbackPayload::Quiz(QuizState {
            event_id: "986754320".to_string(),
            question: 5,
            points: 5,
            last_correct: true,
        }));
        roundtrip(CallbackPayload::Quiz(QuizState {
            event_id: "986754320".to_string(),
            question: 1,
            points: 0,
            last_correct: false,
        }));
    }

    #[test]
    fn unknown_tag_is_malformed() {
        assert!(matches!(
            CallbackPayload::decode("zz:1:2:3"),
            Err(QuestlineError::MalformedToken(_))
        ));
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        assert!(CallbackPayload::decode("cp:986754320:4").is_err());
        assert!(CallbackPayload::decode("cp:986754320:4:3:9").is_err());
        assert!(CallbackPayload::decode("ev").is_err());
        assert!(CallbackPayload::decode("").is_err());
    }

    #[test]
    fn negative_and_signed_indices_never_parse() {
        assert!(CallbackPayload::decode("cp:986754320:-1:0").is_err());
        assert!(CallbackPayload::decode("cp:986754320:+1:0").is_err());
        assert!(CallbackPayload::decode("ev:-3").is_err());
    }

    #[test]
    fn quiz_flag_is_strictly_binary() {
        assert!(CallbackPayload::decode("qz:986754320:1:0:2").is_err());
        assert!(CallbackPayload::decode("qz:986754320:1:0:true").is_err());
    }

    #[test]
    fn empty_fields_are_malformed() {
        assert!(CallbackPayload::decode("jn:").is_err());
        assert!(CallbackPayload::decode("cp::1:0").is_err());
        assert!(CallbackPayload::decode("cp:986754320::0").is_err());
    }

    #[test]
    fn tokens_stay_within_transport_bounds() {
        // Callback data on the transport is capped at 64 bytes; the longest
        // state with a realistic catalog id must fit.
        let token = CallbackPayload::Quiz(QuizState {
            event_id: "9".repeat(20),
            question: 4294967295,
            points: 4294967295,
            last_correct: true,
        })
        .encode();
        assert!(token.len() <= 64, "token too long: {}", token.len());
    }
}
