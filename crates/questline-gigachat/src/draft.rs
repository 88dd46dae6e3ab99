// Draft generation with shape-validated retry.

use questline_core::authoring;
use questline_core::{Question, QuestlineError, Result};

use crate::client::GigaChatClient;

/// Attempts per draft before giving up with `GenerationFailed`
pub const GENERATION_ATTEMPTS: u32 = 3;

/// How many checkpoints and questions a draft must contain
const DRAFT_COUNT: usize = 5;

const CHECKPOINT_SYSTEM_PROMPT: &str = "When the user sends you an event's title and \
description, compose exactly 5 checkpoints a participant should pass during the event, \
such as talking to an expert. One checkpoint per line, numbered, no other text. \
Be creative.";

const QUESTION_SYSTEM_PROMPT: &str = "When the user sends you an event's title and \
description, compose exactly 5 quiz questions about the event. Each question is a block \
of four lines: the question, then three answers, and the very first answer must be the \
correct one. Separate blocks with one blank line, no other text. These questions will be \
asked after the event. Be creative.";

/// Draft the five checkpoint lines for an event
pub async fn draft_checkpoints(
    client: &GigaChatClient,
    title: &str,
    description: &str,
) -> Result<Vec<String>> {
    attempt_draft(client, CHECKPOINT_SYSTEM_PROMPT, title, description, |raw| {
        let checkpoints = authoring::parse_checkpoints(raw).ok()?;
        (checkpoints.len() == DRAFT_COUNT).then_some(checkpoints)
    })
    .await
}

/// Draft the five quiz questions for an event
pub async fn draft_questions(
    client: &GigaChatClient,
    title: &str,
    description: &str,
) -> Result<Vec<Question>> {
    attempt_draft(client, QUESTION_SYSTEM_PROMPT, title, description, |raw| {
        let questions = authoring::parse_questions(raw).ok()?;
        (questions.len() == DRAFT_COUNT).then_some(questions)
    })
    .await
}

/// Run up to `GENERATION_ATTEMPTS` completions, returning the first one
/// whose shape validates. Transport failures consume an attempt too.
async fn attempt_draft<T>(
    client: &GigaChatClient,
    system: &str,
    title: &str,
    description: &str,
    validate: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    let user = format!("Title: {title}, description: {description}");

    for attempt in 1..=GENERATION_ATTEMPTS {
        match client.complete(system, &user).await {
            Ok(raw) => {
                if let Some(parsed) = validate(&raw) {
                    return Ok(parsed);
                }
                tracing::debug!(attempt, "generated draft failed shape validation");
            }
            Err(error) => {
                tracing::warn!(attempt, %error, "generation request failed");
            }
        }
    }

    Err(QuestlineError::GenerationFailed(GENERATION_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use questline_core::authoring;

    // The shape gates reused by the drafts; the retry loop itself only
    // counts attempts.

    #[test]
    fn five_numbered_lines_pass_the_checkpoint_gate() {
        let raw = "1. Visit the welcome desk\n2. Talk to a mentor\n3. Find the lab\n4. Join a demo\n5. Sign the wall";
        let parsed = authoring::parse_checkpoints(raw).unwrap();
        assert_eq!(parsed.len(), 5);
        assert_eq!(parsed[0], "Visit the welcome desk");
    }

    #[test]
    fn four_lines_fail_the_checkpoint_count() {
        let raw = "1. One\n2. Two\n3. Three\n4. Four";
        let parsed = authoring::parse_checkpoints(raw).unwrap();
        assert_ne!(parsed.len(), 5);
    }

    #[test]
    fn malformed_question_blocks_fail_the_gate() {
        let raw = "What?\nA\nB\n\nWhat else?\nA\nB\nC";
        assert!(authoring::parse_questions(raw).is_err());
    }
}
