// The two mini-game state machines.
//
// Both are pure: given a decoded token state and the authoritative event
// game, they compute either the next presentation (prompt text plus freshly
// encoded outgoing tokens) or the terminal outcome. Committing a terminal
// outcome (crediting points, flipping the done flag) is the storage layer's
// transactional job; re-presenting an already-committed terminal is the
// handler's idempotency job.
//
// Bounds are re-derived from the authoritative list length on every step: a
// correctly generated token never exceeds the length by more than the
// engine's own +1 increment, so anything past that is malformed.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::callback::{CallbackPayload, CheckpointState, QuizState};
use crate::domain::EventGame;
use crate::error::{QuestlineError, Result};

/// One outgoing button: a label and the token it carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub payload: CallbackPayload,
}

/// Result of evaluating one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Present this prompt with these choices
    Prompt { text: String, choices: Vec<Choice> },
    /// The run is over; credit `points` (idempotently) and report them
    Terminal { points: u32 },
}

pub const CHECKPOINT_MISSED_LABEL: &str = "❌ Not completed";
pub const CHECKPOINT_CLEARED_LABEL: &str = "✅ Completed";

pub const FEEDBACK_CORRECT: &str = "✅ Correct!";
pub const FEEDBACK_INCORRECT: &str = "❌ Incorrect :(";

/// Evaluate one checkpoint traversal transition.
///
/// Every checkpoint offers the same two choices: "completed" earns a point,
/// "not completed" doesn't; both advance the step by exactly 1.
pub fn checkpoint_step(state: &CheckpointState, game: &EventGame) -> Result<StepOutcome> {
    let n = game.checkpoints.len() as u32;
    if state.step > n {
        return Err(QuestlineError::malformed(
            CallbackPayload::Checkpoint(state.clone()).encode(),
        ));
    }
    if state.step == n {
        return Ok(StepOutcome::Terminal {
            points: state.points,
        });
    }

    let prompt = &game.checkpoints[state.step as usize];
    let missed = CheckpointState {
        event_id: state.event_id.clone(),
        step: state.step + 1,
        points: state.points,
    };
    let cleared = CheckpointState {
        event_id: state.event_id.clone(),
        step: state.step + 1,
        points: state.points + 1,
    };

    Ok(StepOutcome::Prompt {
        text: format!("<b>{}</b>\n\n{}", game.title, prompt),
        choices: vec![
            Choice {
                label: CHECKPOINT_MISSED_LABEL.to_string(),
                payload: CallbackPayload::Checkpoint(missed),
            },
            Choice {
                label: CHECKPOINT_CLEARED_LABEL.to_string(),
                payload: CallbackPayload::Checkpoint(cleared),
            },
        ],
    })
}

/// Feedback on the previous quiz answer, or None at the first question.
/// Purely presentational; it never affects state.
pub fn answer_feedback(state: &QuizState) -> Option<&'static str> {
    if state.question == 0 {
        None
    } else if state.last_correct {
        Some(FEEDBACK_CORRECT)
    } else {
        Some(FEEDBACK_INCORRECT)
    }
}

/// Evaluate one quiz traversal transition.
///
/// The three choices are presented in uniformly shuffled order so the
/// correct option's on-screen position is not predictable; the encoded
/// correctness of each choice is the option's canonical status, independent
/// of display order.
pub fn quiz_step<R: Rng>(
    state: &QuizState,
    game: &EventGame,
    rng: &mut R,
) -> Result<StepOutcome> {
    let n = game.questions.len() as u32;
    if state.question > n {
        return Err(QuestlineError::malformed(
            CallbackPayload::Quiz(state.clone()).encode(),
        ));
    }
    if state.question == n {
        return Ok(StepOutcome::Terminal {
            points: state.points,
        });
    }

    let question = &game.questions[state.question as usize];
    let mut choices: Vec<Choice> = question
        .answers
        .iter()
        .enumerate()
        .map(|(i, answer)| {
            let correct = i == 0;
            Choice {
                label: answer.clone(),
                payload: CallbackPayload::Quiz(QuizState {
                    event_id: state.event_id.clone(),
                    question: state.question + 1,
                    points: state.points + u32::from(correct),
                    last_correct: correct,
                }),
            }
        })
        .collect();
    choices.shuffle(rng);

    let mut text = format!("<b>{}</b>\n\n", game.title);
    if let Some(feedback) = answer_feedback(state) {
        text.push_str(feedback);
        text.push_str("\n\n");
    }
    text.push_str(&question.prompt);

    Ok(StepOutcome::Prompt { text, choices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Question;
    use chrono::{TimeZone, Utc};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game(checkpoints: &[&str], questions: usize) -> EventGame {
        EventGame {
            event_id: "986754320".to_string(),
            title: "Open Lab Night".to_string(),
            checkpoints: checkpoints.iter().map(|s| s.to_string()).collect(),
            questions: (0..questions)
                .map(|i| Question {
                    prompt: format!("Question {i}"),
                    answers: [
                        format!("Right {i}"),
                        format!("Wrong A {i}"),
                        format!("Wrong B {i}"),
                    ],
                })
                .collect(),
            start_at: Utc.with_ymd_and_hms(2025, 3, 1, 16, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap(),
        }
    }

    /// Walk a checkpoint run picking "completed" per the mask; return the
    /// terminal points.
    fn walk_checkpoints(game: &EventGame, cleared: &[bool]) -> u32 {
        let mut state = CheckpointState {
            event_id: game.event_id.clone(),
            step: 0,
            points: 0,
        };
        loop {
            match checkpoint_step(&state, game).unwrap() {
                StepOutcome::Terminal { points } => return points,
                StepOutcome::Prompt { choices, .. } => {
                    let want = if cleared[state.step as usize] {
                        CHECKPOINT_CLEARED_LABEL
                    } else {
                        CHECKPOINT_MISSED_LABEL
                    };
                    let choice = choices.iter().find(|c| c.label == want).unwrap();
                    match &choice.payload {
                        CallbackPayload::Checkpoint(next) => state = next.clone(),
                        other => panic!("unexpected payload {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn all_completed_credits_full_length() {
        let game = game(&["A", "B", "C", "D", "E"], 0);
        assert_eq!(walk_checkpoints(&game, &[true; 5]), 5);
    }

    #[test]
    fn none_completed_credits_zero() {
        let game = game(&["A", "B", "C", "D", "E"], 0);
        assert_eq!(walk_checkpoints(&game, &[false; 5]), 0);
    }

    #[test]
    fn mixed_run_credits_cleared_count() {
        let game = game(&["A", "B", "C", "D", "E"], 0);
        assert_eq!(
            walk_checkpoints(&game, &[true, true, false, true, true]),
            4
        );
    }

    #[test]
    fn checkpoint_choices_advance_by_exactly_one() {
        let game = game(&["A", "B"], 0);
        let state = CheckpointState {
            event_id: game.event_id.clone(),
            step: 1,
            points: 1,
        };
        let StepOutcome::Prompt { text, choices } = checkpoint_step(&state, &game).unwrap()
        else {
            panic!("expected a prompt");
        };
        assert!(text.contains("B"));
        for choice in &choices {
            let CallbackPayload::Checkpoint(next) = &choice.payload else {
                panic!("expected a checkpoint payload");
            };
            assert_eq!(next.step, 2);
        }
        let gained: Vec<u32> = choices
            .iter()
            .map(|c| match &c.payload {
                CallbackPayload::Checkpoint(next) => next.points - state.points,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(gained, vec![0, 1]);
    }

    #[test]
    fn checkpoint_step_past_terminal_is_malformed() {
        let game = game(&["A", "B", "C"], 0);
        let state = CheckpointState {
            event_id: game.event_id.clone(),
            step: 4,
            points: 0,
        };
        assert!(matches!(
            checkpoint_step(&state, &game),
            Err(QuestlineError::MalformedToken(_))
        ));
    }

    #[test]
    fn empty_checkpoint_list_is_immediately_terminal() {
        let game = game(&[], 0);
        let state = CheckpointState {
            event_id: game.event_id.clone(),
            step: 0,
            points: 0,
        };
        assert_eq!(
            checkpoint_step(&state, &game).unwrap(),
            StepOutcome::Terminal { points: 0 }
        );
    }

    #[test]
    fn quiz_choices_carry_canonical_correctness_regardless_of_shuffle() {
        let game = game(&[], 5);
        // Try several shuffle seeds; the encoded increments must always be
        // {+1, +0, +0} with exactly one last_correct.
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let state = QuizState {
                event_id: game.event_id.clone(),
                question: 2,
                points: 1,
                last_correct: false,
            };
            let StepOutcome::Prompt { choices, .. } =
                quiz_step(&state, &game, &mut rng).unwrap()
            else {
                panic!("expected a prompt");
            };
            assert_eq!(choices.len(), 3);
            let mut gained: Vec<u32> = Vec::new();
            let mut correct_flags = 0;
            for choice in &choices {
                let CallbackPayload::Quiz(next) = &choice.payload else {
                    panic!("expected a quiz payload");
                };
                assert_eq!(next.question, 3);
                gained.push(next.points - state.points);
                if next.last_correct {
                    correct_flags += 1;
                    assert_eq!(choice.label, "Right 2");
                    assert_eq!(next.points, state.points + 1);
                }
            }
            gained.sort_unstable();
            assert_eq!(gained, vec![0, 0, 1]);
            assert_eq!(correct_flags, 1);
        }
    }

    #[test]
    fn quiz_feedback_surfaces_only_after_first_question() {
        let first = QuizState {
            event_id: "986754320".to_string(),
            question: 0,
            points: 0,
            last_correct: true,
        };
        assert_eq!(answer_feedback(&first), None);

        let right = QuizState {
            question: 3,
            last_correct: true,
            ..first.clone()
        };
        assert_eq!(answer_feedback(&right), Some(FEEDBACK_CORRECT));

        let wrong = QuizState {
            question: 3,
            last_correct: false,
            ..first
        };
        assert_eq!(answer_feedback(&wrong), Some(FEEDBACK_INCORRECT));
    }

    #[test]
    fn quiz_prompt_embeds_feedback_after_first_question() {
        let game = game(&[], 2);
        let mut rng = StdRng::seed_from_u64(7);
        let state = QuizState {
            event_id: game.event_id.clone(),
            question: 1,
            points: 1,
            last_correct: true,
        };
        let StepOutcome::Prompt { text, .. } = quiz_step(&state, &game, &mut rng).unwrap()
        else {
            panic!("expected a prompt");
        };
        assert!(text.contains(FEEDBACK_CORRECT));
        assert!(text.contains("Question 1"));
    }

    #[test]
    fn quiz_terminal_reports_accumulated_points() {
        let game = game(&[], 5);
        let mut rng = StdRng::seed_from_u64(0);
        let state = QuizState {
            event_id: game.event_id.clone(),
            question: 5,
            points: 4,
            last_correct: true,
        };
        assert_eq!(
            quiz_step(&state, &game, &mut rng).unwrap(),
            StepOutcome::Terminal { points: 4 }
        );
    }

    #[test]
    fn quiz_step_past_terminal_is_malformed() {
        let game = game(&[], 5);
        let mut rng = StdRng::seed_from_u64(0);
        let state = QuizState {
            event_id: game.event_id.clone(),
            question: 7,
            points: 4,
            last_correct: false,
        };
        assert!(matches!(
            quiz_step(&state, &game, &mut rng),
            Err(QuestlineError::MalformedToken(_))
        ));
    }
}
