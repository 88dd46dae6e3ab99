// Enrollment gate: pure filters deciding which events are offered to whom.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Enrollment, EventGame, Role, RoughEvent};

/// Filter the externally-observed catalog down to events offerable to this
/// user for a fresh action. Participants are offered events that have an
/// authored game and that they have not already joined; organizers are
/// offered the complement: events with no game authored yet.
pub fn offerable_events(
    events: Vec<RoughEvent>,
    role: Role,
    game_ids: &HashSet<String>,
    enrolled_ids: &HashSet<String>,
) -> Vec<RoughEvent> {
    events
        .into_iter()
        .filter(|event| match role {
            Role::Participant => {
                game_ids.contains(&event.id) && !enrolled_ids.contains(&event.id)
            }
            Role::Organizer => !game_ids.contains(&event.id),
        })
        .collect()
}

/// Whether the checkpoint traversal is currently offerable for this
/// enrollment: the event has started, the post-event window has not closed,
/// and the run has not been completed yet.
pub fn checkpoints_eligible(
    game: &EventGame,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    !enrollment.checkpoints_done && now >= game.start_at && now <= game.end_at + window
}

/// Whether the quiz is currently offerable for this enrollment: the event
/// has ended, the post-event window has not closed, and the quiz has not
/// been completed yet.
pub fn quiz_eligible(
    game: &EventGame,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
    window: Duration,
) -> bool {
    !enrollment.questions_done && now >= game.end_at && now <= game.end_at + window
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn rough(id: &str) -> RoughEvent {
        RoughEvent {
            id: id.to_string(),
            title: format!("Event {id}"),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        }
    }

    fn game() -> EventGame {
        EventGame {
            event_id: "e1".to_string(),
            title: "Event e1".to_string(),
            checkpoints: vec!["A".to_string()],
            questions: vec![],
            start_at: Utc.with_ymd_and_hms(2025, 3, 1, 16, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap(),
        }
    }

    #[test]
    fn participants_see_unjoined_events_with_games() {
        let events = vec![rough("e1"), rough("e2"), rough("e3")];
        let game_ids: HashSet<String> = ["e1", "e2"].iter().map(|s| s.to_string()).collect();
        let enrolled: HashSet<String> = ["e2"].iter().map(|s| s.to_string()).collect();

        let offered = offerable_events(events, Role::Participant, &game_ids, &enrolled);
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0].id, "e1");
    }

    #[test]
    fn organizers_see_events_without_games() {
        let events = vec![rough("e1"), rough("e2"), rough("e3")];
        let game_ids: HashSet<String> = ["e1"].iter().map(|s| s.to_string()).collect();

        let offered =
            offerable_events(events, Role::Organizer, &game_ids, &HashSet::new());
        let ids: Vec<&str> = offered.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e3"]);
    }

    #[test]
    fn checkpoints_open_at_start_and_close_after_window() {
        let game = game();
        let enrollment = Enrollment::new(1, "e1");
        let window = Duration::days(10);

        let before = game.start_at - Duration::minutes(1);
        let during = game.start_at + Duration::hours(1);
        let within_window = game.end_at + Duration::days(9);
        let past_window = game.end_at + Duration::days(11);

        assert!(!checkpoints_eligible(&game, &enrollment, before, window));
        assert!(checkpoints_eligible(&game, &enrollment, during, window));
        assert!(checkpoints_eligible(&game, &enrollment, within_window, window));
        assert!(!checkpoints_eligible(&game, &enrollment, past_window, window));
    }

    #[test]
    fn completed_checkpoints_are_not_offered_again() {
        let game = game();
        let mut enrollment = Enrollment::new(1, "e1");
        enrollment.checkpoints_done = true;
        let during = game.start_at + Duration::hours(1);
        assert!(!checkpoints_eligible(
            &game,
            &enrollment,
            during,
            Duration::days(10)
        ));
    }

    #[test]
    fn quiz_opens_only_after_event_end() {
        let game = game();
        let enrollment = Enrollment::new(1, "e1");
        let window = Duration::days(10);

        let during = game.start_at + Duration::hours(1);
        let after = game.end_at + Duration::hours(1);
        let past_window = game.end_at + Duration::days(11);

        assert!(!quiz_eligible(&game, &enrollment, during, window));
        assert!(quiz_eligible(&game, &enrollment, after, window));
        assert!(!quiz_eligible(&game, &enrollment, past_window, window));
    }

    #[test]
    fn completed_quiz_is_not_offered_again() {
        let game = game();
        let mut enrollment = Enrollment::new(1, "e1");
        enrollment.questions_done = true;
        let after = game.end_at + Duration::hours(1);
        assert!(!quiz_eligible(&game, &enrollment, after, Duration::days(10)));
    }
}
