// Notification trigger computation.
//
// Three time-based triggers per enrollment, each delivered at most once,
// guarded by the persisted flags. Within one enrollment the triggers are
// always evaluated pre-start, then start, then end, so a tick that wakes up
// long after several boundaries delivers everything it owes, in order.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Enrollment, EventGame};

/// One of the three time-based notification conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    PreStart,
    Start,
    End,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::PreStart => "pre_start",
            Trigger::Start => "start",
            Trigger::End => "end",
        }
    }
}

/// The ordered subset of triggers that is due at `now` and not yet sent for
/// this enrollment.
pub fn due_triggers(
    game: &EventGame,
    enrollment: &Enrollment,
    now: DateTime<Utc>,
    pre_start_lead: Duration,
) -> Vec<Trigger> {
    let mut due = Vec::new();
    if !enrollment.notified_pre_start && now >= game.start_at - pre_start_lead {
        due.push(Trigger::PreStart);
    }
    if !enrollment.notified_start && now >= game.start_at {
        due.push(Trigger::Start);
    }
    if !enrollment.notified_end && now >= game.end_at {
        due.push(Trigger::End);
    }
    due
}

/// The message sent for one trigger
pub fn notification_text(trigger: Trigger, full_name: &str, title: &str) -> String {
    match trigger {
        Trigger::PreStart => format!(
            "<b>{full_name}</b>, the event <b>{title}</b> starts in an hour. Don't be late!"
        ),
        Trigger::Start => format!(
            "<b>{full_name}</b>, the event <b>{title}</b> has started. \
             To start walking its checkpoints, send /checkpoints."
        ),
        Trigger::End => format!(
            "<b>{full_name}</b>, the event <b>{title}</b> is over. \
             Answer a few questions about it: /quiz."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game() -> EventGame {
        EventGame {
            event_id: "e1".to_string(),
            title: "Open Lab Night".to_string(),
            checkpoints: vec![],
            questions: vec![],
            start_at: Utc.with_ymd_and_hms(2025, 3, 1, 16, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 3, 1, 19, 0, 0).unwrap(),
        }
    }

    #[test]
    fn nothing_is_due_before_the_lead_window() {
        let game = game();
        let enrollment = Enrollment::new(1, "e1");
        let now = game.start_at - Duration::hours(2);
        assert!(due_triggers(&game, &enrollment, now, Duration::hours(1)).is_empty());
    }

    #[test]
    fn only_pre_start_is_due_inside_the_lead_window() {
        let game = game();
        let enrollment = Enrollment::new(1, "e1");
        let now = game.start_at - Duration::minutes(30);
        assert_eq!(
            due_triggers(&game, &enrollment, now, Duration::hours(1)),
            vec![Trigger::PreStart]
        );
    }

    #[test]
    fn late_wakeup_delivers_all_three_in_order() {
        // Scheduler was paused across start and end; one tick owes all
        // three notifications, pre-start first.
        let game = game();
        let enrollment = Enrollment::new(1, "e1");
        let now = game.end_at + Duration::minutes(10);
        assert_eq!(
            due_triggers(&game, &enrollment, now, Duration::hours(1)),
            vec![Trigger::PreStart, Trigger::Start, Trigger::End]
        );
    }

    #[test]
    fn sent_flags_suppress_their_triggers() {
        let game = game();
        let mut enrollment = Enrollment::new(1, "e1");
        enrollment.notified_pre_start = true;
        enrollment.notified_start = true;
        let now = game.end_at + Duration::minutes(10);
        assert_eq!(
            due_triggers(&game, &enrollment, now, Duration::hours(1)),
            vec![Trigger::End]
        );

        enrollment.notified_end = true;
        assert!(due_triggers(&game, &enrollment, now, Duration::hours(1)).is_empty());
    }
}
