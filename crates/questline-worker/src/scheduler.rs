// Notification scheduler.
//
// A single long-lived task ticks on a fixed cadence. Each tick walks every
// event game, every enrollment on it, and the ordered trigger set per
// enrollment, sending each due notification and flipping its flag only once
// the transport accepted the message. The scheduler races the progression
// engine on the same enrollment rows; all of its writes go through the
// storage layer's single-column conditional updates, so nothing a handler
// wrote concurrently is ever clobbered.
//
// Shutdown is cooperative: the watch channel interrupts the wait between
// ticks, never a tick in flight, so the process drains cleanly.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use questline_core::notify::{due_triggers, notification_text};
use questline_core::{ChatTransport, Config, Enrollment, EventGame, Trigger};
use questline_storage::Database;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What the scheduler needs from persistence. `Database` is the production
/// implementation; tests drive a tick against an in-memory one.
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    async fn list_event_games(&self) -> Result<Vec<EventGame>>;
    async fn notify_targets_for_event(&self, event_id: &str)
        -> Result<Vec<(Enrollment, String)>>;
    async fn mark_notified(&self, user_id: i64, event_id: &str, trigger: Trigger)
        -> Result<bool>;
}

#[async_trait]
impl SchedulerStore for Database {
    async fn list_event_games(&self) -> Result<Vec<EventGame>> {
        Database::list_event_games(self).await
    }

    async fn notify_targets_for_event(
        &self,
        event_id: &str,
    ) -> Result<Vec<(Enrollment, String)>> {
        Database::notify_targets_for_event(self, event_id).await
    }

    async fn mark_notified(
        &self,
        user_id: i64,
        event_id: &str,
        trigger: Trigger,
    ) -> Result<bool> {
        Database::mark_notified(self, user_id, event_id, trigger).await
    }
}

pub struct NotificationScheduler<S> {
    store: S,
    transport: Arc<dyn ChatTransport>,
    cadence: Duration,
    pre_start_lead: chrono::Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: SchedulerStore> NotificationScheduler<S> {
    pub fn new(
        store: S,
        transport: Arc<dyn ChatTransport>,
        config: &Config,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            transport,
            cadence: Duration::from_secs(config.scheduler_cadence_secs),
            pre_start_lead: config.pre_start_lead(),
            shutdown_rx,
        }
    }

    /// Tick until shutdown is signalled. An in-flight tick always finishes;
    /// only the wait between ticks is interruptible.
    pub async fn run(self) {
        info!(cadence_secs = self.cadence.as_secs(), "notification scheduler started");
        let mut interval = tokio::time::interval(self.cadence);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(error) = self.tick(Utc::now()).await {
                        warn!(%error, "notification pass failed");
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("notification scheduler stopping");
                    return;
                }
            }
        }
    }

    /// One notification pass over every enrollment of every event game.
    ///
    /// Within one enrollment triggers go strictly pre-start, start, end; a
    /// send failure stops that enrollment's sequence (its flag stays false,
    /// the next tick retries in order) but never the rest of the pass.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize> {
        let games = self.store.list_event_games().await?;
        let mut sent = 0usize;

        for game in &games {
            let targets = match self.store.notify_targets_for_event(&game.event_id).await {
                Ok(targets) => targets,
                Err(error) => {
                    warn!(event_id = %game.event_id, %error, "skipping event in notification pass");
                    continue;
                }
            };

            for (enrollment, full_name) in targets {
                for trigger in due_triggers(game, &enrollment, now, self.pre_start_lead) {
                    match self
                        .deliver(game, &enrollment, &full_name, trigger)
                        .await
                    {
                        Ok(()) => sent += 1,
                        Err(error) => {
                            warn!(
                                user_id = enrollment.user_id,
                                event_id = %game.event_id,
                                trigger = trigger.as_str(),
                                %error,
                                "notification delivery failed"
                            );
                            break;
                        }
                    }
                }
            }
        }

        if sent > 0 {
            info!(sent, "notification pass complete");
        } else {
            debug!("notification pass sent nothing");
        }
        Ok(sent)
    }

    async fn deliver(
        &self,
        game: &EventGame,
        enrollment: &Enrollment,
        full_name: &str,
        trigger: Trigger,
    ) -> Result<()> {
        let text = notification_text(trigger, full_name, &game.title);
        self.transport
            .send_message(enrollment.user_id, &text, None)
            .await?;
        // Flag only after the transport accepted the message; a lost send
        // is retried on the next tick.
        self.store
            .mark_notified(enrollment.user_id, &game.event_id, trigger)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use questline_core::transport::{CommandSpec, Keyboard, Markup, MessageRef};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStore {
        games: Vec<EventGame>,
        enrollments: Mutex<HashMap<(i64, String), Enrollment>>,
    }

    #[async_trait]
    impl SchedulerStore for MemoryStore {
        async fn list_event_games(&self) -> Result<Vec<EventGame>> {
            Ok(self.games.clone())
        }

        async fn notify_targets_for_event(
            &self,
            event_id: &str,
        ) -> Result<Vec<(Enrollment, String)>> {
            Ok(self
                .enrollments
                .lock()
                .unwrap()
                .values()
                .filter(|e| e.event_id == event_id)
                .cloned()
                .map(|e| (e, "Sam".to_string()))
                .collect())
        }

        async fn mark_notified(
            &self,
            user_id: i64,
            event_id: &str,
            trigger: Trigger,
        ) -> Result<bool> {
            let mut enrollments = self.enrollments.lock().unwrap();
            let enrollment = enrollments
                .get_mut(&(user_id, event_id.to_string()))
                .expect("enrollment exists");
            let flag = match trigger {
                Trigger::PreStart => &mut enrollment.notified_pre_start,
                Trigger::Start => &mut enrollment.notified_start,
                Trigger::End => &mut enrollment.notified_end,
            };
            let flipped = !*flag;
            *flag = true;
            Ok(flipped)
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(i64, String)>>,
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_message(
            &self,
            chat_id: i64,
            text: &str,
            _markup: Option<Markup>,
        ) -> questline_core::Result<MessageRef> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: 1,
            })
        }

        async fn edit_message(
            &self,
            _message: MessageRef,
            _text: &str,
            _keyboard: Option<Keyboard>,
        ) -> questline_core::Result<()> {
            Ok(())
        }

        async fn delete_message(&self, _message: MessageRef) -> questline_core::Result<()> {
            Ok(())
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            _text: Option<&str>,
        ) -> questline_core::Result<()> {
            Ok(())
        }

        async fn set_commands(&self, _commands: &[CommandSpec]) -> questline_core::Result<()> {
            Ok(())
        }
    }

    fn scheduler(
        store: MemoryStore,
        transport: Arc<RecordingTransport>,
    ) -> NotificationScheduler<MemoryStore> {
        let (_tx, rx) = watch::channel(false);
        let config = Config {
            database_url: String::new(),
            bot_token: String::new(),
            catalog_base_url: String::new(),
            gigachat_base_url: String::new(),
            gigachat_token: None,
            scheduler_cadence_secs: 60,
            pre_start_lead_mins: 60,
            eligibility_window_days: 10,
        };
        NotificationScheduler::new(store, transport, &config, rx)
    }

    #[tokio::test]
    async fn a_tick_spanning_all_boundaries_sends_three_in_order_then_goes_quiet() {
        let now = Utc::now();
        let game = EventGame {
            event_id: "e1".to_string(),
            title: "Open Lab Night".to_string(),
            checkpoints: vec![],
            questions: vec![],
            start_at: now - ChronoDuration::hours(2),
            end_at: now - ChronoDuration::minutes(10),
        };
        let mut enrollments = HashMap::new();
        enrollments.insert((7, "e1".to_string()), Enrollment::new(7, "e1"));
        let store = MemoryStore {
            games: vec![game],
            enrollments: Mutex::new(enrollments),
        };
        let transport = Arc::new(RecordingTransport::default());
        let scheduler = scheduler(store, transport.clone());

        let sent = scheduler.tick(now).await.unwrap();
        assert_eq!(sent, 3);
        {
            let sent = transport.sent.lock().unwrap();
            assert_eq!(sent.len(), 3);
            assert!(sent.iter().all(|(chat, _)| *chat == 7));
            assert!(sent[0].1.contains("starts in an hour"));
            assert!(sent[1].1.contains("has started"));
            assert!(sent[2].1.contains("is over"));
        }

        // All flags are now set; an immediate second tick sends nothing.
        let sent = scheduler.tick(now).await.unwrap();
        assert_eq!(sent, 0);
        assert_eq!(transport.sent.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn already_sent_triggers_are_skipped() {
        let now = Utc::now();
        let game = EventGame {
            event_id: "e1".to_string(),
            title: "Open Lab Night".to_string(),
            checkpoints: vec![],
            questions: vec![],
            start_at: now - ChronoDuration::minutes(30),
            end_at: now + ChronoDuration::hours(2),
        };
        let mut enrollment = Enrollment::new(7, "e1");
        enrollment.notified_pre_start = true;
        let mut enrollments = HashMap::new();
        enrollments.insert((7, "e1".to_string()), enrollment);
        let store = MemoryStore {
            games: vec![game],
            enrollments: Mutex::new(enrollments),
        };
        let transport = Arc::new(RecordingTransport::default());
        let scheduler = scheduler(store, transport.clone());

        let sent = scheduler.tick(now).await.unwrap();
        assert_eq!(sent, 1);
        assert!(transport.sent.lock().unwrap()[0].1.contains("has started"));
    }
}
