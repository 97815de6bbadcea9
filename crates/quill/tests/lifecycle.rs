//! End-to-end tests: the assembled services and scheduler over SQLite.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use quill::App;
use quill_goals::{GoalStore, Period};
use quill_scheduler::{JobKey, ManualClock, Scheduler};
use quill_sprint::ports::{Ledger, Messenger, SprintStore, stats};
use quill_sprint::{
    Advance, Caller, MessagingError, ParticipationKind, Sprint, SprintError, StartAt, Step,
    Target, messages,
};
use quill_store::SqliteStore;

const GUILD: u64 = 1;
const CHANNEL: u64 = 2;

/// 2024-03-16 00:10 UTC
const SATURDAY: i64 = 1_710_547_800;

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(Target, String)>>,
    fail_next: AtomicBool,
}

impl RecordingMessenger {
    /// Reject the next message, as an unreachable chat service would.
    fn fail_once(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn last(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, target: &Target, text: &str) -> Result<(), MessagingError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(MessagingError::Delivery("connection reset".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), text.to_string()));
        Ok(())
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    messenger: Arc<RecordingMessenger>,
    app: App,
    scheduler: Scheduler,
}

impl Harness {
    fn new(now: i64) -> Self {
        Self::with_store(Arc::new(SqliteStore::open_in_memory().unwrap()), now)
    }

    fn with_store(store: Arc<SqliteStore>, now: i64) -> Self {
        let clock = Arc::new(ManualClock::new(now));
        let messenger = Arc::new(RecordingMessenger::default());
        let app = App::new(store, messenger.clone(), clock.clone());
        let scheduler = app.scheduler().unwrap();

        Self {
            clock,
            messenger,
            app,
            scheduler,
        }
    }

    async fn tick_at(&self, now: i64) {
        self.clock.set(now);
        self.scheduler.run_due(now).await.unwrap();
    }

    async fn job_due(&self, sprint_id: i64, kind: &str) -> Option<i64> {
        self.app
            .queue
            .find(&JobKey::new("sprint", Some(sprint_id), kind))
            .await
            .unwrap()
            .map(|j| j.due_at)
    }

    async fn sprint(&self, id: i64) -> Option<Sprint> {
        self.app.store.sprint(id).await.unwrap()
    }
}

fn caller(user: u64) -> Caller {
    Caller {
        guild: GUILD,
        channel: CHANNEL,
        user,
        can_manage: false,
        interaction: None,
    }
}

#[tokio::test]
async fn test_forced_end_schedules_complete_after_grace() {
    let h = Harness::new(1000);

    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    assert_eq!(h.job_due(sprint.id, "end").await, Some(2200));

    h.clock.set(1500);
    assert_eq!(
        h.app.sprints.force_end(&caller(7)).await.unwrap(),
        Advance::Applied
    );

    let ended = h.sprint(sprint.id).await.unwrap();
    assert_eq!((ended.end, ended.end_reference), (1500, 1500));
    assert_eq!(h.job_due(sprint.id, "end").await, None);
    assert_eq!(h.job_due(sprint.id, "complete").await, Some(1620));
    assert_eq!(h.messenger.last(), messages::pens_down(2, &[7]));
}

#[tokio::test]
async fn test_guild_end_delay_setting_is_used() {
    let h = Harness::new(1000);
    h.app
        .store
        .set_guild_setting(GUILD, quill_store::guild_setting::SPRINT_DELAY_END, "5")
        .unwrap();
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();

    h.tick_at(2200).await;

    assert_eq!(h.job_due(sprint.id, "complete").await, Some(2500));
}

#[tokio::test]
async fn test_declared_words_are_scored_and_recorded() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.app
        .sprints
        .join(&caller(8), Some(1000), ParticipationKind::Normal, None)
        .await
        .unwrap();
    h.app.sprints.declare(&caller(8), 1300).await.unwrap();

    h.clock.set(1500);
    h.app.sprints.force_end(&caller(7)).await.unwrap();
    h.tick_at(1620).await;

    let done = h.sprint(sprint.id).await.unwrap();
    assert_eq!(done.completed, 1620);
    // 300 words over 500 seconds
    assert!(
        h.messenger
            .last()
            .contains("<@8> - **300 words** (36.0 wpm)")
    );
    assert_eq!(h.app.store.personal_best(8).await.unwrap(), Some(36.0));
    assert_eq!(h.app.store.xp(8).unwrap(), 25);
    assert_eq!(h.app.store.stat(8, stats::TOTAL_WORDS_WRITTEN).unwrap(), 300);
    assert_eq!(h.app.store.stat(8, stats::SPRINTS_COMPLETED).unwrap(), 1);
    // The creator never declared, so wrote nothing and is not ranked
    assert_eq!(h.app.store.xp(7).unwrap(), 0);
    assert!(h.app.queue.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delayed_sprint_runs_through_every_job() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 10, StartAt::InMinutes(5))
        .await
        .unwrap();
    assert_eq!(h.job_due(sprint.id, "start").await, Some(1300));

    h.tick_at(1300).await;
    assert_eq!(h.job_due(sprint.id, "start").await, None);
    assert_eq!(h.job_due(sprint.id, "end").await, Some(1900));

    h.app.sprints.declare(&caller(7), 200).await.unwrap();
    h.tick_at(1900).await;
    assert_eq!(h.job_due(sprint.id, "complete").await, Some(2020));

    h.tick_at(2020).await;
    assert_eq!(h.sprint(sprint.id).await.unwrap().completed, 2020);
    assert_eq!(h.app.store.xp(7).unwrap(), 25);
    assert!(h.app.store.active_sprint(GUILD).await.unwrap().is_none());
}

#[tokio::test]
async fn test_last_leaver_removes_sprint_and_jobs() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::InMinutes(5))
        .await
        .unwrap();
    assert_eq!(h.app.store.stat(7, stats::SPRINTS_STARTED).unwrap(), 1);

    let receipt = h.app.sprints.leave(&caller(7)).await.unwrap();

    assert!(receipt.sprint_cancelled);
    assert!(h.sprint(sprint.id).await.is_none());
    assert!(h.app.queue.list().await.unwrap().is_empty());
    assert_eq!(h.app.store.stat(7, stats::SPRINTS_STARTED).unwrap(), 0);
    assert_eq!(h.messenger.last(), messages::EVERYONE_LEFT);
}

#[tokio::test]
async fn test_one_active_sprint_per_guild() {
    let h = Harness::new(1000);
    h.app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();

    let err = h
        .app
        .sprints
        .create(&caller(8), 20, StartAt::Now)
        .await
        .unwrap_err();

    assert!(matches!(err, SprintError::AlreadyActive));
}

#[tokio::test]
async fn test_complete_twice_posts_one_leaderboard() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.app.sprints.declare(&caller(7), 400).await.unwrap();
    h.clock.set(2200);

    let first = h
        .app
        .sprints
        .advance(sprint.id, Step::Complete, None)
        .await
        .unwrap();
    let second = h
        .app
        .sprints
        .advance(sprint.id, Step::Complete, None)
        .await
        .unwrap();

    assert_eq!((first, second), (Advance::Applied, Advance::Stale));
    assert_eq!(h.app.store.xp(7).unwrap(), 25);
    assert_eq!(h.app.store.stat(7, stats::SPRINTS_WORDS_WRITTEN).unwrap(), 400);
    let leaderboards = h
        .messenger
        .texts()
        .iter()
        .filter(|t| t.starts_with(":trophy:"))
        .count();
    assert_eq!(leaderboards, 1);
}

#[tokio::test]
async fn test_sprint_words_meet_goal_and_goal_resets_at_midnight() {
    let h = Harness::new(SATURDAY);
    h.app.goals.set_goal(7, Period::Daily, 500).await.unwrap();
    quill_goals::install(&h.app.queue, SATURDAY).await.unwrap();
    h.tick_at(SATURDAY).await;

    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.app.sprints.declare(&caller(7), 600).await.unwrap();
    h.tick_at(sprint.end).await;
    h.tick_at(sprint.end + 120).await;

    assert!(
        h.messenger
            .texts()
            .iter()
            .any(|t| t.contains("has met their daily goal of 500 words"))
    );
    // Completion plus the daily goal
    assert_eq!(h.app.store.xp(7).unwrap(), 125);
    let met = h.app.goals.goal(7, Period::Daily).await.unwrap().unwrap();
    assert_eq!((met.current, met.completed), (600, true));

    // 2024-03-17 00:00 UTC
    h.tick_at(1_710_633_600).await;

    let reset = h.app.goals.goal(7, Period::Daily).await.unwrap().unwrap();
    assert_eq!((reset.current, reset.completed), (0, false));
    assert_eq!(reset.reset_at, 1_710_720_000);
    let history = h.app.store.history(7, Period::Daily, None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].label, "16 Mar 2024");
    assert_eq!((history[0].result, history[0].completed), (600, true));
}

#[tokio::test]
async fn test_workers_sharing_a_database_run_each_job_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quill.db");
    let first = Harness::with_store(Arc::new(SqliteStore::open(&path).unwrap()), 1000);
    let second = Harness::with_store(Arc::new(SqliteStore::open(&path).unwrap()), 1000);

    let sprint = first
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();

    first.tick_at(2200).await;
    second.tick_at(2200).await;

    let pens_down = messages::pens_down(2, &[7]);
    let sent = first
        .messenger
        .texts()
        .into_iter()
        .chain(second.messenger.texts())
        .filter(|t| *t == pens_down)
        .count();
    assert_eq!(sent, 1);
    assert_eq!(second.job_due(sprint.id, "complete").await, Some(2320));
}

#[tokio::test]
async fn test_failed_results_post_is_retried_and_still_scores() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.app.sprints.declare(&caller(7), 400).await.unwrap();
    h.tick_at(2200).await;

    h.messenger.fail_once();
    let report = h.scheduler.run_due(2320).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.sprint(sprint.id).await.unwrap().completed, 0);
    assert_eq!(h.job_due(sprint.id, "complete").await, Some(2320));
    assert_eq!(h.app.store.xp(7).unwrap(), 0);

    h.tick_at(2335).await;

    assert_eq!(h.sprint(sprint.id).await.unwrap().completed, 2335);
    assert_eq!(h.job_due(sprint.id, "complete").await, None);
    assert_eq!(h.app.store.xp(7).unwrap(), 25);
    assert_eq!(h.app.store.stat(7, stats::SPRINTS_COMPLETED).unwrap(), 1);
    assert_eq!(h.app.store.stat(7, stats::SPRINTS_WORDS_WRITTEN).unwrap(), 400);
    assert!(h.messenger.last().starts_with(":trophy:"));
}

#[tokio::test]
async fn test_force_end_while_awaiting_counts_moves_end_reference() {
    let h = Harness::new(1000);
    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.tick_at(2200).await;
    assert_eq!(h.job_due(sprint.id, "complete").await, Some(2320));

    h.clock.set(2300);
    assert_eq!(
        h.app.sprints.force_end(&caller(7)).await.unwrap(),
        Advance::Applied
    );

    let ended = h.sprint(sprint.id).await.unwrap();
    assert_eq!((ended.end, ended.end_reference), (2200, 2300));
    assert_eq!(h.job_due(sprint.id, "complete").await, Some(2420));
}

#[tokio::test]
async fn test_sprint_survives_a_failed_start_announcement() {
    let h = Harness::new(1000);
    h.messenger.fail_once();

    let sprint = h
        .app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();

    assert_eq!(h.job_due(sprint.id, "end").await, Some(2200));
    assert!(h.messenger.texts().is_empty());
    assert!(matches!(
        h.app.sprints.create(&caller(7), 20, StartAt::Now).await,
        Err(SprintError::AlreadyActive)
    ));
}

#[tokio::test]
async fn test_word_count_overflow_is_rejected() {
    let h = Harness::new(1000);
    h.app
        .sprints
        .create(&caller(7), 20, StartAt::Now)
        .await
        .unwrap();
    h.app.sprints.declare(&caller(7), 100).await.unwrap();

    let err = h.app.sprints.adjust(&caller(7), i64::MAX).await.unwrap_err();

    assert!(matches!(err, SprintError::WordCountOutOfRange));
    assert!(err.is_user_facing());
}
