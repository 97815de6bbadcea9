//! Wiring: one SQLite store behind every port, the services on top, and the
//! handler table the scheduler dispatches through.

use std::sync::Arc;

use async_trait::async_trait;
use quill_goals::GoalTracker;
use quill_scheduler::{Clock, HandlerRegistry, Scheduler, SchedulerError, StoreError, TaskQueue};
use quill_sprint::ports::{Goals, Messenger};
use quill_sprint::{Collaborators, SprintService, UserId};
use quill_store::SqliteStore;

/// Every (subject, kind) pair a worker must be able to run.
pub fn required_jobs() -> Vec<(&'static str, &'static str)> {
    quill_sprint::JOB_KINDS
        .iter()
        .chain(quill_goals::JOB_KINDS.iter())
        .copied()
        .collect()
}

/// Lets sprint completion count words towards goals.
struct TrackerGoals(Arc<GoalTracker>);

#[async_trait]
impl Goals for TrackerGoals {
    async fn add_words(&self, user: UserId, words: i64) -> Result<Vec<String>, StoreError> {
        self.0.add_words(user, words).await
    }
}

/// The assembled services.
pub struct App {
    pub store: Arc<SqliteStore>,
    pub queue: TaskQueue,
    pub sprints: Arc<SprintService>,
    pub goals: Arc<GoalTracker>,
    pub clock: Arc<dyn Clock>,
}

impl App {
    pub fn new(store: Arc<SqliteStore>, messenger: Arc<dyn Messenger>, clock: Arc<dyn Clock>) -> Self {
        let queue = TaskQueue::new(store.clone());
        let goals = Arc::new(GoalTracker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            clock.clone(),
        ));
        let sprints = Arc::new(SprintService::new(Collaborators {
            sprints: store.clone(),
            queue: queue.clone(),
            messenger,
            ledger: store.clone(),
            goals: Arc::new(TrackerGoals(goals.clone())),
            projects: store.clone(),
            settings: store.clone(),
            clock: clock.clone(),
        }));

        Self {
            store,
            queue,
            sprints,
            goals,
            clock,
        }
    }

    pub fn registry(&self) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        quill_sprint::register_jobs(&mut registry, self.sprints.clone());
        quill_goals::register_jobs(&mut registry, self.goals.clone());
        registry
    }

    /// A scheduler over the store, refusing to start if any job kind lacks a handler.
    pub fn scheduler(&self) -> Result<Scheduler, SchedulerError> {
        let registry = self.registry();
        registry.ensure_complete(&required_jobs())?;
        Ok(Scheduler::new(self.store.clone(), registry, self.clock.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::LogMessenger;
    use quill_scheduler::ManualClock;

    #[test]
    fn test_every_job_kind_has_a_handler() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let app = App::new(store, Arc::new(LogMessenger), Arc::new(ManualClock::new(0)));

        assert!(app.registry().missing(&required_jobs()).is_empty());
        assert_eq!(app.registry().len(), 4);
        assert!(app.scheduler().is_ok());
    }
}
