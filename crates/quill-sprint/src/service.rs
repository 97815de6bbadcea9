//! Sprint commands and phase transitions.

use std::sync::Arc;

use chrono::{TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use quill_scheduler::{Clock, TaskQueue};
use tracing::{debug, info, warn};

use crate::jobs::{COMPLETE, END, START, SUBJECT};
use crate::messages;
use crate::model::all_declared;
use crate::ports::{Goals, Ledger, Messenger, Project, Projects, Settings, SprintStore, Target, stats};
use crate::ranking::{self, COMPLETION_XP, ScoredResult};
use crate::{
    ChannelId, GuildId, Interaction, NewSprint, Participant, ParticipationKind, Phase, Sprint,
    SprintError, UserId,
};

/// Length used when the requested one is out of range.
pub const DEFAULT_LENGTH: u32 = 20;
pub const MAX_LENGTH: u32 = 60;

/// Start delay used when the requested one is out of range.
pub const DEFAULT_DELAY: i64 = 2;
pub const MAX_DELAY: i64 = 1440;

/// Minutes between "pens down" and results unless the guild overrides it.
pub const DEFAULT_END_DELAY: u32 = 2;

/// Declarations above this many words per minute need confirming unless the user overrides it.
pub const DEFAULT_MAX_WPM: u32 = 150;

/// Who issued a command and where to answer.
#[derive(Debug, Clone)]
pub struct Caller {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub user: UserId,
    /// Holds a moderation permission in the guild.
    pub can_manage: bool,
    /// Pending interactive reply, if the command came from one.
    pub interaction: Option<Interaction>,
}

impl Caller {
    fn target(&self) -> Target {
        match &self.interaction {
            Some(interaction) => Target::Interaction(interaction.clone()),
            None => Target::Channel(self.channel),
        }
    }
}

/// When a new sprint begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartAt {
    Now,
    /// After this many minutes (0 to 1440; anything else uses the default delay).
    InMinutes(i64),
    /// At this minute past the hour in the creator's timezone.
    AtMinute(i64),
}

/// A phase transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Announce the start and schedule the end.
    Start,
    /// Call pens down. `forced` ends a running sprint early.
    End { forced: bool },
    /// Score, award and post results.
    Complete,
}

/// What [`SprintService::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Applied,
    /// Another path already moved the sprint past this step.
    Stale,
    /// Too early; the step's job has been moved to when it can run.
    NotYet,
    /// The sprint no longer exists.
    Missing,
}

/// Why a sprint is being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Requested { by: UserId },
    EveryoneLeft,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinReceipt {
    pub rejoined: bool,
    pub starting: i64,
    pub kind: ParticipationKind,
    pub project: Option<Project>,
}

impl JoinReceipt {
    pub fn message(&self) -> String {
        messages::joined(
            self.kind,
            self.starting,
            self.rejoined,
            self.project.as_ref().map(|p| p.name.as_str()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveReceipt {
    pub sprint_cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareReceipt {
    pub word_count: i64,
    pub written: i64,
    /// The declaration was the last one owed and results were posted.
    pub completed: bool,
}

impl DeclareReceipt {
    pub fn message(&self) -> String {
        messages::word_count_updated(self.word_count, self.written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub current: i64,
    pub written: i64,
    pub elapsed_minutes: f64,
    pub wpm: f64,
    pub left_minutes: f64,
}

impl StatusReport {
    pub fn message(&self) -> String {
        messages::status(
            self.current,
            self.written,
            self.elapsed_minutes,
            self.wpm,
            self.left_minutes,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    StartsIn { seconds: i64 },
    Remaining { seconds: i64 },
    AwaitingWordCounts,
}

impl TimeLeft {
    pub fn message(&self) -> String {
        match self {
            Self::StartsIn { seconds } => messages::starts_in(*seconds),
            Self::Remaining { seconds } => messages::remaining(*seconds),
            Self::AwaitingWordCounts => messages::AWAITING_WORD_COUNTS.to_string(),
        }
    }
}

/// Everything the sprint lifecycle talks to.
pub struct Collaborators {
    pub sprints: Arc<dyn SprintStore>,
    pub queue: TaskQueue,
    pub messenger: Arc<dyn Messenger>,
    pub ledger: Arc<dyn Ledger>,
    pub goals: Arc<dyn Goals>,
    pub projects: Arc<dyn Projects>,
    pub settings: Arc<dyn Settings>,
    pub clock: Arc<dyn Clock>,
}

/// Sprint commands and the one place phase transitions happen.
pub struct SprintService {
    sprints: Arc<dyn SprintStore>,
    queue: TaskQueue,
    messenger: Arc<dyn Messenger>,
    ledger: Arc<dyn Ledger>,
    goals: Arc<dyn Goals>,
    projects: Arc<dyn Projects>,
    settings: Arc<dyn Settings>,
    clock: Arc<dyn Clock>,
}

/// Words per minute, to one decimal place.
pub fn words_per_minute(words: i64, seconds: i64) -> f64 {
    if seconds <= 0 {
        return 0.0;
    }
    let wpm = words as f64 / (seconds as f64 / 60.0);
    (wpm * 10.0).round() / 10.0
}

impl SprintService {
    pub fn new(deps: Collaborators) -> Self {
        Self {
            sprints: deps.sprints,
            queue: deps.queue,
            messenger: deps.messenger,
            ledger: deps.ledger,
            goals: deps.goals,
            projects: deps.projects,
            settings: deps.settings,
            clock: deps.clock,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Start a sprint in the caller's guild and channel.
    #[tracing::instrument(skip(self, caller), fields(guild = caller.guild, user = caller.user))]
    pub async fn create(
        &self,
        caller: &Caller,
        length: i64,
        start_at: StartAt,
    ) -> Result<Sprint, SprintError> {
        let now = self.clock.now();

        // A finished sprint whose results only wait on the scheduler is wrapped up first
        if let Some(existing) = self.sprints.active_sprint(caller.guild).await? {
            if existing.phase(now) == Phase::AwaitingWordCounts
                && all_declared(&self.sprints.participants(existing.id).await?)
            {
                self.advance(existing.id, Step::Complete, caller.interaction.as_ref())
                    .await?;
            }
        }
        if self.sprints.active_sprint(caller.guild).await?.is_some() {
            return Err(SprintError::AlreadyActive);
        }

        let length = u32::try_from(length)
            .ok()
            .filter(|l| (1..=MAX_LENGTH).contains(l))
            .unwrap_or(DEFAULT_LENGTH);
        let delay = match start_at {
            StartAt::Now => 0,
            StartAt::InMinutes(minutes) if (0..=MAX_DELAY).contains(&minutes) => minutes,
            StartAt::InMinutes(_) => DEFAULT_DELAY,
            StartAt::AtMinute(minute) => {
                let tz = self.user_timezone(caller.user).await?;
                if !(0..=59).contains(&minute) {
                    return Err(SprintError::InvalidMinute);
                }
                let local_minute = i64::from(Utc.timestamp_opt(now, 0).single().map_or(0, |t| {
                    t.with_timezone(&tz).minute()
                }));
                (60 + minute - local_minute) % 60
            }
        };

        let start = now + delay * 60;
        let end = start + i64::from(length) * 60;
        let sprint = self
            .sprints
            .insert_sprint(&NewSprint {
                guild: caller.guild,
                channel: caller.channel,
                start,
                end,
                length,
                creator: caller.user,
                created: now,
            })
            .await?
            .ok_or(SprintError::AlreadyActive)?;
        info!(sprint_id = sprint.id, start, end, "sprint created");

        self.sprints
            .save_participant(&Participant {
                sprint_id: sprint.id,
                user: caller.user,
                starting: 0,
                current: 0,
                ending: 0,
                joined_at: start.max(now),
                kind: ParticipationKind::Normal,
                project: None,
            })
            .await?;
        self.ledger
            .increment_stat(caller.user, stats::SPRINTS_STARTED, 1)
            .await?;

        if delay == 0 {
            self.queue.schedule(END, end, SUBJECT, Some(sprint.id)).await?;
            if let Err(e) = self.post_start(&sprint, &caller.target()).await {
                warn!(sprint_id = sprint.id, error = %e, "failed to announce sprint start");
            }
        } else {
            self.queue
                .schedule(START, start, SUBJECT, Some(sprint.id))
                .await?;
            if let Err(e) = self.post_scheduled(&sprint, now, &caller.target()).await {
                warn!(sprint_id = sprint.id, error = %e, "failed to announce scheduled sprint");
            }
        }

        Ok(sprint)
    }

    /// Join the active sprint, or reset the caller's entry if already in it.
    #[tracing::instrument(skip(self, caller), fields(guild = caller.guild, user = caller.user))]
    pub async fn join(
        &self,
        caller: &Caller,
        initial: Option<i64>,
        kind: ParticipationKind,
        project_shortname: Option<&str>,
    ) -> Result<JoinReceipt, SprintError> {
        let sprint = self.active(caller.guild).await?;
        let now = self.clock.now();

        let project = match project_shortname {
            Some(shortname) => Some(
                self.projects
                    .find_by_shortname(caller.user, shortname)
                    .await?
                    .ok_or_else(|| SprintError::UnknownProject(shortname.to_string()))?,
            ),
            None => None,
        };

        let starting = match kind {
            ParticipationKind::Normal => initial.unwrap_or(0),
            ParticipationKind::NoWordcount => 0,
        };
        let existing = self.sprints.participant(sprint.id, caller.user).await?;
        let joined_at = match &existing {
            _ if !sprint.has_started(now) => sprint.start,
            Some(participant) => participant.joined_at,
            None => now,
        };

        self.sprints
            .save_participant(&Participant {
                sprint_id: sprint.id,
                user: caller.user,
                starting,
                current: starting,
                ending: 0,
                joined_at,
                kind,
                project: project.as_ref().map(|p| p.id),
            })
            .await?;
        debug!(sprint_id = sprint.id, starting, kind = kind.as_str(), "participant joined");

        Ok(JoinReceipt {
            rejoined: existing.is_some(),
            starting,
            kind,
            project,
        })
    }

    /// Join with the final count, kind and project of the caller's previous sprint.
    pub async fn join_same(&self, caller: &Caller) -> Result<JoinReceipt, SprintError> {
        let sprint = self.active(caller.guild).await?;

        let Some(previous) = self
            .sprints
            .most_recent_participation(caller.user, sprint.id)
            .await?
        else {
            return self.join(caller, Some(0), ParticipationKind::Normal, None).await;
        };

        let shortname = match previous.project {
            Some(id) => self.projects.project(id).await?.map(|p| p.shortname),
            None => None,
        };
        self.join(
            caller,
            Some(previous.ending),
            previous.kind,
            shortname.as_deref(),
        )
        .await
    }

    /// Leave the active sprint. The sprint is cancelled when nobody is left.
    #[tracing::instrument(skip(self, caller), fields(guild = caller.guild, user = caller.user))]
    pub async fn leave(&self, caller: &Caller) -> Result<LeaveReceipt, SprintError> {
        let sprint = self.active(caller.guild).await?;

        if !self.sprints.remove_participant(sprint.id, caller.user).await? {
            return Err(SprintError::NotSprinting);
        }

        if !self.sprints.participants(sprint.id).await?.is_empty() {
            return Ok(LeaveReceipt {
                sprint_cancelled: false,
            });
        }

        self.cancel_sprint(&sprint, CancelReason::EveryoneLeft, &caller.target())
            .await?;
        Ok(LeaveReceipt {
            sprint_cancelled: true,
        })
    }

    /// Declare a total word count.
    pub async fn declare(&self, caller: &Caller, amount: i64) -> Result<DeclareReceipt, SprintError> {
        let (sprint, participant) = self.counting_participant(caller).await?;

        if amount < participant.starting {
            return Err(SprintError::BelowStartingCount {
                amount,
                starting: participant.starting,
                difference: participant.current - amount,
            });
        }

        self.set_word_count(caller, &sprint, participant, amount).await
    }

    /// Change the current word count by `delta` words.
    pub async fn adjust(&self, caller: &Caller, delta: i64) -> Result<DeclareReceipt, SprintError> {
        let (sprint, participant) = self.counting_participant(caller).await?;
        let amount = participant
            .current
            .checked_add(delta)
            .ok_or(SprintError::WordCountOutOfRange)?;
        self.set_word_count(caller, &sprint, participant, amount).await
    }

    /// Credit the caller's sprint words to one of their projects.
    pub async fn set_project(&self, caller: &Caller, shortname: &str) -> Result<Project, SprintError> {
        let sprint = self.active(caller.guild).await?;
        let mut participant = self
            .sprints
            .participant(sprint.id, caller.user)
            .await?
            .ok_or(SprintError::NotSprinting)?;
        let project = self
            .projects
            .find_by_shortname(caller.user, shortname)
            .await?
            .ok_or_else(|| SprintError::UnknownProject(shortname.to_string()))?;

        participant.project = Some(project.id);
        self.sprints.save_participant(&participant).await?;
        Ok(project)
    }

    /// End a running sprint now. Only the creator or a moderator may.
    #[tracing::instrument(skip(self, caller), fields(guild = caller.guild, user = caller.user))]
    pub async fn force_end(&self, caller: &Caller) -> Result<Advance, SprintError> {
        let sprint = self.active(caller.guild).await?;
        if sprint.creator != caller.user && !caller.can_manage {
            return Err(SprintError::PermissionDenied("end"));
        }
        if !sprint.has_started(self.clock.now()) {
            return Err(SprintError::NotStarted);
        }

        self.advance(
            sprint.id,
            Step::End { forced: true },
            caller.interaction.as_ref(),
        )
        .await
    }

    /// Cancel the active sprint. Only the creator or a moderator may.
    #[tracing::instrument(skip(self, caller), fields(guild = caller.guild, user = caller.user))]
    pub async fn cancel(&self, caller: &Caller) -> Result<(), SprintError> {
        let sprint = self.active(caller.guild).await?;
        if sprint.creator != caller.user && !caller.can_manage {
            return Err(SprintError::PermissionDenied("cancel"));
        }

        self.cancel_sprint(
            &sprint,
            CancelReason::Requested { by: caller.user },
            &caller.target(),
        )
        .await
    }

    /// The caller's progress in the running sprint.
    pub async fn status(&self, caller: &Caller) -> Result<StatusReport, SprintError> {
        let sprint = self.active(caller.guild).await?;
        let participant = self
            .sprints
            .participant(sprint.id, caller.user)
            .await?
            .ok_or(SprintError::NotSprinting)?;
        let now = self.clock.now();
        if !sprint.has_started(now) {
            return Err(SprintError::NotStarted);
        }

        let written = participant.current - participant.starting;
        let seconds = now - participant.joined_at;
        Ok(StatusReport {
            current: participant.current,
            written,
            elapsed_minutes: round_tenth(seconds as f64 / 60.0),
            wpm: words_per_minute(written, seconds),
            left_minutes: round_tenth((sprint.end - now) as f64 / 60.0),
        })
    }

    /// How long until the active sprint starts or ends.
    pub async fn time_left(&self, guild: GuildId) -> Result<TimeLeft, SprintError> {
        let sprint = self.active(guild).await?;
        let now = self.clock.now();
        Ok(match sprint.phase(now) {
            Phase::Scheduled => TimeLeft::StartsIn {
                seconds: sprint.start - now,
            },
            Phase::Running => TimeLeft::Remaining {
                seconds: sprint.end - now,
            },
            Phase::AwaitingWordCounts | Phase::Completed => TimeLeft::AwaitingWordCounts,
        })
    }

    pub async fn personal_best(&self, user: UserId) -> Result<Option<f64>, SprintError> {
        Ok(self.ledger.personal_best(user).await?)
    }

    /// Opt in or out of pings for new sprints in the caller's guild.
    pub async fn set_notify(&self, caller: &Caller, enabled: bool) -> Result<(), SprintError> {
        self.settings
            .set_sprint_notify(caller.guild, caller.user, enabled)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Phase transitions
    // =========================================================================

    /// Move a sprint through one lifecycle step.
    ///
    /// Both scheduled jobs and user commands come through here. Replies go to
    /// `interaction` when given, otherwise to the sprint's channel.
    #[tracing::instrument(skip(self, interaction))]
    pub async fn advance(
        &self,
        sprint_id: i64,
        step: Step,
        interaction: Option<&Interaction>,
    ) -> Result<Advance, SprintError> {
        let Some(sprint) = self.sprints.sprint(sprint_id).await? else {
            debug!("sprint no longer exists");
            return Ok(Advance::Missing);
        };
        let target = match interaction {
            Some(interaction) => Target::Interaction(interaction.clone()),
            None => Target::Channel(sprint.channel),
        };
        let now = self.clock.now();

        match step {
            Step::Start => self.start(sprint, now, &target).await,
            Step::End { forced } => self.end(sprint, forced, now, &target).await,
            Step::Complete => self.complete(sprint, now, &target).await,
        }
    }

    async fn start(&self, sprint: Sprint, now: i64, target: &Target) -> Result<Advance, SprintError> {
        match sprint.phase(now) {
            Phase::AwaitingWordCounts | Phase::Completed => return Ok(Advance::Stale),
            Phase::Scheduled => {
                self.queue
                    .schedule(START, sprint.start, SUBJECT, Some(sprint.id))
                    .await?;
                return Ok(Advance::NotYet);
            }
            Phase::Running => {}
        }

        self.post_start(&sprint, target).await?;
        self.queue
            .schedule(END, sprint.end, SUBJECT, Some(sprint.id))
            .await?;
        info!(sprint_id = sprint.id, "sprint started");
        Ok(Advance::Applied)
    }

    async fn end(
        &self,
        sprint: Sprint,
        forced: bool,
        now: i64,
        target: &Target,
    ) -> Result<Advance, SprintError> {
        match sprint.phase(now) {
            Phase::Completed => return Ok(Advance::Stale),
            Phase::Scheduled if forced => return Err(SprintError::NotStarted),
            Phase::Scheduled | Phase::Running if !forced => {
                self.queue
                    .schedule(END, sprint.end, SUBJECT, Some(sprint.id))
                    .await?;
                return Ok(Advance::NotYet);
            }
            _ => {}
        }

        if forced {
            self.sprints.set_end_reference(sprint.id, now).await?;
            self.queue.cancel(SUBJECT, Some(sprint.id), None).await?;
        }
        self.sprints.mark_ended(sprint.id, now).await?;

        let delay = self
            .settings
            .end_delay_minutes(sprint.guild)
            .await?
            .unwrap_or(DEFAULT_END_DELAY);
        let participants = self.sprints.participants(sprint.id).await?;
        let users: Vec<UserId> = participants.iter().map(|p| p.user).collect();
        self.messenger
            .send(target, &messages::pens_down(delay, &users))
            .await?;
        info!(sprint_id = sprint.id, forced, "pens down");

        if all_declared(&participants) {
            let Some(ended) = self.sprints.sprint(sprint.id).await? else {
                return Ok(Advance::Missing);
            };
            return self.complete(ended, now, target).await;
        }

        self.queue
            .schedule(COMPLETE, now + i64::from(delay) * 60, SUBJECT, Some(sprint.id))
            .await?;
        Ok(Advance::Applied)
    }

    async fn complete(&self, sprint: Sprint, now: i64, target: &Target) -> Result<Advance, SprintError> {
        match sprint.phase(now) {
            Phase::Completed => return Ok(Advance::Stale),
            Phase::Scheduled | Phase::Running => {
                self.queue
                    .schedule(COMPLETE, sprint.end, SUBJECT, Some(sprint.id))
                    .await?;
                return Ok(Advance::NotYet);
            }
            Phase::AwaitingWordCounts => {}
        }

        // Nothing is scored before this is delivered
        self.messenger.send(target, messages::RESULTS_COMING).await?;

        let mut scored = Vec::new();
        let mut no_wordcount = Vec::new();
        let mut announcements = Vec::new();

        for mut participant in self.sprints.participants(sprint.id).await? {
            if participant.kind == ParticipationKind::NoWordcount {
                self.ledger.award_xp(participant.user, COMPLETION_XP).await?;
                self.ledger
                    .increment_stat(participant.user, stats::SPRINTS_COMPLETED, 1)
                    .await?;
                no_wordcount.push(participant.user);
                continue;
            }

            if !participant.has_declared() {
                participant.ending = participant.current;
                self.sprints.save_participant(&participant).await?;
            }

            let written = participant.ending - participant.starting;
            if written <= 0 {
                continue;
            }

            let mut seconds = sprint.end_reference - participant.joined_at;
            if participant.joined_at <= 0 || seconds <= 0 {
                seconds = i64::from(sprint.length) * 60;
            }
            let wpm = words_per_minute(written, seconds);

            let new_personal_best = match self.ledger.personal_best(participant.user).await? {
                Some(best) => wpm > best,
                None => true,
            };
            if new_personal_best {
                self.ledger.set_personal_best(participant.user, wpm).await?;
            }

            let user = participant.user;
            self.ledger.award_xp(user, COMPLETION_XP).await?;
            self.ledger
                .increment_stat(user, stats::SPRINTS_COMPLETED, 1)
                .await?;
            self.ledger
                .increment_stat(user, stats::SPRINTS_WORDS_WRITTEN, written)
                .await?;
            self.ledger
                .increment_stat(user, stats::TOTAL_WORDS_WRITTEN, written)
                .await?;
            announcements.extend(self.goals.add_words(user, written).await?);
            if let Some(project) = participant.project {
                self.projects.credit_words(project, written).await?;
            }

            scored.push(ScoredResult {
                user,
                words: written,
                wpm,
                new_personal_best,
            });
        }

        let placings = ranking::rank(scored);
        for placing in &placings {
            if placing.bonus_xp > 0 {
                self.ledger
                    .award_xp(placing.result.user, placing.bonus_xp)
                    .await?;
            }
            if placing.winner {
                self.ledger
                    .increment_stat(placing.result.user, stats::SPRINTS_WON, 1)
                    .await?;
            }
        }

        // Set only after every score is written
        if !self.sprints.mark_completed(sprint.id, now).await? {
            debug!(sprint_id = sprint.id, "sprint completed elsewhere");
            return Ok(Advance::Stale);
        }

        for announcement in &announcements {
            self.messenger
                .send(&Target::Channel(sprint.channel), announcement)
                .await?;
        }
        self.messenger
            .send(target, &messages::leaderboard(&placings, &no_wordcount))
            .await?;
        self.queue.cancel(SUBJECT, Some(sprint.id), None).await?;

        info!(
            sprint_id = sprint.id,
            scored = placings.len(),
            no_wordcount = no_wordcount.len(),
            "sprint completed"
        );
        Ok(Advance::Applied)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn active(&self, guild: GuildId) -> Result<Sprint, SprintError> {
        self.sprints
            .active_sprint(guild)
            .await?
            .ok_or(SprintError::NoActiveSprint)
    }

    /// The active sprint and the caller's entry, checked for declaring a word count.
    async fn counting_participant(&self, caller: &Caller) -> Result<(Sprint, Participant), SprintError> {
        let sprint = self.active(caller.guild).await?;
        let participant = self
            .sprints
            .participant(sprint.id, caller.user)
            .await?
            .ok_or(SprintError::NotSprinting)?;
        if !sprint.has_started(self.clock.now()) {
            return Err(SprintError::NotStarted);
        }
        if participant.kind == ParticipationKind::NoWordcount {
            return Err(SprintError::NoWordcountParticipant);
        }
        Ok((sprint, participant))
    }

    async fn set_word_count(
        &self,
        caller: &Caller,
        sprint: &Sprint,
        mut participant: Participant,
        amount: i64,
    ) -> Result<DeclareReceipt, SprintError> {
        let written = amount - participant.starting;
        let mut seconds = sprint.end_reference - participant.joined_at;
        if seconds <= 0 {
            seconds = i64::from(sprint.length) * 60;
        }
        let wpm = words_per_minute(written, seconds);
        let max_wpm = self
            .settings
            .max_wpm(caller.user)
            .await?
            .unwrap_or(DEFAULT_MAX_WPM);
        if wpm > f64::from(max_wpm) {
            return Err(SprintError::SuspiciousWpm { written, wpm });
        }

        let finished = sprint.is_finished(self.clock.now());
        if finished {
            participant.ending = amount;
        } else {
            participant.current = amount;
        }
        self.sprints.save_participant(&participant).await?;

        let word_count = if finished { amount } else { participant.current };
        let mut receipt = DeclareReceipt {
            word_count,
            written: word_count - participant.starting,
            completed: false,
        };

        if finished && all_declared(&self.sprints.participants(sprint.id).await?) {
            self.queue.cancel(SUBJECT, Some(sprint.id), None).await?;
            let advance = self
                .advance(sprint.id, Step::Complete, caller.interaction.as_ref())
                .await?;
            receipt.completed = advance == Advance::Applied;
        }

        Ok(receipt)
    }

    async fn cancel_sprint(
        &self,
        sprint: &Sprint,
        reason: CancelReason,
        target: &Target,
    ) -> Result<(), SprintError> {
        let users: Vec<UserId> = self
            .sprints
            .participants(sprint.id)
            .await?
            .iter()
            .map(|p| p.user)
            .collect();

        self.sprints.delete_sprint(sprint.id).await?;
        self.queue.cancel(SUBJECT, Some(sprint.id), None).await?;

        let uncount_creator = match reason {
            CancelReason::Requested { by } => by == sprint.creator,
            CancelReason::EveryoneLeft => true,
        };
        if uncount_creator {
            self.ledger
                .increment_stat(sprint.creator, stats::SPRINTS_STARTED, -1)
                .await?;
        }

        let message = match reason {
            CancelReason::Requested { .. } => messages::cancelled(&users),
            CancelReason::EveryoneLeft => messages::EVERYONE_LEFT.to_string(),
        };
        self.messenger.send(target, &message).await?;
        info!(sprint_id = sprint.id, ?reason, "sprint cancelled");
        Ok(())
    }

    async fn post_start(&self, sprint: &Sprint, target: &Target) -> Result<(), SprintError> {
        let participants: Vec<UserId> = self
            .sprints
            .participants(sprint.id)
            .await?
            .iter()
            .map(|p| p.user)
            .collect();
        // Delayed starts already pinged subscribers when they were scheduled
        let subscribers = if sprint.started_on_creation() {
            self.subscribers(sprint).await?
        } else {
            Vec::new()
        };

        self.messenger
            .send(
                target,
                &messages::sprint_started(sprint.length, &participants, &subscribers),
            )
            .await?;
        Ok(())
    }

    async fn post_scheduled(&self, sprint: &Sprint, now: i64, target: &Target) -> Result<(), SprintError> {
        let subscribers = self.subscribers(sprint).await?;
        // A few seconds of slack so the rounded figure shows the higher minute
        let minutes = (sprint.start + 5 - now) / 60;
        self.messenger
            .send(
                target,
                &messages::sprint_scheduled(minutes, sprint.length, &subscribers),
            )
            .await?;
        Ok(())
    }

    /// Subscribers to ping, minus anyone already in the sprint.
    async fn subscribers(&self, sprint: &Sprint) -> Result<Vec<UserId>, SprintError> {
        let participants = self.sprints.participants(sprint.id).await?;
        Ok(self
            .settings
            .sprint_subscribers(sprint.guild)
            .await?
            .into_iter()
            .filter(|user| !participants.iter().any(|p| p.user == *user))
            .collect())
    }

    async fn user_timezone(&self, user: UserId) -> Result<Tz, SprintError> {
        let name = self.settings.timezone(user).await?;
        match name.as_deref().map(str::parse::<Tz>) {
            Some(Ok(tz)) => Ok(tz),
            Some(Err(_)) => {
                warn!(user, timezone = ?name, "unrecognised timezone");
                Err(SprintError::InvalidTimezone)
            }
            None => Err(SprintError::InvalidTimezone),
        }
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_per_minute_rounds_to_tenth() {
        assert_eq!(words_per_minute(300, 500), 36.0);
        assert_eq!(words_per_minute(100, 1200), 5.0);
        assert_eq!(words_per_minute(1000, 700), 85.7);
    }

    #[test]
    fn test_words_per_minute_without_time() {
        assert_eq!(words_per_minute(500, 0), 0.0);
        assert_eq!(words_per_minute(500, -60), 0.0);
    }
}
