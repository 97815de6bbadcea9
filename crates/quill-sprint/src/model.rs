//! Sprint records and derived state.

use serde::{Deserialize, Serialize};

pub type GuildId = u64;
pub type ChannelId = u64;
pub type UserId = u64;
pub type ProjectId = i64;

/// Where a sprint is in its lifecycle. Never stored; always derived from the times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created with a delay and not yet started.
    Scheduled,
    /// Between start and end.
    Running,
    /// Past the end, results not posted yet.
    AwaitingWordCounts,
    /// Results posted.
    Completed,
}

/// One guild's group writing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: i64,
    pub guild: GuildId,
    pub channel: ChannelId,
    /// Epoch seconds.
    pub start: i64,
    /// Epoch seconds. Pulled forward to the moment of a forced end.
    pub end: i64,
    /// End time used for words-per-minute maths. Diverges from the planned end on a forced end.
    pub end_reference: i64,
    /// Planned length in minutes.
    pub length: u32,
    pub creator: UserId,
    pub created: i64,
    /// When results were posted, 0 while the sprint is active.
    pub completed: i64,
}

/// Fields for inserting a sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSprint {
    pub guild: GuildId,
    pub channel: ChannelId,
    pub start: i64,
    pub end: i64,
    pub length: u32,
    pub creator: UserId,
    pub created: i64,
}

impl Sprint {
    pub fn phase(&self, now: i64) -> Phase {
        if self.completed > 0 {
            Phase::Completed
        } else if now < self.start {
            Phase::Scheduled
        } else if now < self.end {
            Phase::Running
        } else {
            Phase::AwaitingWordCounts
        }
    }

    pub fn has_started(&self, now: i64) -> bool {
        now >= self.start
    }

    /// Past the end time, whether or not results are out.
    pub fn is_finished(&self, now: i64) -> bool {
        matches!(self.phase(now), Phase::AwaitingWordCounts | Phase::Completed)
    }

    pub fn is_completed(&self) -> bool {
        self.completed > 0
    }

    /// Whether the start was immediate rather than delayed.
    pub fn started_on_creation(&self) -> bool {
        self.start == self.created
    }
}

/// How a user takes part in a sprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationKind {
    /// Declares word counts and is ranked.
    #[default]
    Normal,
    /// Takes part without counting words; gets completion XP only.
    NoWordcount,
}

impl ParticipationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::NoWordcount => "no_wordcount",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(Self::Normal),
            "no_wordcount" => Some(Self::NoWordcount),
            _ => None,
        }
    }
}

/// One user's membership in a sprint. Kept after completion as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub sprint_id: i64,
    pub user: UserId,
    pub starting: i64,
    pub current: i64,
    /// Final declared count, 0 until declared.
    pub ending: i64,
    /// Epoch seconds; the sprint start if joined before it began.
    pub joined_at: i64,
    pub kind: ParticipationKind,
    pub project: Option<ProjectId>,
}

impl Participant {
    pub fn has_declared(&self) -> bool {
        self.ending != 0
    }

    /// Whether this participant still owes a final word count.
    pub fn awaiting_declaration(&self) -> bool {
        self.kind == ParticipationKind::Normal && !self.has_declared()
    }
}

/// True when no normal participant still owes a final word count.
pub(crate) fn all_declared(participants: &[Participant]) -> bool {
    !participants.iter().any(Participant::awaiting_declaration)
}
