//! Goal records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How often a goal resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Period {
    pub const ALL: [Period; 4] = [Self::Daily, Self::Weekly, Self::Monthly, Self::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// XP for meeting a goal of this period.
    pub fn xp(&self) -> i64 {
        match self {
            Self::Daily => 100,
            Self::Weekly => 250,
            Self::Monthly => 500,
            Self::Yearly => 2500,
        }
    }

    /// Stat counter bumped when a goal of this period is met.
    pub fn completed_stat(&self) -> String {
        format!("{}_goals_completed", self.as_str())
    }

    /// How many history rows to show. Yearly history is unbounded.
    pub fn history_limit(&self) -> Option<usize> {
        match self {
            Self::Daily => Some(14),
            Self::Weekly => Some(4),
            Self::Monthly => Some(12),
            Self::Yearly => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's live goal for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub id: i64,
    pub user: u64,
    pub period: Period,
    /// Target word count.
    pub goal: i64,
    /// Words counted so far this period.
    pub current: i64,
    pub completed: bool,
    /// Epoch seconds of the next reset.
    pub reset_at: i64,
}

impl GoalRecord {
    /// Whole percent of the target reached.
    pub fn percent(&self) -> i64 {
        if self.goal <= 0 {
            return 0;
        }
        self.current * 100 / self.goal
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.reset_at <= now
    }
}

/// A finished period, archived on reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalHistoryEntry {
    pub user: u64,
    pub period: Period,
    /// Human-readable name of the period, e.g. "15 Mar 2024" or "Feb 2024".
    pub label: String,
    pub goal: i64,
    pub result: i64,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_names_round_trip() {
        for period in Period::ALL {
            assert_eq!(Period::parse(period.as_str()), Some(period));
        }
        assert_eq!(Period::parse("hourly"), None);
        assert_eq!(Period::Weekly.completed_stat(), "weekly_goals_completed");
    }

    #[test]
    fn test_percent() {
        let record = GoalRecord {
            id: 1,
            user: 5,
            period: Period::Daily,
            goal: 1500,
            current: 1000,
            completed: false,
            reset_at: 0,
        };
        assert_eq!(record.percent(), 66);
    }
}
