//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use quill_goals::Period;

use crate::messenger::DISCORD_API;

/// Parse a boolean, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off" (case-insensitive) as false.
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

pub fn parse_period(s: &str) -> Result<Period, String> {
    Period::parse(&s.to_lowercase()).ok_or_else(|| {
        format!(
            "invalid goal type '{}', expected daily/weekly/monthly/yearly",
            s
        )
    })
}

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Writing sprints and word-count goals for Discord guilds", long_about = None)]
pub struct Cli {
    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "QUILL_DATABASE")]
    pub database: Option<PathBuf>,

    /// Discord bot token. Without one, messages are only logged.
    #[arg(long, global = true, env = "QUILL_DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// Discord REST API base URL
    #[arg(long, global = true, env = "QUILL_DISCORD_API", default_value = DISCORD_API)]
    pub discord_api: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the job scheduler
    Daemon {
        /// Job poll interval in seconds
        #[arg(long, env = "QUILL_POLL_INTERVAL", default_value = "15")]
        poll_interval: u64,
    },

    /// List scheduled jobs
    Jobs {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sprint commands, issued as a guild member
    Sprint {
        #[command(flatten)]
        caller: CallerArgs,

        #[command(subcommand)]
        command: SprintCommand,
    },

    /// Word-count goals
    Goal {
        /// Goal owner
        #[arg(long, env = "QUILL_USER")]
        user: u64,

        #[command(subcommand)]
        command: GoalCommand,
    },

    /// Create a writing project
    Project {
        /// Project owner
        #[arg(long, env = "QUILL_USER")]
        user: u64,

        /// Short name used to refer to the project
        shortname: String,

        /// Display name
        name: String,
    },

    /// Change a user or guild setting
    Setting {
        #[command(subcommand)]
        command: SettingCommand,
    },
}

/// Who a sprint command is issued as.
#[derive(Args, Debug, Clone)]
pub struct CallerArgs {
    #[arg(long, env = "QUILL_GUILD")]
    pub guild: u64,

    #[arg(long, env = "QUILL_CHANNEL")]
    pub channel: u64,

    #[arg(long, env = "QUILL_USER")]
    pub user: u64,

    /// Act with moderator permission
    #[arg(long)]
    pub moderator: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SprintCommand {
    /// Create a sprint and join it
    Start {
        /// Length in minutes (1 to 60)
        #[arg(default_value = "20")]
        length: i64,

        /// Start after this many minutes
        #[arg(long = "in", conflicts_with = "at")]
        delay: Option<i64>,

        /// Start at this minute past the hour, in your timezone
        #[arg(long)]
        at: Option<i64>,
    },

    /// Join the running sprint
    Join {
        /// Word count you are starting from
        initial: Option<i64>,

        /// Take part without counting words
        #[arg(long)]
        no_wordcount: bool,

        /// Credit words to this project
        #[arg(long)]
        project: Option<String>,
    },

    /// Join with the settings and final count of your last sprint
    JoinSame,

    /// Leave the sprint
    Leave,

    /// Declare your total word count
    Wc { amount: i64 },

    /// Add to (or subtract from) your word count
    Wrote {
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Credit this sprint's words to a project
    Project { shortname: String },

    /// End the sprint now
    End,

    /// Cancel the sprint
    Cancel,

    /// Your progress in the sprint
    Status,

    /// Time until the sprint starts or ends
    Time,

    /// Your best words per minute
    Pb,

    /// Be told about new sprints in this guild
    Notify {
        #[arg(value_parser = parse_bool, action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GoalCommand {
    /// Set a goal
    Set {
        #[arg(value_parser = parse_period)]
        period: Period,
        words: i64,
    },

    /// Remove a goal
    Delete {
        #[arg(value_parser = parse_period)]
        period: Period,
    },

    /// Show progress towards goals
    Check {
        #[arg(value_parser = parse_period)]
        period: Option<Period>,
    },

    /// Show past periods
    History {
        #[arg(value_parser = parse_period)]
        period: Period,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SettingCommand {
    /// Set one of your settings (timezone, maxwpm)
    User {
        #[arg(long, env = "QUILL_USER")]
        user: u64,
        name: String,
        value: String,
    },

    /// Set a guild setting (sprint_delay_end)
    Guild {
        #[arg(long, env = "QUILL_GUILD")]
        guild: u64,
        name: String,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Ok(true));
        assert_eq!(parse_bool("off"), Ok(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_sprint_start_options() {
        let cli = Cli::try_parse_from([
            "quill", "sprint", "--guild", "1", "--channel", "2", "--user", "3", "start", "30",
            "--in", "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Sprint { caller, command } => {
                assert_eq!((caller.guild, caller.channel, caller.user), (1, 2, 3));
                assert!(!caller.moderator);
                assert_eq!(
                    command,
                    SprintCommand::Start {
                        length: 30,
                        delay: Some(5),
                        at: None
                    }
                );
            }
            _ => panic!("expected sprint command"),
        }
    }

    #[test]
    fn test_start_in_and_at_conflict() {
        let result = Cli::try_parse_from([
            "quill", "sprint", "--guild", "1", "--channel", "2", "--user", "3", "start", "--in",
            "5", "--at", "30",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_wrote() {
        let cli = Cli::try_parse_from([
            "quill", "sprint", "--guild", "1", "--channel", "2", "--user", "3", "wrote", "-50",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Sprint {
                command: SprintCommand::Wrote { amount: -50 },
                ..
            }
        ));
    }

    #[test]
    fn test_goal_period_is_case_insensitive() {
        let cli = Cli::try_parse_from(["quill", "goal", "--user", "3", "set", "Weekly", "5000"])
            .unwrap();

        assert!(matches!(
            cli.command,
            Commands::Goal {
                user: 3,
                command: GoalCommand::Set {
                    period: Period::Weekly,
                    words: 5000
                }
            }
        ));
    }
}
