//! One-shot operator commands.
//!
//! Each returns the reply a user would see. Sprint commands return `None`
//! when the service has already posted to the channel itself.

use chrono::DateTime;
use miette::Result;

use quill_goals::{GoalError, GoalRecord, Period, boundary};
use quill_scheduler::Job;
use quill_sprint::{Caller, ParticipationKind, SprintError, StartAt, messages};
use quill_store::{guild_setting, setting};

use crate::app::App;
use crate::cli::{CallerArgs, GoalCommand, SettingCommand, SprintCommand};

impl From<CallerArgs> for Caller {
    fn from(args: CallerArgs) -> Self {
        Caller {
            guild: args.guild,
            channel: args.channel,
            user: args.user,
            can_manage: args.moderator,
            interaction: None,
        }
    }
}

pub async fn sprint(
    app: &App,
    caller: &Caller,
    command: SprintCommand,
) -> Result<Option<String>, SprintError> {
    let service = &app.sprints;
    let user = caller.user;

    let reply = match command {
        SprintCommand::Start { length, delay, at } => {
            let start_at = match (delay, at) {
                (Some(minutes), _) => StartAt::InMinutes(minutes),
                (None, Some(minute)) => StartAt::AtMinute(minute),
                (None, None) => StartAt::Now,
            };
            service.create(caller, length, start_at).await?;
            None
        }
        SprintCommand::Join {
            initial,
            no_wordcount,
            project,
        } => {
            let kind = if no_wordcount {
                ParticipationKind::NoWordcount
            } else {
                ParticipationKind::Normal
            };
            let receipt = service
                .join(caller, initial, kind, project.as_deref())
                .await?;
            Some(receipt.message())
        }
        SprintCommand::JoinSame => Some(service.join_same(caller).await?.message()),
        SprintCommand::Leave => {
            let receipt = service.leave(caller).await?;
            (!receipt.sprint_cancelled).then(|| messages::LEFT.to_string())
        }
        SprintCommand::Wc { amount } => Some(service.declare(caller, amount).await?.message()),
        SprintCommand::Wrote { amount } => Some(service.adjust(caller, amount).await?.message()),
        SprintCommand::Project { shortname } => {
            let project = service.set_project(caller, &shortname).await?;
            Some(messages::sprinting_in_project(&project.name))
        }
        SprintCommand::End => {
            service.force_end(caller).await?;
            None
        }
        SprintCommand::Cancel => {
            service.cancel(caller).await?;
            None
        }
        SprintCommand::Status => Some(service.status(caller).await?.message()),
        SprintCommand::Time => Some(service.time_left(caller.guild).await?.message()),
        SprintCommand::Pb => Some(messages::personal_best(
            service.personal_best(user).await?,
        )),
        SprintCommand::Notify { enabled } => {
            service.set_notify(caller, enabled).await?;
            Some(messages::notify_changed(enabled).to_string())
        }
    };

    Ok(reply.map(|text| messages::reply(user, &text)))
}

/// Render a sprint error for the terminal.
pub fn sprint_report(user: u64, e: SprintError) -> miette::Report {
    if e.is_user_facing() {
        miette::miette!("{}", messages::reply(user, &e.to_string()))
    } else {
        miette::miette!("{}", e)
    }
}

fn progress_line(record: &GoalRecord) -> String {
    format!(
        "{} goal: {}/{} words ({}%){}",
        record.period,
        record.current,
        record.goal,
        record.percent(),
        if record.completed { " :tada:" } else { "" }
    )
}

pub async fn goal(app: &App, user: u64, command: GoalCommand) -> Result<String, GoalError> {
    let tracker = &app.goals;

    let text = match command {
        GoalCommand::Set { period, words } => {
            let record = tracker.set_goal(user, period, words).await?;
            format!(
                "your {} goal is now **{}** words. {}",
                period,
                record.goal,
                progress_line(&record)
            )
        }
        GoalCommand::Delete { period } => {
            if tracker.delete_goal(user, period).await? {
                format!("your {} goal has been deleted.", period)
            } else {
                format!("you do not have a {} goal.", period)
            }
        }
        GoalCommand::Check { period } => {
            let periods = match period {
                Some(period) => vec![period],
                None => Period::ALL.to_vec(),
            };
            let mut lines = Vec::new();
            for period in periods {
                if let Some(record) = tracker.goal(user, period).await? {
                    lines.push(progress_line(&record));
                }
            }
            if lines.is_empty() {
                "you have not set any goals. Try `goal set daily 500`.".to_string()
            } else {
                lines.join("\n")
            }
        }
        GoalCommand::History { period } => {
            let entries = tracker.history(user, period).await?;
            if entries.is_empty() {
                format!("you have no {} goal history yet.", period)
            } else {
                entries
                    .iter()
                    .map(|e| {
                        format!(
                            "{}: {}/{} words{}",
                            e.label,
                            e.result,
                            e.goal,
                            if e.completed { " :white_check_mark:" } else { "" }
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    };

    Ok(messages::reply(user, &text))
}

fn format_due(due_at: i64) -> String {
    DateTime::from_timestamp(due_at, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| due_at.to_string())
}

fn job_line(job: &Job) -> String {
    let mut line = format!("{:>6}  {:<24} due {}", job.id, job.key().to_string(), format_due(job.due_at));
    if let quill_scheduler::JobSchedule::Interval { seconds } = job.schedule {
        line.push_str(&format!(", every {}s", seconds));
    }
    if job.claimed {
        line.push_str(" (running)");
    }
    line
}

pub async fn jobs(app: &App, json: bool) -> Result<String> {
    let jobs = app
        .queue
        .list()
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    if json {
        return serde_json::to_string_pretty(&jobs)
            .map_err(|e| miette::miette!("failed to serialize jobs: {}", e));
    }
    if jobs.is_empty() {
        return Ok("No jobs scheduled.".to_string());
    }
    Ok(jobs.iter().map(job_line).collect::<Vec<_>>().join("\n"))
}

pub fn create_project(app: &App, user: u64, shortname: &str, name: &str) -> Result<String> {
    let project = app
        .store
        .create_project(user, shortname, name)
        .map_err(|e| miette::miette!("failed to create project {}: {}", shortname, e))?;
    Ok(format!(
        "Created project **{}** (`{}`).",
        project.name, project.shortname
    ))
}

pub fn change_setting(app: &App, command: SettingCommand) -> Result<String> {
    match command {
        SettingCommand::User { user, name, value } => {
            match name.as_str() {
                setting::TIMEZONE => {
                    if boundary::resolve_timezone(Some(value.as_str())).is_none() {
                        return Err(miette::miette!("unknown timezone: {}", value));
                    }
                }
                setting::MAX_WPM => {
                    value
                        .parse::<u32>()
                        .map_err(|_| miette::miette!("maxwpm must be a whole number"))?;
                }
                other => return Err(miette::miette!("unknown user setting: {}", other)),
            }
            app.store
                .set_user_setting(user, &name, &value)
                .map_err(|e| miette::miette!("{}", e))?;
        }
        SettingCommand::Guild { guild, name, value } => {
            if name != guild_setting::SPRINT_DELAY_END {
                return Err(miette::miette!("unknown guild setting: {}", name));
            }
            value
                .parse::<u32>()
                .map_err(|_| miette::miette!("{} must be a whole number of minutes", name))?;
            app.store
                .set_guild_setting(guild, &name, &value)
                .map_err(|e| miette::miette!("{}", e))?;
        }
    }
    Ok("Setting updated.".to_string())
}
