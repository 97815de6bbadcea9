//! Chat message text.

use crate::ranking::{COMPLETION_XP, Placing};
use crate::{ParticipationKind, UserId};

pub fn mention(user: UserId) -> String {
    format!("<@{user}>")
}

pub fn mentions(users: &[UserId]) -> String {
    users.iter().map(|u| mention(*u)).collect::<Vec<_>>().join(", ")
}

/// Prefix a reply with the mention of the user it answers.
pub fn reply(user: UserId, text: &str) -> String {
    format!("{}, {}", mention(user), text)
}

pub fn sprint_started(length: u32, participants: &[UserId], subscribers: &[UserId]) -> String {
    let mut message = format!(
        "**Sprint has started**\nGet writing, you have {length} minute(s).\n:wave: {}",
        mentions(participants)
    );
    if !subscribers.is_empty() {
        message.push_str(&format!("\n:bell: {}", mentions(subscribers)));
    }
    message
}

pub fn sprint_scheduled(starts_in_minutes: i64, length: u32, subscribers: &[UserId]) -> String {
    let mut message = format!(
        "**A new sprint has been scheduled**\nSprint will start in approx {starts_in_minutes} minutes and will run for {length} minute(s). Use `/sprint join` to join this sprint."
    );
    if !subscribers.is_empty() {
        message.push_str(&format!("\n:bell: {}", mentions(subscribers)));
    }
    message
}

pub fn pens_down(delay_minutes: u32, participants: &[UserId]) -> String {
    format!(
        "**Time is up**\nPens down. Use `/sprint wc <amount>` to submit your final word counts, you have {delay_minutes} minute(s).\n{}",
        mentions(participants)
    )
}

pub const RESULTS_COMING: &str = "The word counts are in. Results coming up shortly...";

pub const NO_RESULTS: &str =
    "No-one submitted their word counts... I guess I'll just cancel the sprint... :frowning:";

/// Final results: ranked word counts, then everyone who sprinted without one.
pub fn leaderboard(placings: &[Placing], no_wordcount: &[UserId]) -> String {
    if placings.is_empty() && no_wordcount.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut message = String::from(":trophy: **Sprint Results** :trophy:\nCongratulations to everyone.\n");
    for placing in placings {
        let result = &placing.result;
        message.push_str(&format!(
            "`{}`. {} - **{} words** ({:.1} wpm)          +{} xp",
            placing.position,
            mention(result.user),
            result.words,
            result.wpm,
            placing.total_xp()
        ));
        if result.new_personal_best {
            message.push_str("          :champagne: **NEW PB**");
        }
        message.push('\n');
    }
    for user in no_wordcount {
        message.push_str(&format!("{}         +{} xp\n", mention(*user), COMPLETION_XP));
    }
    message
}

pub fn cancelled(participants: &[UserId]) -> String {
    format!("**Sprint has been cancelled**: {}", mentions(participants))
}

pub const EVERYONE_LEFT: &str =
    "**Sprint has been cancelled**\nEverybody left and I'm not doing this alone.";

pub fn joined(kind: ParticipationKind, starting: i64, rejoined: bool, project: Option<&str>) -> String {
    let mut message = match (kind, rejoined) {
        (ParticipationKind::NoWordcount, _) => {
            "you are now sprinting without a word count. You will not be included in the final tallies.".to_string()
        }
        (ParticipationKind::Normal, true) => {
            format!("your starting word count has been set to **{starting}**.")
        }
        (ParticipationKind::Normal, false) => {
            format!("you have joined the sprint with **{starting}** words.")
        }
    };
    if let Some(name) = project {
        message.push_str(&format!(" You are sprinting in your project **{name}**."));
    }
    message
}

pub fn word_count_updated(word_count: i64, written: i64) -> String {
    format!(
        "you updated your word count to: **{word_count}**. Total words written in this sprint: **{written}**."
    )
}

pub fn sprinting_in_project(name: &str) -> String {
    format!("you are now sprinting in your project **{name}**.")
}

pub const LEFT: &str = "you have left the sprint";

pub fn personal_best(wpm: Option<f64>) -> String {
    match wpm {
        Some(wpm) => format!("your personal best is **{wpm}** wpm."),
        None => "you do not yet have a wpm personal best. Get sprinting, if you want one!".to_string(),
    }
}

pub fn status(current: i64, written: i64, elapsed_minutes: f64, wpm: f64, left_minutes: f64) -> String {
    format!(
        "your current word count is: {current} ({written} written in this sprint). You have been sprinting for {elapsed_minutes} minutes, averaging a WPM of **{wpm}**. There are {left_minutes} minutes left until this sprint ends."
    )
}

pub fn starts_in(seconds: i64) -> String {
    let (m, s) = minutes_seconds(seconds);
    format!("sprint begins in {m} minutes, {s} seconds")
}

pub fn remaining(seconds: i64) -> String {
    let (m, s) = minutes_seconds(seconds);
    format!("{m} minutes, {s} seconds remaining")
}

pub const AWAITING_WORD_COUNTS: &str = "waiting for final word counts. If the results haven't been posted after everyone has declared, try forcing the sprint to end with `sprint end`";

pub fn notify_changed(enabled: bool) -> &'static str {
    if enabled {
        "You will be notified of any new sprints which are scheduled on this server."
    } else {
        "You will no longer be notified of any new sprints which are scheduled on this server."
    }
}

fn minutes_seconds(seconds: i64) -> (i64, i64) {
    let seconds = seconds.max(0);
    (seconds / 60, seconds % 60)
}
