//! Period boundaries in a user's timezone.
//!
//! Goals reset at local midnight: the next day, the next Monday, the first
//! of the next month or the first of the next year. When local midnight does
//! not exist because of a DST gap, the reset happens at 01:00 instead; when
//! it occurs twice, the earlier instant wins.

use chrono::{Datelike, Days, LocalResult, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::Period;

/// Parse an IANA timezone setting. An unset timezone means UTC.
pub fn resolve_timezone(name: Option<&str>) -> Option<Tz> {
    match name {
        None => Some(Tz::UTC),
        Some(name) => name.parse::<Tz>().ok(),
    }
}

/// Epoch seconds of the first boundary of `period` after `now`.
pub fn next_boundary(tz: Tz, period: Period, now: i64) -> Option<i64> {
    let today = local_date(tz, now)?;
    let next = match period {
        Period::Daily => today.succ_opt()?,
        Period::Weekly => {
            let days_to_monday = 7 - u64::from(today.weekday().num_days_from_monday());
            today.checked_add_days(Days::new(days_to_monday))?
        }
        Period::Monthly => today.with_day(1)?.checked_add_months(Months::new(1))?,
        Period::Yearly => NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)?,
    };
    local_midnight(tz, next)
}

/// Name of the period that just ended, for the history table.
pub fn previous_label(tz: Tz, period: Period, now: i64) -> Option<String> {
    const DAY: &str = "%d %b %Y";

    let today = local_date(tz, now)?;
    let label = match period {
        Period::Daily => today.pred_opt()?.format(DAY).to_string(),
        Period::Weekly => {
            let week_ago = today.checked_sub_days(Days::new(7))?;
            format!("{} - {}", week_ago.format(DAY), today.format(DAY))
        }
        Period::Monthly => today
            .checked_sub_months(Months::new(1))?
            .format("%b %Y")
            .to_string(),
        Period::Yearly => (today.year() - 1).to_string(),
    };
    Some(label)
}

fn local_date(tz: Tz, now: i64) -> Option<NaiveDate> {
    let instant = Utc.timestamp_opt(now, 0).single()?;
    Some(instant.with_timezone(&tz).date_naive())
}

fn local_midnight(tz: Tz, date: NaiveDate) -> Option<i64> {
    match tz.from_local_datetime(&date.and_hms_opt(0, 0, 0)?) {
        LocalResult::Single(t) => Some(t.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp()),
        LocalResult::None => tz
            .from_local_datetime(&date.and_hms_opt(1, 0, 0)?)
            .earliest()
            .map(|t| t.timestamp()),
    }
}
