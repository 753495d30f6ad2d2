//! Natural-language time references.
//!
//! Recognizes a small fixed vocabulary relative to a reference "now":
//!
//! | Phrase                                | Anchor                       |
//! |---------------------------------------|------------------------------|
//! | `YYYY-MM-DD`                          | noon UTC on that date        |
//! | `N minutes/hours/days/weeks ago`      | now minus N units            |
//! | `a week ago`, `an hour ago`, ...      | now minus one unit           |
//! | `last night`                          | 21:00 the previous day       |
//! | `this morning`                        | 09:00 today                  |
//! | `yesterday`                           | now minus one day            |
//! | `today`                               | now                          |
//! | `last week`                           | now minus seven days         |
//! | `last month`                          | now minus thirty days        |
//!
//! All times are UTC. The first kind of match in the table wins.

use std::sync::LazyLock;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use regex::Regex;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static RELATIVE_AGO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+|an?|one|two|three|four|five|six|seven|eight|nine|ten)\s+(minute|min|hour|day|week|month)s?\s+ago\b",
    )
    .unwrap()
});

static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(last night|this morning|yesterday|today|last week|last month)\b").unwrap()
});

/// A resolved time reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeReference {
    /// Point in time the phrase refers to.
    pub anchor: DateTime<Utc>,
    /// The matched phrase, lowercased.
    pub phrase: String,
}

/// Find the first time reference in `text`, resolved against `now`.
pub fn parse_time_reference(text: &str, now: DateTime<Utc>) -> Option<TimeReference> {
    let lower = text.to_lowercase();
    iso_date(&lower)
        .or_else(|| relative_ago(&lower, now))
        .or_else(|| named(&lower, now))
}

fn iso_date(text: &str) -> Option<TimeReference> {
    ISO_DATE.captures_iter(text).find_map(|caps| {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(TimeReference {
            anchor: date.and_time(NaiveTime::from_hms_opt(12, 0, 0)?).and_utc(),
            phrase: caps[0].to_string(),
        })
    })
}

fn relative_ago(text: &str, now: DateTime<Utc>) -> Option<TimeReference> {
    let caps = RELATIVE_AGO.captures(text)?;
    let count = parse_count(&caps[1])?;
    let delta = match &caps[2] {
        "minute" | "min" => TimeDelta::try_minutes(count)?,
        "hour" => TimeDelta::try_hours(count)?,
        "day" => TimeDelta::try_days(count)?,
        "week" => TimeDelta::try_weeks(count)?,
        "month" => TimeDelta::try_days(count.checked_mul(30)?)?,
        _ => return None,
    };
    Some(TimeReference {
        anchor: now.checked_sub_signed(delta)?,
        phrase: caps[0].to_string(),
    })
}

fn named(text: &str, now: DateTime<Utc>) -> Option<TimeReference> {
    let caps = NAMED.captures(text)?;
    let phrase = &caps[1];
    let today = now.date_naive();
    let anchor = match phrase {
        "last night" => today
            .checked_sub_days(Days::new(1))?
            .and_time(NaiveTime::from_hms_opt(21, 0, 0)?)
            .and_utc(),
        "this morning" => today.and_time(NaiveTime::from_hms_opt(9, 0, 0)?).and_utc(),
        "yesterday" => now.checked_sub_signed(TimeDelta::try_days(1)?)?,
        "today" => now,
        "last week" => now.checked_sub_signed(TimeDelta::try_days(7)?)?,
        "last month" => now.checked_sub_signed(TimeDelta::try_days(30)?)?,
        _ => return None,
    };
    Some(TimeReference {
        anchor,
        phrase: phrase.to_string(),
    })
}

fn parse_count(word: &str) -> Option<i64> {
    let n = match word {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        digits => digits.parse().ok()?,
    };
    Some(n)
}
