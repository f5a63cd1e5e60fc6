//! Date strings as printed on detail pages, e.g. `Apr 29 @ 9:47am MDT (Start)`.
//!
//! The site prints no year; callers pass the year to assume. Explicit US
//! zone abbreviations map to their fixed offsets. `MT` and anything
//! unrecognized are read in the site's own zone, America/Denver, with DST.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Denver;
use regex::Regex;

static START_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Za-z]{3} \d{1,2} @ [\d:apm]+ [A-Za-z]{2,4}) ?\(Start\)").expect("invalid regex")
});

static END_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Za-z]{3} \d{1,2} @ [\d:apm]+ [A-Za-z]{2,4}) ?\(End\)").expect("invalid regex")
});

static COMPONENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([A-Za-z]+) (\d{1,2}) (\d{1,2}):(\d{2}) ?([ap])m ([A-Za-z]+)").expect("invalid regex")
});

/// Which bound of the auction a printed date marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMark {
    Start,
    End,
}

/// Find the date marked `(Start)` or `(End)` in `text` and parse it.
pub fn parse_marked_date(text: &str, mark: DateMark, year: i32) -> Option<DateTime<Utc>> {
    let pattern = match mark {
        DateMark::Start => &*START_MARK,
        DateMark::End => &*END_MARK,
    };
    let raw = pattern.captures(text)?.get(1)?.as_str();
    let parsed = parse_site_date(raw, year);
    if parsed.is_none() {
        tracing::warn!(date = raw, "could not parse auction date");
    }
    parsed
}

/// Parse `"<Mon> <Day> @ <H>:<MM><am|pm> <TZ>"` in `year` into a UTC instant.
pub fn parse_site_date(raw: &str, year: i32) -> Option<DateTime<Utc>> {
    let cleaned = raw.replace('@', " ");
    let cleaned = super::squash_whitespace(&cleaned);
    let caps = COMPONENTS.captures(&cleaned)?;

    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let mut hour: u32 = caps[3].parse().ok()?;
    let minute: u32 = caps[4].parse().ok()?;

    match caps[5].to_ascii_lowercase().as_str() {
        "p" if hour < 12 => hour += 12,
        "a" if hour == 12 => hour = 0,
        _ => {}
    }

    let local = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;

    match fixed_offset_hours(&caps[6]) {
        Some(hours) => FixedOffset::east_opt(hours * 3600)?
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        None => site_local_to_utc(&local),
    }
}

/// Ambiguous fall-back times take the earlier instant; times inside the
/// spring-forward gap are read one hour later.
fn site_local_to_utc(local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    Denver
        .from_local_datetime(local)
        .earliest()
        .or_else(|| Denver.from_local_datetime(&(*local + chrono::Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

fn month_number(name: &str) -> Option<u32> {
    let prefix = name.get(..3)?.to_ascii_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// UTC offset in hours for a DST-explicit zone abbreviation. `None` means
/// the site zone applies.
fn fixed_offset_hours(abbrev: &str) -> Option<i32> {
    let hours = match abbrev.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        _ => return None,
    };
    Some(hours)
}
