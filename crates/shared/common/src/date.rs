//! Lenient date and date-time parsing.
//!
//! Input is matched against a fixed, ordered family of shapes (year first,
//! then day first, then month/year, then two-digit years) for each separator
//! in `"" / - .`. The first shape that matches structurally *and* produces a
//! real date inside [`min_date`]..=[`max_date`] wins. Nothing matching yields
//! `None`, never an error.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use domain::DataError;

/// Earliest accepted year.
pub const MIN_YEAR: i32 = 1870;

/// Accepted years reach this far past the current one.
pub const MAX_YEARS_AHEAD: i32 = 100;

const SEPARATORS: &[&str] = &["", "/", "-", "."];

const DATE_SHAPES: &[&[&str]] = &[
    &["yyyy"],
    &["yyyy", "MM", "dd"],
    &["yyyy", "MM", "d"],
    &["yyyy", "M", "dd"],
    &["yyyy", "M", "d"],
    &["yyyy", "MM"],
    &["yyyy", "M"],
    &["dd", "MM", "yyyy"],
    &["d", "MM", "yyyy"],
    &["dd", "M", "yyyy"],
    &["d", "M", "yyyy"],
    &["MM", "yyyy"],
    &["M", "yyyy"],
    &["dd", "MM", "yy"],
    &["d", "MM", "yy"],
    &["dd", "M", "yy"],
    &["d", "M", "yy"],
    &["MM", "yy"],
    &["M", "yy"],
];

/// Year-first shapes mixing one- and two-digit fields are ambiguous
/// without a separator.
const MIXED_WIDTH_SHAPES: &[&[&str]] = &[
    &["yyyy", "MM", "d"],
    &["yyyy", "M", "dd"],
    &["yyyy", "M", "d"],
];

struct DatePattern {
    format: String,
    regex: Regex,
}

static DATE_PATTERNS: Lazy<Vec<DatePattern>> = Lazy::new(|| {
    let mut patterns = Vec::new();
    for &separator in SEPARATORS {
        for shape in DATE_SHAPES {
            if separator.is_empty() && MIXED_WIDTH_SHAPES.contains(shape) {
                continue;
            }
            let body: Vec<&str> = shape.iter().map(|token| token_regex(token)).collect();
            let regex = format!("^{}$", body.join(regex::escape(separator).as_str()));
            patterns.push(DatePattern {
                format: shape.join(separator),
                regex: Regex::new(&regex).expect("valid date pattern"),
            });
        }
    }
    patterns
});

/// `HH:mm`, `HH:mm:ss` or `HH:mm:ss.SSS`, optionally followed by a zone.
static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<h>[01][0-9]|2[0-3]):(?P<min>[0-5][0-9])(?::(?P<s>[0-5][0-9])(?:\.(?P<f>[0-9]{1,9}))?)?(?P<zone>Z|[+-](?:[01][0-9]|2[0-3]):?[0-5][0-9])?$",
    )
    .expect("valid time pattern")
});

fn token_regex(token: &str) -> &'static str {
    match token {
        "yyyy" => "(?P<y4>[1-2][0-9]{3})",
        "yy" => "(?P<y2>[0-9]{2})",
        "MM" => "(?P<m>0[1-9]|1[0-2])",
        "M" => "(?P<m>[1-9])",
        "dd" => "(?P<d>[0-3][0-9])",
        _ => "(?P<d>[1-9])",
    }
}

/// January 1st, 1870.
pub fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(MIN_YEAR, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// January 1st of the year a century from now.
pub fn max_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(Utc::now().year() + MAX_YEARS_AHEAD, 1, 1).unwrap_or(NaiveDate::MAX)
}

/// Inclusive range check.
pub fn is_valid_date(date: NaiveDate) -> bool {
    date >= min_date() && date <= max_date()
}

fn capture_number(captures: &Captures<'_>, name: &str) -> Option<u32> {
    captures.name(name).and_then(|m| m.as_str().parse().ok())
}

fn date_from_captures(captures: &Captures<'_>) -> Option<NaiveDate> {
    let year = match (capture_number(captures, "y4"), capture_number(captures, "y2")) {
        (Some(year), _) => year as i32,
        (None, Some(short)) => 2000 + short as i32,
        (None, None) => return None,
    };
    let month = capture_number(captures, "m").unwrap_or(1);
    let day = capture_number(captures, "d").unwrap_or(1);

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a date in any supported shape. Returns the first in-range match.
pub fn parse_valid_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DATE_PATTERNS.iter().find_map(|pattern| {
        let date = pattern
            .regex
            .captures(value)
            .and_then(|c| date_from_captures(&c))?;
        if is_valid_date(date) {
            tracing::trace!(value, format = %pattern.format, "date matched");
            Some(date)
        } else {
            None
        }
    })
}

/// Split `date[T| ]time`.
fn split_date_time(value: &str) -> Option<(&str, &str)> {
    let index = value.find(['T', ' '])?;
    Some((&value[..index], &value[index + 1..]))
}

struct TimeParts {
    time: NaiveTime,
    offset: Option<FixedOffset>,
}

fn parse_time(value: &str) -> Option<TimeParts> {
    let captures = TIME_PATTERN.captures(value)?;
    let hour = capture_number(&captures, "h")?;
    let minute = capture_number(&captures, "min")?;
    let second = capture_number(&captures, "s").unwrap_or(0);
    let nanos = captures
        .name("f")
        .map(|f| {
            let digits = f.as_str();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().unwrap_or(0) * scale
        })
        .unwrap_or(0);

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    let offset = match captures.name("zone").map(|z| z.as_str()) {
        None => None,
        Some(zone) => Some(parse_offset(zone)?),
    };

    Some(TimeParts { time, offset })
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if zone == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone[1..].chars().filter(char::is_ascii_digit).collect();
    let hours: i32 = digits.get(..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..)?.parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parse a date-time; a bare date is read as start of day.
pub fn parse_valid_date_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    match split_date_time(value) {
        Some((date, time)) => {
            let date = parse_valid_date(date)?;
            let parts = parse_time(time).filter(|p| p.offset.is_none())?;
            Some(date.and_time(parts.time))
        }
        None => parse_valid_date(value).map(start_of_day),
    }
}

/// Parse a zoned date-time. Without a zone the local offset is assumed.
pub fn parse_valid_zoned_date_time(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Some((date, time)) = split_date_time(value) {
        if let Some(TimeParts {
            time,
            offset: Some(offset),
        }) = parse_time(time)
        {
            let date = parse_valid_date(date)?;
            return offset.from_local_datetime(&date.and_time(time)).single();
        }
    }

    let local = parse_valid_date_time(value)?;
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(dt.offset()))
}

/// Parse with an explicit chrono format.
pub fn parse_date_with_format(value: &str, format: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(value.trim(), format)
        .map_err(|_| DataError::invalid_date(value, format))
}

pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last representable instant of the day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::nanoseconds(1)
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = first_day_of_month(date);
    first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}

pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Whole months between two dates.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if months > 0 && to.day() < from.day() {
        months -= 1;
    } else if months < 0 && to.day() > from.day() {
        months += 1;
    }
    months
}

pub fn years_between(from: NaiveDate, to: NaiveDate) -> i32 {
    months_between(from, to) / 12
}

/// Age in whole years on `today`.
pub fn age(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    years_between(birth_date, today).max(0)
}
