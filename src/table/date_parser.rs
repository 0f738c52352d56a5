use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::table::utils::clean_str;

/// Field order for `a/b/YYYY` and `a-b-YYYY` literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

impl DateOrder {
    /// A literal containing `/` is read day-first, anything else with the default ordering.
    pub fn for_literal(s: &str) -> Self {
        if s.contains('/') {
            DateOrder::DayFirst
        } else {
            DateOrder::MonthFirst
        }
    }
}

/// Parse a date or date-time literal.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYYMMDD` and `a/b/YYYY` (ordered by
/// `order`, falling back to the other ordering when the preferred one is not a
/// calendar date), each optionally followed by ` HH:MM[:SS[.fff]]` or `THH:MM:SS`.
pub fn parse_datetime(s: &str, order: DateOrder) -> Option<NaiveDateTime> {
    let s = clean_str(s);
    if s.is_empty() {
        return None;
    }

    let (date_part, time_part) = match s.split_once([' ', 'T']) {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s.as_str(), None),
    };

    let date = parse_date(date_part, order)?;
    let time = match time_part {
        None | Some("") => NaiveTime::MIN,
        Some(t) => parse_time(t)?,
    };
    Some(date.and_time(time))
}

/// Millisecond timestamp (no timezone) for a parsed literal.
pub fn parse_timestamp_millis(s: &str, order: DateOrder) -> Option<i64> {
    parse_datetime(s, order).map(|dt| dt.and_utc().timestamp_millis())
}

pub fn millis_to_datetime(ms: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

/// `YYYY-MM-DD` rendering used by every plot payload.
pub fn format_day(ms: i64) -> Option<String> {
    millis_to_datetime(ms).map(|dt| dt.format("%Y-%m-%d").to_string())
}

fn parse_date(s: &str, order: DateOrder) -> Option<NaiveDate> {
    // YYYYMMDD
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let y: i32 = s[0..4].parse().ok()?;
        let m: u32 = s[4..6].parse().ok()?;
        let d: u32 = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let sep = if s.contains('/') {
        '/'
    } else if s.contains('-') {
        '-'
    } else {
        return None;
    };

    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    // year-first whenever the leading field is a four digit year
    if parts[0].len() == 4 {
        let y: i32 = parts[0].parse().ok()?;
        let m: u32 = parts[1].parse().ok()?;
        let d: u32 = parts[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }

    let (a, b, y) = day_month_fields(&parts)?;
    let (day_first, month_first) = (
        NaiveDate::from_ymd_opt(y, b, a),
        NaiveDate::from_ymd_opt(y, a, b),
    );
    match order {
        DateOrder::DayFirst => day_first.or(month_first),
        DateOrder::MonthFirst => month_first.or(day_first),
    }
}

/// `(a, b, year)` of an `a/b/YYYY` or `a-b-YY` literal split on its separator.
fn day_month_fields(parts: &[&str]) -> Option<(u32, u32, i32)> {
    Some((parts[0].parse().ok()?, parts[1].parse().ok()?, parse_year(parts[2])?))
}

/// True when `cell` is an `a/b/YYYY` date that is a calendar date only day-first.
fn only_day_first(cell: &str) -> bool {
    let cell = clean_str(cell);
    let date = cell.split([' ', 'T']).next().unwrap_or_default();
    let sep = if date.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = date.split(sep).collect();
    if parts.len() != 3 || parts[0].len() == 4 || parts.iter().any(|p| p.is_empty()) {
        return false;
    }
    matches!(
        day_month_fields(&parts),
        Some((a, b, y)) if NaiveDate::from_ymd_opt(y, a, b).is_none()
            && NaiveDate::from_ymd_opt(y, b, a).is_some()
    )
}

/// One ordering for a whole text column: day-first as soon as any cell can
/// only be read that way, month-first otherwise.
pub fn column_order<'a>(cells: impl IntoIterator<Item = &'a str>) -> DateOrder {
    if cells.into_iter().any(only_day_first) {
        DateOrder::DayFirst
    } else {
        DateOrder::MonthFirst
    }
}

fn parse_year(s: &str) -> Option<i32> {
    let y: i32 = s.parse().ok()?;
    match s.len() {
        4 => Some(y),
        2 => Some(2000 + y),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}
