use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use thiserror::Error;

use super::lexicon::{month_number, MONTH_PATTERN};
use crate::entry::MeetingType;

static CROSS_SLASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<m1>{MONTH_PATTERN})\b\.?/(?P<m2>{MONTH_PATTERN})\b\.?\s+(?P<d1>\d{{1,2}})\s*[-–—]\s*(?P<d2>\d{{1,2}})\b"
    ))
    .unwrap()
});
static CROSS_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<m1>{MONTH_PATTERN})\b\.?\s+(?P<d1>\d{{1,2}})\s*[-–—]\s*(?P<m2>{MONTH_PATTERN})\b\.?\s+(?P<d2>\d{{1,2}})\b"
    ))
    .unwrap()
});
static SAME_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?P<m1>{MONTH_PATTERN})\b\.?\s+(?P<d1>\d{{1,2}})\s*[-–—]\s*(?P<d2>\d{{1,2}})\b"
    ))
    .unwrap()
});
static SINGLE_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?P<m1>{MONTH_PATTERN})\b\.?\s+(?P<d1>\d{{1,2}})\b")).unwrap()
});
static NOTE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^)]+)\)").unwrap());
static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Where qualifier keywords are looked for.
///
/// The pages are not consistent about it, so each pipeline picks one: the
/// calendar pages put qualifiers in a parenthetical next to the date, the
/// historical year pages mention them anywhere in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierScope {
    Note,
    FullText,
}

/// A recovered date range plus the flags read from the same text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub meeting_type: MeetingType,
    pub is_cancelled: bool,
    pub has_sep_projections: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateParseError {
    #[error("no date expression in {0:?}")]
    NoDate(String),
    #[error("{year}-{month:02}-{day:02} is not a calendar date")]
    InvalidDay { year: i32, month: u32, day: u32 },
    #[error("range ends {end} before it starts {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Collapse runs of whitespace and trim.
pub fn normalize_ws(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// True when the text carries any meeting qualifier keyword.
pub fn has_qualifier(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("unscheduled")
        || lower.contains("notation vote")
        || is_cancelled_text(&lower)
}

fn is_cancelled_text(lower: &str) -> bool {
    lower.contains("cancelled") || lower.contains("canceled")
}

/// Meeting type and cancellation read from a qualifier haystack. A notation
/// vote outranks "unscheduled" when both appear.
pub fn read_qualifiers(haystack: &str) -> (MeetingType, bool) {
    let lower = haystack.to_lowercase();
    let meeting_type = if lower.contains("notation vote") {
        MeetingType::NotationVote
    } else if lower.contains("unscheduled") {
        MeetingType::Unscheduled
    } else {
        MeetingType::Scheduled
    };
    (meeting_type, is_cancelled_text(&lower))
}

/// Recover a meeting's date range from free text under a contextual year.
///
/// Patterns are tried in priority order, not text position: cross-month
/// (`Dec/Jan 31-1` or `Dec 31-Jan 1`), same-month (`Mar 18-19`), single day
/// (`Mar 19`). A cross-month range whose second month is numerically smaller
/// ends in `year + 1`. Asterisks mark projections and parenthetical notes
/// are removed before matching.
pub fn parse_date_range(
    year: i32,
    text: &str,
    scope: QualifierScope,
    projection_signal: bool,
) -> Result<DateSpan, DateParseError> {
    let had_star = text.contains('*');
    let text = normalize_ws(&text.replace('*', ""));

    let notes: Vec<&str> = NOTE_RE
        .captures_iter(&text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect();
    let bare = normalize_ws(&NOTE_RE.replace_all(&text, " "));

    let (start, end) = match_range(year, &bare)?;
    if end < start {
        return Err(DateParseError::Inverted { start, end });
    }

    let (meeting_type, is_cancelled) = match scope {
        QualifierScope::Note => read_qualifiers(&notes.join(" ")),
        QualifierScope::FullText => read_qualifiers(&text),
    };

    Ok(DateSpan {
        start,
        end,
        meeting_type,
        is_cancelled,
        has_sep_projections: had_star || projection_signal,
    })
}

fn match_range(year: i32, text: &str) -> Result<(NaiveDate, NaiveDate), DateParseError> {
    for re in [&*CROSS_SLASH_RE, &*CROSS_SPAN_RE] {
        if let Some(caps) = re.captures(text) {
            let m1 = month(&caps, "m1");
            let m2 = month(&caps, "m2");
            let end_year = if m2 < m1 { year + 1 } else { year };
            let start = make_date(year, m1, day(&caps, "d1"))?;
            let end = make_date(end_year, m2, day(&caps, "d2"))?;
            return Ok((start, end));
        }
    }
    if let Some(caps) = SAME_MONTH_RE.captures(text) {
        let m = month(&caps, "m1");
        let start = make_date(year, m, day(&caps, "d1"))?;
        let end = make_date(year, m, day(&caps, "d2"))?;
        return Ok((start, end));
    }
    if let Some(caps) = SINGLE_DAY_RE.captures(text) {
        let date = make_date(year, month(&caps, "m1"), day(&caps, "d1"))?;
        return Ok((date, date));
    }
    Err(DateParseError::NoDate(text.to_string()))
}

// Unknown tokens cannot reach here: the patterns only admit lexicon months.
fn month(caps: &Captures, name: &str) -> u32 {
    caps.name(name)
        .and_then(|m| month_number(m.as_str()))
        .unwrap_or(0)
}

fn day(caps: &Captures, name: &str) -> u32 {
    caps.name(name)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn make_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, DateParseError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or(DateParseError::InvalidDay { year, month, day })
}
