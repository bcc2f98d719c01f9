use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Classification derived from the qualifiers attached to a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeetingType {
    Scheduled,
    Unscheduled,
    #[serde(rename = "Notation Vote")]
    NotationVote,
}

impl MeetingType {
    pub fn as_str(self) -> &'static str {
        match self {
            MeetingType::Scheduled => "Scheduled",
            MeetingType::Unscheduled => "Unscheduled",
            MeetingType::NotationVote => "Notation Vote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Scheduled" => Some(MeetingType::Scheduled),
            "Unscheduled" => Some(MeetingType::Unscheduled),
            "Notation Vote" => Some(MeetingType::NotationVote),
            _ => None,
        }
    }
}

impl fmt::Display for MeetingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `(year, start_date, end_date)`: two records with the same key describe the
/// same meeting and are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// One policy meeting as stated on a source page.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub meeting_type: MeetingType,
    pub is_cancelled: bool,
    pub has_sep_projections: bool,
    pub statement_url: Option<String>,
    pub minutes_url: Option<String>,
    pub press_conference_url: Option<String>,
    pub source_url: String,
}

impl CalendarEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey {
            year: self.year,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Fill link fields that are still unset from `other`. Set links are
    /// never overwritten and the classification of `self` is kept.
    pub fn absorb(&mut self, other: &CalendarEntry) {
        fill(&mut self.statement_url, &other.statement_url);
        fill(&mut self.minutes_url, &other.minutes_url);
        fill(&mut self.press_conference_url, &other.press_conference_url);
        self.has_sep_projections |= other.has_sep_projections;
    }
}

fn fill(slot: &mut Option<String>, incoming: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(incoming);
    }
}

/// Sort by `(year, start_date)`, then end date. Extraction itself only
/// guarantees first-seen order.
pub fn sort_entries(entries: &mut [CalendarEntry]) {
    entries.sort_by(|a, b| a.key().cmp(&b.key()));
}
