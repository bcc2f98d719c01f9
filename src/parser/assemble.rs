use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use super::links::statement_date;
use crate::entry::{CalendarEntry, EntryKey, MeetingType};

/// Page-specific validation applied to partial records.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gates {
    /// Drop held (scheduled, not cancelled) meetings that end up without a
    /// statement link once the page is done.
    pub require_statement: bool,
    /// Drop a partial whose statement URL carries a date other than its end date.
    pub cross_check_statement_date: bool,
    /// Drop meetings that ended before this day.
    pub not_before: Option<NaiveDate>,
}

impl Gates {
    pub fn calendar() -> Self {
        Self {
            require_statement: true,
            cross_check_statement_date: true,
            not_before: None,
        }
    }

    pub fn upcoming(today: NaiveDate) -> Self {
        Self {
            not_before: Some(today),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("statement is dated {statement} but the meeting ends {end}")]
    StatementDateMismatch { statement: NaiveDate, end: NaiveDate },
    #[error("meeting ended {end}, before {today}")]
    Concluded { end: NaiveDate, today: NaiveDate },
    #[error("held meeting without a statement link")]
    MissingStatement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    Inserted,
    Merged,
    Rejected(Rejection),
}

/// Reduces one extraction run's partial records to unique entries keyed by
/// `(year, start_date, end_date)`, in first-seen order.
#[derive(Debug, Default)]
pub struct Assembler {
    gates: Gates,
    entries: Vec<CalendarEntry>,
    by_key: HashMap<EntryKey, usize>,
}

impl Assembler {
    pub fn new(gates: Gates) -> Self {
        Self {
            gates,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offer(&mut self, entry: CalendarEntry) -> Offer {
        if let Err(rejection) = self.check(&entry) {
            debug!(
                "Rejected {} to {}: {}",
                entry.start_date, entry.end_date, rejection
            );
            return Offer::Rejected(rejection);
        }
        match self.by_key.get(&entry.key()) {
            Some(&i) => {
                self.entries[i].absorb(&entry);
                Offer::Merged
            }
            None => {
                self.by_key.insert(entry.key(), self.entries.len());
                self.entries.push(entry);
                Offer::Inserted
            }
        }
    }

    fn check(&self, entry: &CalendarEntry) -> Result<(), Rejection> {
        if let Some(today) = self.gates.not_before {
            if entry.end_date < today {
                return Err(Rejection::Concluded { end: entry.end_date, today });
            }
        }
        if self.gates.cross_check_statement_date {
            let stated = entry.statement_url.as_deref().and_then(statement_date);
            if let Some(statement) = stated {
                if statement != entry.end_date {
                    return Err(Rejection::StatementDateMismatch {
                        statement,
                        end: entry.end_date,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply the late statement requirement and hand out the records.
    pub fn finish(self) -> Vec<CalendarEntry> {
        let require_statement = self.gates.require_statement;
        self.entries
            .into_iter()
            .filter(|e| {
                let held = e.meeting_type == MeetingType::Scheduled && !e.is_cancelled;
                let keep = !(require_statement && held && e.statement_url.is_none());
                if !keep {
                    debug!(
                        "Dropped {} to {}: {}",
                        e.start_date,
                        e.end_date,
                        Rejection::MissingStatement
                    );
                }
                keep
            })
            .collect()
    }
}
