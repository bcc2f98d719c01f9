//! Extraction of the FOMC meeting calendar from the Federal Reserve's
//! hand-edited HTML pages.

pub mod calendar;
pub mod config;
pub mod db;
pub mod entry;
pub mod export;
pub mod fetch;
pub mod parser;

pub use entry::{CalendarEntry, EntryKey, MeetingType};
