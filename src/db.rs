use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use crate::calendar::Pipeline;
use crate::entry::{CalendarEntry, MeetingType};

const DATE_FMT: &str = "%Y-%m-%d";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS calendar_entries (
            pipeline             TEXT NOT NULL CHECK(pipeline IN ('current','future','historical')),
            year                 INTEGER NOT NULL,
            start_date           TEXT NOT NULL,
            end_date             TEXT NOT NULL,
            meeting_type         TEXT NOT NULL CHECK(meeting_type IN ('Scheduled','Unscheduled','Notation Vote')),
            is_cancelled         BOOLEAN NOT NULL DEFAULT 0,
            has_sep_projections  BOOLEAN NOT NULL DEFAULT 0,
            statement_url        TEXT,
            minutes_url          TEXT,
            press_conference_url TEXT,
            source_url           TEXT NOT NULL,
            scraped_at           TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (pipeline, year, start_date, end_date)
        );
        CREATE INDEX IF NOT EXISTS idx_entries_start ON calendar_entries(start_date);

        CREATE TABLE IF NOT EXISTS runs (
            id           INTEGER PRIMARY KEY,
            pipeline     TEXT NOT NULL,
            source       TEXT NOT NULL,
            entries      INTEGER NOT NULL,
            failed_pages INTEGER NOT NULL DEFAULT 0,
            started_at   TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Entries ──

/// Upsert one run's entries; a re-run refreshes rows with the same key.
pub fn save_entries(conn: &Connection, pipeline: Pipeline, entries: &[CalendarEntry]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO calendar_entries
                (pipeline, year, start_date, end_date, meeting_type, is_cancelled,
                 has_sep_projections, statement_url, minutes_url, press_conference_url, source_url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(pipeline, year, start_date, end_date) DO UPDATE SET
                meeting_type = excluded.meeting_type,
                is_cancelled = excluded.is_cancelled,
                has_sep_projections = excluded.has_sep_projections,
                statement_url = excluded.statement_url,
                minutes_url = excluded.minutes_url,
                press_conference_url = excluded.press_conference_url,
                source_url = excluded.source_url,
                scraped_at = datetime('now')",
        )?;
        for e in entries {
            count += stmt.execute(params![
                pipeline.as_str(),
                e.year,
                e.start_date.format(DATE_FMT).to_string(),
                e.end_date.format(DATE_FMT).to_string(),
                e.meeting_type.as_str(),
                e.is_cancelled,
                e.has_sep_projections,
                e.statement_url,
                e.minutes_url,
                e.press_conference_url,
                e.source_url,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn record_run(
    conn: &Connection,
    pipeline: Pipeline,
    source: &str,
    entries: usize,
    failed_pages: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO runs (pipeline, source, entries, failed_pages) VALUES (?1, ?2, ?3, ?4)",
        params![pipeline.as_str(), source, entries, failed_pages],
    )?;
    Ok(())
}

struct RawEntry {
    year: i32,
    start_date: String,
    end_date: String,
    meeting_type: String,
    is_cancelled: bool,
    has_sep_projections: bool,
    statement_url: Option<String>,
    minutes_url: Option<String>,
    press_conference_url: Option<String>,
    source_url: String,
}

impl RawEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            year: row.get(0)?,
            start_date: row.get(1)?,
            end_date: row.get(2)?,
            meeting_type: row.get(3)?,
            is_cancelled: row.get(4)?,
            has_sep_projections: row.get(5)?,
            statement_url: row.get(6)?,
            minutes_url: row.get(7)?,
            press_conference_url: row.get(8)?,
            source_url: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<CalendarEntry> {
        let meeting_type = MeetingType::parse(&self.meeting_type)
            .ok_or_else(|| anyhow!("unknown meeting type {:?}", self.meeting_type))?;
        Ok(CalendarEntry {
            year: self.year,
            start_date: NaiveDate::parse_from_str(&self.start_date, DATE_FMT)?,
            end_date: NaiveDate::parse_from_str(&self.end_date, DATE_FMT)?,
            meeting_type,
            is_cancelled: self.is_cancelled,
            has_sep_projections: self.has_sep_projections,
            statement_url: self.statement_url,
            minutes_url: self.minutes_url,
            press_conference_url: self.press_conference_url,
            source_url: self.source_url,
        })
    }
}

/// Stored entries ordered by `(year, start_date)`, optionally for one
/// pipeline and capped at `limit` rows.
pub fn fetch_entries(
    conn: &Connection,
    pipeline: Option<Pipeline>,
    limit: Option<usize>,
) -> Result<Vec<CalendarEntry>> {
    let sql = format!(
        "SELECT year, start_date, end_date, meeting_type, is_cancelled, has_sep_projections,
                statement_url, minutes_url, press_conference_url, source_url
         FROM calendar_entries
         WHERE ?1 IS NULL OR pipeline = ?1
         ORDER BY year, start_date, end_date{}",
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map(params![pipeline.map(Pipeline::as_str)], RawEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    raw.into_iter().map(RawEntry::into_entry).collect()
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub by_pipeline: Vec<(String, usize)>,
    pub cancelled: usize,
    pub with_projections: usize,
    pub runs: usize,
    pub last_run: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM calendar_entries", [], |r| r.get(0))?;
    let cancelled: usize = conn.query_row(
        "SELECT COUNT(*) FROM calendar_entries WHERE is_cancelled = 1",
        [],
        |r| r.get(0),
    )?;
    let with_projections: usize = conn.query_row(
        "SELECT COUNT(*) FROM calendar_entries WHERE has_sep_projections = 1",
        [],
        |r| r.get(0),
    )?;
    let runs: usize = conn.query_row("SELECT COUNT(*) FROM runs", [], |r| r.get(0))?;
    let last_run: Option<String> =
        conn.query_row("SELECT MAX(started_at) FROM runs", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT pipeline, COUNT(*) FROM calendar_entries GROUP BY pipeline ORDER BY pipeline",
    )?;
    let by_pipeline = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        total,
        by_pipeline,
        cancelled,
        with_projections,
        runs,
        last_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn entry(month: u32, day: u32) -> CalendarEntry {
        let date = NaiveDate::from_ymd_opt(2024, month, day).unwrap();
        CalendarEntry {
            year: 2024,
            start_date: date,
            end_date: date,
            meeting_type: MeetingType::Scheduled,
            is_cancelled: false,
            has_sep_projections: false,
            statement_url: None,
            minutes_url: None,
            press_conference_url: None,
            source_url: "https://www.federalreserve.gov/monetarypolicy/fomccalendars.htm".into(),
        }
    }

    #[test]
    fn round_trip_in_key_order() {
        let conn = conn();
        let mut late = entry(9, 18);
        late.meeting_type = MeetingType::NotationVote;
        late.statement_url = Some("https://x/s.htm".into());
        save_entries(&conn, Pipeline::Current, &[late.clone(), entry(1, 31)]).unwrap();

        let rows = fetch_entries(&conn, None, None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], entry(1, 31));
        assert_eq!(rows[1], late);
    }

    #[test]
    fn upsert_replaces_same_key() {
        let conn = conn();
        save_entries(&conn, Pipeline::Historical, &[entry(3, 20)]).unwrap();
        let mut updated = entry(3, 20);
        updated.minutes_url = Some("https://x/m.htm".into());
        save_entries(&conn, Pipeline::Historical, &[updated.clone()]).unwrap();
        save_entries(&conn, Pipeline::Future, &[entry(3, 20)]).unwrap();

        let hist = fetch_entries(&conn, Some(Pipeline::Historical), None).unwrap();
        assert_eq!(hist, vec![updated]);
        assert_eq!(fetch_entries(&conn, None, Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn stats_count_by_pipeline() {
        let conn = conn();
        let mut cancelled = entry(3, 18);
        cancelled.is_cancelled = true;
        save_entries(&conn, Pipeline::Current, &[entry(1, 31), cancelled]).unwrap();
        save_entries(&conn, Pipeline::Future, &[entry(12, 18)]).unwrap();
        record_run(&conn, Pipeline::Current, "https://x/cal.htm", 2, 0).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.runs, 1);
        assert!(stats.last_run.is_some());
        assert_eq!(
            stats.by_pipeline,
            vec![("current".to_string(), 2), ("future".to_string(), 1)]
        );
    }
}
