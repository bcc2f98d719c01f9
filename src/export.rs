use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::entry::CalendarEntry;

/// Export columns, in order.
pub const COLUMNS: [&str; 10] = [
    "year",
    "start_date",
    "end_date",
    "meeting_type",
    "is_cancelled",
    "has_sep_projections",
    "statement_url",
    "minutes_url",
    "press_conference_url",
    "source_url",
];

/// Header plus one row per entry. Dates are `YYYY-MM-DD`, missing URLs are
/// empty cells.
pub fn write_entries<W: Write>(out: W, entries: &[CalendarEntry]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(COLUMNS)?;
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(entries: &[CalendarEntry]) -> Result<String> {
    let mut buf = Vec::new();
    write_entries(&mut buf, entries)?;
    Ok(String::from_utf8(buf)?)
}

pub fn write_csv(path: &Path, entries: &[CalendarEntry]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_entries(file, entries)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::entry::MeetingType;

    fn entry() -> CalendarEntry {
        CalendarEntry {
            year: 2019,
            start_date: NaiveDate::from_ymd_opt(2019, 10, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2019, 10, 4).unwrap(),
            meeting_type: MeetingType::NotationVote,
            is_cancelled: false,
            has_sep_projections: false,
            statement_url: Some("https://www.federalreserve.gov/newsevents/pressreleases/monetary20191004a.htm".into()),
            minutes_url: None,
            press_conference_url: None,
            source_url: "https://www.federalreserve.gov/monetarypolicy/fomchistorical2019.htm".into(),
        }
    }

    #[test]
    fn header_only_when_empty() {
        let csv = to_csv_string(&[]).unwrap();
        assert_eq!(csv.trim_end(), COLUMNS.join(","));
    }

    #[test]
    fn row_layout() {
        let csv = to_csv_string(&[entry()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "2019,2019-10-04,2019-10-04,Notation Vote,false,false,\
             https://www.federalreserve.gov/newsevents/pressreleases/monetary20191004a.htm,,,\
             https://www.federalreserve.gov/monetarypolicy/fomchistorical2019.htm"
        );
    }

    #[test]
    fn writes_file_in_new_directory() {
        let dir = std::env::temp_dir().join(format!("fomc_export_{}", std::process::id()));
        let path = dir.join("out").join("calendar.csv");
        write_csv(&path, &[entry()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
