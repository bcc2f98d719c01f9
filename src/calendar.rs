//! Fetch-then-parse drivers for the three pipelines.

use std::collections::HashSet;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Settings;
use crate::entry::CalendarEntry;
use crate::fetch::{FetchError, PageSource};
use crate::parser::{
    parse_current_calendar, parse_future_calendar_on, parse_historical_index, parse_year_page,
    Assembler, Gates,
};

/// Which extraction pipeline produced a set of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Current,
    Future,
    Historical,
}

impl Pipeline {
    pub fn as_str(self) -> &'static str {
        match self {
            Pipeline::Current => "current",
            Pipeline::Future => "future",
            Pipeline::Historical => "historical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "current" => Some(Pipeline::Current),
            "future" => Some(Pipeline::Future),
            "historical" => Some(Pipeline::Historical),
            _ => None,
        }
    }
}

pub async fn scrape_current<S: PageSource>(
    source: &S,
    url: &str,
) -> Result<Vec<CalendarEntry>, FetchError> {
    let html = source.fetch(url).await?;
    Ok(parse_current_calendar(&html, url))
}

pub async fn scrape_future<S: PageSource>(
    source: &S,
    url: &str,
    today: NaiveDate,
) -> Result<Vec<CalendarEntry>, FetchError> {
    let html = source.fetch(url).await?;
    Ok(parse_future_calendar_on(&html, url, today))
}

/// Outcome of a historical run.
pub struct HistoricalRun {
    pub entries: Vec<CalendarEntry>,
    pub pages_ok: usize,
    /// Year pages that could not be fetched.
    pub failed: Vec<String>,
}

/// Direct `fomccalendars{year}.htm` page for a year.
pub fn direct_page_url(base_url: &str, year: i32) -> String {
    format!(
        "{}/monetarypolicy/fomccalendars{year}.htm",
        base_url.trim_end_matches('/')
    )
}

/// Pages to visit: the index links plus a direct page per target year
/// (`direct_from..=current_year` when no years are given), without duplicate
/// URLs, ordered by year.
pub fn historical_targets(
    index_links: Vec<(i32, String)>,
    base_url: &str,
    years: Option<&[i32]>,
    direct_from: i32,
    current_year: i32,
) -> Vec<(i32, String)> {
    let direct_years: Vec<i32> = match years {
        Some(ys) => ys.to_vec(),
        None => (direct_from..=current_year).collect(),
    };
    let direct = direct_years
        .into_iter()
        .map(|y| (y, direct_page_url(base_url, y)));

    let mut seen = HashSet::new();
    let mut targets: Vec<(i32, String)> = index_links
        .into_iter()
        .chain(direct)
        .filter(|(_, url)| seen.insert(url.clone()))
        .collect();
    targets.sort_by_key(|(year, _)| *year);
    targets
}

/// Fetch the historical index, then every year page one at a time. A year
/// page that cannot be fetched is logged and skipped; the index itself must
/// load. Entries from all pages are merged by identity key.
pub async fn scrape_historical<S: PageSource>(
    source: &S,
    settings: &Settings,
    years: Option<&[i32]>,
    current_year: i32,
) -> Result<HistoricalRun, FetchError> {
    let index_html = source.fetch(&settings.historical_index_url).await?;
    let index_links = parse_historical_index(&index_html, &settings.base_url, years);
    let targets = historical_targets(
        index_links,
        &settings.base_url,
        years,
        settings.direct_pages_from,
        current_year,
    );
    info!("Fetching {} historical pages", targets.len());

    let pb = ProgressBar::new(targets.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }

    let mut assembler = Assembler::new(Gates::default());
    let mut pages_ok = 0usize;
    let mut failed = Vec::new();
    for (year, url) in targets {
        pb.set_message(year.to_string());
        match source.fetch(&url).await {
            Ok(html) => {
                pages_ok += 1;
                for entry in parse_year_page(year, &html, &url) {
                    assembler.offer(entry);
                }
            }
            Err(e) => {
                warn!("Skipping {} page {}: {}", year, url, e);
                failed.push(url);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let entries = assembler.finish();
    info!(
        "Historical run: {} entries from {} pages ({} failed)",
        entries.len(),
        pages_ok,
        failed.len()
    );
    Ok(HistoricalRun {
        entries,
        pages_ok,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const FED: &str = "https://www.federalreserve.gov";

    /// In-memory pages; unknown URLs fail like an exhausted fetch.
    struct FakeSource {
        pages: HashMap<String, String>,
    }

    impl FakeSource {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages.iter().map(|(u, h)| (u.to_string(), h.clone())).collect(),
            }
        }
    }

    impl PageSource for FakeSource {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Exhausted {
                url: url.to_string(),
                attempts: 1,
                reason: "404 Not Found".into(),
            })
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{name}")).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn targets_are_deduped_and_sorted() {
        let index = vec![
            (2019, format!("{FED}/monetarypolicy/fomchistorical2019.htm")),
            (2018, format!("{FED}/monetarypolicy/fomccalendars2018.htm")),
        ];
        let targets = historical_targets(index, FED, Some(&[2018, 2019]), 2010, 2025);
        let urls: Vec<&str> = targets.iter().map(|(_, u)| u.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.federalreserve.gov/monetarypolicy/fomccalendars2018.htm",
                "https://www.federalreserve.gov/monetarypolicy/fomchistorical2019.htm",
                "https://www.federalreserve.gov/monetarypolicy/fomccalendars2019.htm",
            ]
        );
    }

    #[test]
    fn direct_pages_span_to_current_year() {
        let targets = historical_targets(Vec::new(), FED, None, 2022, 2024);
        let years: Vec<i32> = targets.iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2022, 2023, 2024]);
    }

    #[tokio::test]
    async fn historical_skips_failed_pages() {
        let settings = Settings::default();
        let source = FakeSource::new(&[
            (settings.historical_index_url.as_str(), fixture("historical_index.html")),
            (
                "https://www.federalreserve.gov/monetarypolicy/fomchistorical2008.htm",
                fixture("historical_2008.html"),
            ),
        ]);
        let run = scrape_historical(&source, &settings, Some(&[2008, 2009]), 2025)
            .await
            .unwrap();
        assert_eq!(run.pages_ok, 1);
        // fomchistorical2009 plus both direct pages
        assert_eq!(run.failed.len(), 3);
        assert_eq!(run.entries.len(), 5);
        assert!(run.entries.iter().all(|e| e.year == 2008));
    }

    #[tokio::test]
    async fn historical_index_failure_propagates() {
        let source = FakeSource::new(&[]);
        let result = scrape_historical(&source, &Settings::default(), None, 2025).await;
        assert!(matches!(result, Err(FetchError::Exhausted { .. })));
    }

    #[tokio::test]
    async fn run_level_merge_across_pages() {
        let settings = Settings::default();
        let page = fixture("historical_2008.html");
        let source = FakeSource::new(&[
            (settings.historical_index_url.as_str(), fixture("historical_index.html")),
            ("https://www.federalreserve.gov/monetarypolicy/fomchistorical2008.htm", page.clone()),
            ("https://www.federalreserve.gov/monetarypolicy/fomccalendars2008.htm", page),
        ]);
        let run = scrape_historical(&source, &settings, Some(&[2008]), 2025)
            .await
            .unwrap();
        assert_eq!(run.pages_ok, 2);
        assert_eq!(run.entries.len(), 5);
    }

    #[tokio::test]
    async fn single_page_fetch_failure_propagates() {
        let source = FakeSource::new(&[]);
        let url = Settings::default().current_url;
        assert!(scrape_current(&source, &url).await.is_err());
        assert!(scrape_future(&source, &url, d(2025, 1, 1)).await.is_err());
    }

    #[tokio::test]
    async fn current_from_source() {
        let url = Settings::default().current_url;
        let source = FakeSource::new(&[(url.as_str(), fixture("current_calendar.html"))]);
        let entries = scrape_current(&source, &url).await.unwrap();
        assert!(entries.iter().any(|e| e.start_date == d(2024, 1, 30)));
    }
}
