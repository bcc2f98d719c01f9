use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::{build_entry, section_after};
use crate::entry::CalendarEntry;
use crate::parser::assemble::{Assembler, Gates};
use crate::parser::dates::{parse_date_range, QualifierScope};
use crate::parser::dom::{element_text, is_one_of, DocumentIndex, HEADING_TAGS};
use crate::parser::links::{add_anchors, collect_links, mentions_projections, resolve_url, DocumentLinks};
use crate::parser::locate::{text_with_leading_context, year_in, Locator, LocatorPolicy};

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static DOCUMENT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)statement|minutes").unwrap());

/// Extract the meetings on one historical year page. The year is the page's
/// own year; qualifiers are read from the whole container text.
///
/// Two passes feed one assembler: containers around statement/minutes
/// anchors, then headings that name a date together with the links in the
/// section they open.
pub fn parse_year_page(year: i32, html: &str, source_url: &str) -> Vec<CalendarEntry> {
    let doc = Html::parse_document(html);
    let base = Url::parse(source_url).ok();
    let index = DocumentIndex::new(&doc);
    let locator = Locator::new(&index, LocatorPolicy::HISTORICAL);
    let mut assembler = Assembler::new(Gates::default());

    let mut containers: BTreeMap<usize, ElementRef> = BTreeMap::new();
    for a in doc.select(&ANCHOR_SEL) {
        if !DOCUMENT_LABEL_RE.is_match(&element_text(a)) {
            continue;
        }
        let container = locator.container_for(a);
        if let Some(pos) = index.position(container) {
            containers.entry(pos).or_insert(container);
        }
    }
    for container in containers.into_values() {
        let text = text_with_leading_context(container);
        let links = collect_links(container, base.as_ref());
        let projection = links.has_projection || mentions_projections(&text);
        match parse_date_range(year, &text, QualifierScope::FullText, projection) {
            Ok(span) => {
                assembler.offer(build_entry(year, span, links, source_url));
            }
            Err(e) => debug!("Skipping container {:?}: {}", text, e),
        }
    }

    for heading in doc.select(&HEADING_SEL) {
        let text = element_text(heading);
        if text.is_empty() {
            continue;
        }
        let Ok(mut span) = parse_date_range(year, &text, QualifierScope::FullText, false) else {
            continue;
        };
        let mut links = DocumentLinks::default();
        let mut mentioned = mentions_projections(&text);
        for block in section_after(heading, |e| is_one_of(e, HEADING_TAGS)) {
            add_anchors(&mut links, block, base.as_ref());
            mentioned |= mentions_projections(&element_text(block));
        }
        span.has_sep_projections |= links.has_projection || mentioned;
        assembler.offer(build_entry(year, span, links, source_url));
    }

    let entries = assembler.finish();
    info!("Parsed {} entries for {} from {}", entries.len(), year, source_url);
    entries
}

/// `(year, url)` for every anchor on the historical index whose label names
/// a year, optionally restricted to `years`. URLs are resolved against
/// `base_url`.
pub fn parse_historical_index(html: &str, base_url: &str, years: Option<&[i32]>) -> Vec<(i32, String)> {
    let doc = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    doc.select(&ANCHOR_SEL)
        .filter_map(|a| {
            let year = year_in(&element_text(a))?;
            if years.is_some_and(|ys| !ys.contains(&year)) {
                return None;
            }
            let url = resolve_url(base.as_ref(), a.value().attr("href")?)?;
            Some((year, url))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::entry::MeetingType;

    const PAGE: &str = "https://www.federalreserve.gov/monetarypolicy/fomchistorical2008.htm";
    const FED: &str = "https://www.federalreserve.gov";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fixture() -> Vec<CalendarEntry> {
        let html = std::fs::read_to_string("tests/fixtures/historical_2008.html").unwrap();
        parse_year_page(2008, &html, PAGE)
    }

    fn find(entries: &[CalendarEntry], start: NaiveDate) -> &CalendarEntry {
        entries
            .iter()
            .find(|e| e.start_date == start)
            .unwrap_or_else(|| panic!("no entry starting {start}"))
    }

    #[test]
    fn heading_sections() {
        let entries = fixture();
        let call = find(&entries, d(2008, 1, 21));
        assert_eq!(call.meeting_type, MeetingType::Unscheduled);
        assert_eq!(
            call.statement_url.as_deref(),
            Some("https://www.federalreserve.gov/newsevents/pressreleases/monetary20080122b.htm")
        );

        let jan = find(&entries, d(2008, 1, 29));
        assert_eq!(jan.end_date, d(2008, 1, 30));
        assert!(jan.statement_url.is_some());
        assert_eq!(
            jan.minutes_url.as_deref(),
            Some("https://www.federalreserve.gov/monetarypolicy/fomcminutes20080130.htm")
        );
        assert!(!jan.has_sep_projections);

        let mar = find(&entries, d(2008, 3, 18));
        assert!(mar.has_sep_projections);
    }

    #[test]
    fn table_rows_from_anchor_pass() {
        let entries = fixture();
        let apr = find(&entries, d(2008, 4, 29));
        assert_eq!(apr.end_date, d(2008, 4, 30));
        assert!(apr.statement_url.is_some());
        assert!(apr.minutes_url.is_some());
        assert_eq!(apr.source_url, PAGE);
    }

    #[test]
    fn cancelled_anywhere_in_text() {
        let entries = fixture();
        let aug = find(&entries, d(2008, 8, 5));
        assert!(aug.is_cancelled);
        assert_eq!(aug.meeting_type, MeetingType::Scheduled);
    }

    #[test]
    fn passes_merge_by_key() {
        let entries = fixture();
        let keys: HashSet<_> = entries.iter().map(|e| e.key()).collect();
        assert_eq!(keys.len(), entries.len());
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn projections_mentioned_in_heading_section() {
        let html = r#"<h5>June 24-25 Meeting</h5>
            <p>Summary of Economic Projections</p>
            <p><a href="/monetarypolicy/files/FOMC20080625meeting.pdf">Transcript</a></p>
            <h5>August 5 Meeting</h5>
            <p><a href="/monetarypolicy/files/FOMC20080805meeting.pdf">Transcript</a></p>"#;
        let entries = parse_year_page(2008, html, PAGE);
        assert_eq!(entries.len(), 2);
        assert!(find(&entries, d(2008, 6, 24)).has_sep_projections);
        assert!(!find(&entries, d(2008, 8, 5)).has_sep_projections);
    }

    #[test]
    fn no_statement_requirement() {
        let html = r#"<ul><li>October 28-29 Meeting <a href="/monetarypolicy/fomcminutes20081029.htm">Minutes</a></li></ul>"#;
        let entries = parse_year_page(2008, html, PAGE);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].statement_url.is_none());
    }

    #[test]
    fn index_links() {
        let html = std::fs::read_to_string("tests/fixtures/historical_index.html").unwrap();
        let all = parse_historical_index(&html, FED, None);
        assert!(all.contains(&(2008, format!("{FED}/monetarypolicy/fomchistorical2008.htm"))));
        assert!(all.iter().all(|(_, url)| url.starts_with("http")));

        let some = parse_historical_index(&html, FED, Some(&[2018, 2019]));
        let years: Vec<i32> = some.iter().map(|(y, _)| *y).collect();
        assert_eq!(years, vec![2019, 2018]);
    }
}
