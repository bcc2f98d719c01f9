use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::{build_entry, section_after};
use crate::entry::CalendarEntry;
use crate::parser::assemble::{Assembler, Gates};
use crate::parser::dates::{parse_date_range, QualifierScope};
use crate::parser::dom::{element_text, is_one_of};
use crate::parser::links::collect_links;
use crate::parser::locate::year_in;

static HEADING_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3, h4").unwrap());
static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.fomc-meeting").unwrap());
static MONTH_COL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".fomc-meeting__month").unwrap());
static DATE_COL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".fomc-meeting__date").unwrap());

const SECTION_HEADINGS: &[&str] = &["h2", "h3", "h4"];

/// Year of a "2025 FOMC Meetings" style heading.
fn section_year(el: &ElementRef) -> Option<i32> {
    if !is_one_of(el, SECTION_HEADINGS) {
        return None;
    }
    let text = element_text(*el);
    if text.contains("FOMC") {
        year_in(&text)
    } else {
        None
    }
}

/// Meetings on the calendar page that have not concluded as of today.
pub fn parse_future_calendar(html: &str, page_url: &str) -> Vec<CalendarEntry> {
    parse_future_calendar_on(html, page_url, Local::now().date_naive())
}

/// [`parse_future_calendar`] with an explicit "today". Meetings ending on
/// `today` are still included.
pub fn parse_future_calendar_on(html: &str, page_url: &str, today: NaiveDate) -> Vec<CalendarEntry> {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let mut assembler = Assembler::new(Gates::upcoming(today));

    for heading in doc.select(&HEADING_SEL) {
        let Some(year) = section_year(&heading) else {
            continue;
        };
        for block in section_after(heading, |e| section_year(e).is_some()) {
            let own = ROW_SEL.matches(&block).then_some(block);
            for row in own.into_iter().chain(block.select(&ROW_SEL)) {
                let (Some(month), Some(date)) = (
                    row.select(&MONTH_COL_SEL).next().map(element_text),
                    row.select(&DATE_COL_SEL).next().map(element_text),
                ) else {
                    continue;
                };
                let text = format!("{month} {date}");
                let links = collect_links(row, base.as_ref());
                match parse_date_range(year, &text, QualifierScope::Note, links.has_projection) {
                    Ok(span) => {
                        assembler.offer(build_entry(year, span, links, page_url));
                    }
                    Err(e) => debug!("Skipping row {:?}: {}", text, e),
                }
            }
        }
    }

    let entries = assembler.finish();
    info!("Parsed {} upcoming entries as of {}", entries.len(), today);
    entries
}
