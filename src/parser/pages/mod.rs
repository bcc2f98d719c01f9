//! Page strategies. Each pipeline discovers candidate containers its own way
//! and feeds them through the shared locator, date parser, link classifier
//! and assembler.

pub mod current;
pub mod future;
pub mod historical;

use scraper::ElementRef;

use super::dates::DateSpan;
use super::dom::parent_element;
use super::links::DocumentLinks;
use crate::entry::CalendarEntry;

pub(crate) fn build_entry(
    year: i32,
    span: DateSpan,
    links: DocumentLinks,
    source_url: &str,
) -> CalendarEntry {
    CalendarEntry {
        year,
        start_date: span.start,
        end_date: span.end,
        meeting_type: span.meeting_type,
        is_cancelled: span.is_cancelled,
        has_sep_projections: span.has_sep_projections,
        statement_url: links.statement,
        minutes_url: links.minutes,
        press_conference_url: links.press_conference,
        source_url: source_url.to_string(),
    }
}

/// Element siblings following `heading` up to the next boundary. A heading
/// that is the last element of a wrapper (`<div class="panel-heading">`)
/// speaks for the wrapper's siblings instead. A sibling that contains a
/// boundary also ends the section.
pub(crate) fn section_after<'a>(
    heading: ElementRef<'a>,
    is_boundary: impl Fn(&ElementRef<'a>) -> bool,
) -> Vec<ElementRef<'a>> {
    let has_followers = heading.next_siblings().any(|n| n.value().is_element());
    let from = if has_followers {
        heading
    } else {
        parent_element(heading).unwrap_or(heading)
    };
    let mut section = Vec::new();
    for sib in from.next_siblings().filter_map(ElementRef::wrap) {
        if sib
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|e| is_boundary(&e))
        {
            break;
        }
        section.push(sib);
    }
    section
}
