use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use super::build_entry;
use crate::entry::CalendarEntry;
use crate::parser::assemble::{Assembler, Gates};
use crate::parser::dates::{parse_date_range, QualifierScope};
use crate::parser::dom::{element_text, DocumentIndex};
use crate::parser::lexicon::MONTH_RE;
use crate::parser::links::{classify_link, collect_links, mentions_projections, resolve_url};
use crate::parser::locate::{qualifier_blocks, Locator, LocatorPolicy};

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static CANDIDATE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)statement|minutes|press").unwrap());

/// Extract every meeting on the in-progress calendar page.
///
/// Candidates come from document-link anchors and from qualifier-only blocks
/// (meetings announced without links). Held scheduled meetings must carry a
/// statement whose URL date matches the meeting's end date.
pub fn parse_current_calendar(html: &str, page_url: &str) -> Vec<CalendarEntry> {
    let doc = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let index = DocumentIndex::new(&doc);
    let locator = Locator::new(&index, LocatorPolicy::CALENDAR);

    let linked = doc
        .select(&ANCHOR_SEL)
        .filter(|a| is_candidate_anchor(*a, base.as_ref()))
        .map(|a| locator.container_for(a));
    // Keyed by document position so runs are deterministic and each
    // container is visited once.
    let mut candidates: BTreeMap<usize, ElementRef> = BTreeMap::new();
    for el in linked.chain(qualifier_blocks(&doc)) {
        if let Some(pos) = index.position(el) {
            candidates.entry(pos).or_insert(el);
        }
    }

    let mut assembler = Assembler::new(Gates::calendar());
    for container in candidates.into_values() {
        let prefix = locator.date_prefix(container);
        if !MONTH_RE.is_match(&prefix) {
            debug!("Container names no month: {:?}", prefix);
            continue;
        }
        let Some(year) = locator.resolve_year(container, base.as_ref()) else {
            debug!("No contextual year for {:?}", prefix);
            continue;
        };
        let links = collect_links(container, base.as_ref());
        let projection = links.has_projection || mentions_projections(&element_text(container));
        let span = match parse_date_range(year, &prefix, QualifierScope::Note, projection) {
            Ok(span) => span,
            Err(e) => {
                debug!("Skipping container {:?}: {}", prefix, e);
                continue;
            }
        };
        assembler.offer(build_entry(year, span, links, page_url));
    }

    let entries = assembler.finish();
    info!("Parsed {} entries from {}", entries.len(), page_url);
    entries
}

/// Document links, plus anchors labelled like one.
fn is_candidate_anchor(a: ElementRef, base: Option<&Url>) -> bool {
    let label = element_text(a);
    let classified = a
        .value()
        .attr("href")
        .and_then(|h| resolve_url(base, h))
        .and_then(|url| classify_link(&url, &label))
        .is_some();
    classified || CANDIDATE_LABEL_RE.is_match(&label)
}
