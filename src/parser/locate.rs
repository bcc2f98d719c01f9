use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dates::{has_qualifier, normalize_ws};
use super::dom::{
    element_text, enclosing, is_one_of, parent_element, DocumentIndex, BLOCK_TAGS,
    BLOCK_TAGS_WITH_ROWS,
};
use super::lexicon::{find_month, MONTH_RE};
use super::links::{anchor_urls, url_year};

/// How many blocks (the starting one included) are tried when climbing from
/// an anchor towards a block that names a date.
pub const CLIMB_LIMIT: usize = 6;

/// Last preceding node, counted from zero, that a bounded backward scan may
/// examine. Text nodes count.
pub const BACKWARD_WINDOW: usize = 400;

/// Levels and preceding siblings per level consulted when a historical
/// container needs its date from surrounding text.
pub const CONTEXT_LEVELS: usize = 4;
pub const CONTEXT_SIBLINGS: usize = 4;

const YEAR_HEADINGS: &[&str] = &["h2", "h3", "h4"];

static DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").unwrap());
static BARE_DAY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,2}\b").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());
static DATE_STOP_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bStatement\b|\bPress\s+Release\b").unwrap());

static ANY_ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static QUALIFIER_BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li, p, div, tr").unwrap());

/// Month name and a digit somewhere in the text.
pub fn names_a_date(text: &str) -> bool {
    MONTH_RE.is_match(text) && DIGIT_RE.is_match(text)
}

pub fn year_in(text: &str) -> Option<i32> {
    YEAR_RE.find(text)?.as_str().parse().ok()
}

/// Which blocks count as containers and what makes one acceptable.
#[derive(Debug, Clone, Copy)]
pub struct LocatorPolicy {
    pub block_tags: &'static [&'static str],
    /// Also accept a block holding a qualifier keyword and a digit but no month.
    pub accept_qualifiers: bool,
}

impl LocatorPolicy {
    pub const CALENDAR: Self = Self {
        block_tags: BLOCK_TAGS,
        accept_qualifiers: true,
    };
    pub const HISTORICAL: Self = Self {
        block_tags: BLOCK_TAGS_WITH_ROWS,
        accept_qualifiers: false,
    };
}

pub struct Locator<'a, 'i> {
    index: &'i DocumentIndex<'a>,
    policy: LocatorPolicy,
}

impl<'a, 'i> Locator<'a, 'i> {
    pub fn new(index: &'i DocumentIndex<'a>, policy: LocatorPolicy) -> Self {
        Self { index, policy }
    }

    fn accepts(&self, text: &str) -> bool {
        names_a_date(text)
            || (self.policy.accept_qualifiers && has_qualifier(text) && DIGIT_RE.is_match(text))
    }

    /// Smallest block around `anchor` whose text names a date. Falls back to
    /// the anchor's own enclosing block when nothing within [`CLIMB_LIMIT`]
    /// qualifies.
    pub fn container_for(&self, anchor: ElementRef<'a>) -> ElementRef<'a> {
        let start = enclosing(anchor, self.policy.block_tags).unwrap_or(anchor);
        let mut current = start;
        for _ in 0..CLIMB_LIMIT {
            if self.accepts(&element_text(current)) {
                return current;
            }
            match parent_element(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        start
    }

    /// Contextual year from the nearest preceding heading: FOMC headings
    /// first, then any `h2`-`h4` with a year, then any element with a year
    /// inside [`BACKWARD_WINDOW`].
    pub fn heading_year(&self, el: ElementRef<'a>) -> Option<i32> {
        let headings: Vec<String> = self
            .index
            .preceding(el, None)
            .filter(|e| is_one_of(e, YEAR_HEADINGS))
            .map(element_text)
            .collect();
        headings
            .iter()
            .filter(|text| text.contains("FOMC"))
            .find_map(|text| year_in(text))
            .or_else(|| headings.iter().find_map(|text| year_in(text)))
            .or_else(|| {
                self.index
                    .preceding(el, Some(BACKWARD_WINDOW + 1))
                    .find_map(|e| year_in(&element_text(e)))
            })
    }

    /// [`Self::heading_year`], else the single year every dated link in the
    /// container agrees on.
    pub fn resolve_year(&self, container: ElementRef<'a>, base: Option<&Url>) -> Option<i32> {
        if let Some(year) = self.heading_year(container) {
            return Some(year);
        }
        let years: BTreeSet<i32> = anchor_urls(container, base)
            .iter()
            .filter_map(|u| url_year(u))
            .collect();
        if years.len() == 1 {
            years.into_iter().next()
        } else {
            None
        }
    }

    /// Text that carries the meeting date: everything before the first
    /// "Statement"/"Press Release" anchor, so trailing link labels cannot
    /// contribute digits. A day-only prefix borrows the nearest preceding
    /// month.
    pub fn date_prefix(&self, container: ElementRef<'a>) -> String {
        let prefix = text_before_statement(container);
        if MONTH_RE.is_match(&prefix) || !BARE_DAY_RE.is_match(&prefix) {
            return prefix;
        }
        match self.nearest_month(container) {
            Some(month) => format!("{month} {prefix}"),
            None => prefix,
        }
    }

    fn nearest_month(&self, el: ElementRef<'a>) -> Option<String> {
        self.index
            .preceding(el, Some(BACKWARD_WINDOW + 1))
            .find_map(|e| find_month(&element_text(e)).map(str::to_string))
    }
}

fn text_before_statement(container: ElementRef) -> String {
    let stop = container
        .select(&ANY_ANCHOR_SEL)
        .find(|a| DATE_STOP_LABEL_RE.is_match(&element_text(*a)));
    let Some(stop) = stop else {
        return element_text(container);
    };
    let mut parts = Vec::new();
    for node in container.descendants() {
        if ElementRef::wrap(node) == Some(stop) {
            break;
        }
        if let Some(text) = node.value().as_text() {
            parts.push(&**text);
        }
    }
    normalize_ws(&parts.join(" "))
}

/// The container's text, or when it names no date, the text of up to
/// [`CONTEXT_SIBLINGS`] preceding siblings prepended at the first of
/// [`CONTEXT_LEVELS`] ancestor levels where that makes a date appear.
pub fn text_with_leading_context(container: ElementRef) -> String {
    let base = element_text(container);
    if names_a_date(&base) {
        return base;
    }
    let mut level = Some(container);
    for _ in 0..CONTEXT_LEVELS {
        let Some(node) = level else { break };
        let mut before: Vec<String> = node
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .take(CONTEXT_SIBLINGS)
            .map(element_text)
            .collect();
        before.reverse();
        let prefix = before.join(" ");
        let prefix = prefix.trim();
        if !prefix.is_empty() {
            let combined = format!("{prefix} {base}");
            if names_a_date(&combined) {
                return combined;
            }
        }
        level = parent_element(node);
    }
    base
}

/// Innermost `li`/`p`/`div`/`tr` blocks holding a qualifier keyword next to a
/// bare day number: meetings announced without any document link.
pub fn qualifier_blocks(doc: &Html) -> Vec<ElementRef<'_>> {
    let hits: Vec<ElementRef> = doc
        .select(&QUALIFIER_BLOCK_SEL)
        .filter(|el| {
            let text = element_text(*el);
            has_qualifier(&text) && BARE_DAY_RE.is_match(&text)
        })
        .collect();
    // Pre-order: if a hit has a hit inside it, the very next hit is one.
    hits.iter()
        .enumerate()
        .filter(|(i, el)| {
            hits.get(i + 1)
                .map_or(true, |next| !next.ancestors().any(|a| ElementRef::wrap(a) == Some(**el)))
        })
        .map(|(_, el)| *el)
        .collect()
}
