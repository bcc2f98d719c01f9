use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

use super::dom::element_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Statement,
    Minutes,
    PressConference,
}

// Path shapes, matched case-insensitively against the resolved URL and
// anchored at the end so PDFs and fragments fall through to the label rules.
const URL_PATTERNS: &[(&str, LinkKind)] = &[
    (r"/newsevents/pressreleases/monetary\d{8}[a-z]?\.htm$", LinkKind::Statement),
    (r"/monetarypolicy/.*minutes.*\d{4}.*\.htm$", LinkKind::Minutes),
    (r"/monetarypolicy/fomcpresconf\d{8}\.htm$", LinkKind::PressConference),
];

// Implementation notes share the statement's URL stem (`monetaryYYYYMMDDa1`)
// but are a separate document.
static IMPL_NOTE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)/newsevents/pressreleases/monetary\d{8}a1\.htm$").unwrap()
});
static IMPL_NOTE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)implementation\s*note").unwrap());

static URL_RES: LazyLock<Vec<(Regex, LinkKind)>> = LazyLock::new(|| {
    URL_PATTERNS
        .iter()
        .map(|(pat, kind)| (Regex::new(&format!("(?i){pat}")).unwrap(), *kind))
        .collect()
});

static PRESS_RELEASE_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpress\s+release\b").unwrap());
static STATEMENT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)statement").unwrap());
static MINUTES_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)minutes").unwrap());
static PRESS_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)press").unwrap());

// "SEP" stays case-sensitive so the month abbreviation "Sep" does not count.
static PROJECTION_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:projection)|\bSEP\b").unwrap());
static PROJECTION_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)fomcproj").unwrap());

static STATEMENT_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)monetary(\d{8})").unwrap());
static YEAR_IN_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").unwrap());

static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Resolve `href` against the page location. Scheme-absolute URLs pass
/// through unchanged; without a base, relative hrefs are kept as written.
pub fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if Url::parse(href).is_ok() {
        return Some(href.to_string());
    }
    match base {
        Some(base) => base.join(href).ok().map(String::from),
        None => Some(href.to_string()),
    }
}

/// Decide which meeting document an anchor points to: URL shape first, then
/// keywords in the visible label.
pub fn classify_link(url: &str, label: &str) -> Option<LinkKind> {
    if IMPL_NOTE_URL_RE.is_match(url) || IMPL_NOTE_LABEL_RE.is_match(label) {
        return None;
    }
    if let Some((_, kind)) = URL_RES.iter().find(|(re, _)| re.is_match(url)) {
        return Some(*kind);
    }
    if PRESS_RELEASE_LABEL_RE.is_match(label) || STATEMENT_LABEL_RE.is_match(label) {
        Some(LinkKind::Statement)
    } else if MINUTES_LABEL_RE.is_match(label) {
        Some(LinkKind::Minutes)
    } else if PRESS_LABEL_RE.is_match(label) {
        Some(LinkKind::PressConference)
    } else {
        None
    }
}

/// A link that announces projection materials, by label or by URL.
pub fn is_projection_link(url: &str, label: &str) -> bool {
    PROJECTION_TEXT_RE.is_match(label) || PROJECTION_URL_RE.is_match(url)
}

/// Free text that mentions the Summary of Economic Projections.
pub fn mentions_projections(text: &str) -> bool {
    PROJECTION_TEXT_RE.is_match(text)
}

/// The release date embedded in a statement URL (`monetaryYYYYMMDD`).
pub fn statement_date(url: &str) -> Option<NaiveDate> {
    let caps = STATEMENT_DATE_RE.captures(url)?;
    NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
}

/// First plausible four-digit year in a URL.
pub fn url_year(url: &str) -> Option<i32> {
    YEAR_IN_URL_RE.find(url)?.as_str().parse().ok()
}

/// Document links found in one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentLinks {
    pub statement: Option<String>,
    pub minutes: Option<String>,
    pub press_conference: Option<String>,
    pub has_projection: bool,
}

impl DocumentLinks {
    /// Classify one anchor into the first free slot of its kind.
    pub fn add(&mut self, url: &str, label: &str) {
        let slot = match classify_link(url, label) {
            Some(LinkKind::Statement) => Some(&mut self.statement),
            Some(LinkKind::Minutes) => Some(&mut self.minutes),
            Some(LinkKind::PressConference) => Some(&mut self.press_conference),
            None => None,
        };
        if let Some(slot) = slot {
            if slot.is_none() {
                *slot = Some(url.to_string());
            }
        }
        if is_projection_link(url, label) {
            self.has_projection = true;
        }
    }
}

/// Classify every `a[href]` under `root`.
pub fn collect_links(root: ElementRef, base: Option<&Url>) -> DocumentLinks {
    let mut links = DocumentLinks::default();
    add_anchors(&mut links, root, base);
    links
}

pub fn add_anchors(links: &mut DocumentLinks, root: ElementRef, base: Option<&Url>) {
    for a in root.select(&ANCHOR_SEL) {
        let Some(url) = a.value().attr("href").and_then(|h| resolve_url(base, h)) else {
            continue;
        };
        links.add(&url, &element_text(a));
    }
}

/// Resolved URLs of every `a[href]` under `root`.
pub fn anchor_urls(root: ElementRef, base: Option<&Url>) -> Vec<String> {
    root.select(&ANCHOR_SEL)
        .filter_map(|a| a.value().attr("href").and_then(|h| resolve_url(base, h)))
        .collect()
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    const FED: &str = "https://www.federalreserve.gov";

    fn base() -> Url {
        Url::parse("https://www.federalreserve.gov/monetarypolicy/fomccalendars.htm").unwrap()
    }

    #[test]
    fn statement_url_shape() {
        let url = format!("{FED}/newsevents/pressreleases/monetary20240131a.htm");
        assert_eq!(classify_link(&url, "HTML"), Some(LinkKind::Statement));
    }

    #[test]
    fn implementation_note_is_not_a_statement() {
        let url = format!("{FED}/newsevents/pressreleases/monetary20240131a1.htm");
        assert_eq!(classify_link(&url, "HTML"), None);
        assert_eq!(classify_link(&url, "Statement"), None);
        assert_eq!(classify_link(&format!("{FED}/x.htm"), "Implementation Note"), None);
    }

    #[test]
    fn minutes_and_press_conference_shapes() {
        let minutes = format!("{FED}/monetarypolicy/fomcminutes20240131.htm");
        let presser = format!("{FED}/monetarypolicy/fomcpresconf20240131.htm");
        assert_eq!(classify_link(&minutes, "HTML"), Some(LinkKind::Minutes));
        assert_eq!(classify_link(&presser, "x"), Some(LinkKind::PressConference));
    }

    #[test]
    fn pdfs_fall_back_to_label() {
        let pdf = format!("{FED}/monetarypolicy/files/fomcminutes20240131.pdf");
        assert_eq!(classify_link(&pdf, "PDF"), None);
        assert_eq!(classify_link(&pdf, "Minutes (PDF)"), Some(LinkKind::Minutes));
    }

    #[test]
    fn label_keywords() {
        let url = format!("{FED}/fomc/19970204.htm");
        assert_eq!(classify_link(&url, "Statement"), Some(LinkKind::Statement));
        assert_eq!(classify_link(&url, "Press Release"), Some(LinkKind::Statement));
        assert_eq!(classify_link(&url, "Minutes"), Some(LinkKind::Minutes));
        assert_eq!(classify_link(&url, "Press Conference"), Some(LinkKind::PressConference));
        assert_eq!(classify_link(&url, "Beige Book"), None);
    }

    #[test]
    fn projection_signals() {
        assert!(is_projection_link("https://x/a.htm", "Projection Materials"));
        assert!(is_projection_link(&format!("{FED}/monetarypolicy/fomcprojtabl20240320.htm"), "HTML"));
        assert!(is_projection_link("https://x/a.pdf", "SEP"));
        assert!(!is_projection_link("https://x/a.htm", "Sep 17 Minutes"));
        assert!(mentions_projections("Summary of Economic Projections"));
    }

    #[test]
    fn resolves_relative_and_keeps_absolute() {
        let base = base();
        assert_eq!(
            resolve_url(Some(&base), "/monetarypolicy/fomcminutes20240131.htm").as_deref(),
            Some("https://www.federalreserve.gov/monetarypolicy/fomcminutes20240131.htm")
        );
        assert_eq!(
            resolve_url(Some(&base), "fomcpresconf20240131.htm").as_deref(),
            Some("https://www.federalreserve.gov/monetarypolicy/fomcpresconf20240131.htm")
        );
        assert_eq!(
            resolve_url(Some(&base), "http://example.org/a.htm").as_deref(),
            Some("http://example.org/a.htm")
        );
        assert_eq!(resolve_url(Some(&base), "  "), None);
    }

    #[test]
    fn statement_date_and_url_year() {
        let url = format!("{FED}/newsevents/pressreleases/monetary20240131a.htm");
        assert_eq!(statement_date(&url), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(statement_date("monetary20241399a.htm"), None);
        assert_eq!(url_year(&url), Some(2024));
        assert_eq!(url_year("https://x/fomc/a.htm"), None);
    }

    #[test]
    fn first_link_of_a_kind_wins() {
        let html = Html::parse_fragment(
            r#"<div>
              <a href="/newsevents/pressreleases/monetary20240131a.htm">HTML</a>
              <a href="/newsevents/pressreleases/monetary20240131a1.htm">Implementation Note</a>
              <a href="/monetarypolicy/files/monetary20240131a1.pdf">Statement</a>
              <a href="/monetarypolicy/fomcprojtabl20240131.htm">Projection Materials</a>
            </div>"#,
        );
        let links = collect_links(html.root_element(), Some(&base()));
        assert_eq!(
            links.statement.as_deref(),
            Some("https://www.federalreserve.gov/newsevents/pressreleases/monetary20240131a.htm")
        );
        assert!(links.minutes.is_none());
        assert!(links.has_projection);
    }
}
