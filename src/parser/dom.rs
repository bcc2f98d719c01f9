use scraper::{ElementRef, Html};

/// Block-level tags a container may be.
pub const BLOCK_TAGS: &[&str] = &["li", "p", "div"];
/// Block tags on the historical pages, which also lay meetings out in tables.
pub const BLOCK_TAGS_WITH_ROWS: &[&str] = &["li", "p", "div", "tr"];
pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// Every node of a document in pre-order, so "everything before this element"
/// is a slice. Text and comment nodes are kept as `None` because backward
/// windows count them.
pub struct DocumentIndex<'a> {
    nodes: Vec<Option<ElementRef<'a>>>,
}

impl<'a> DocumentIndex<'a> {
    pub fn new(doc: &'a Html) -> Self {
        let nodes = doc
            .tree
            .root()
            .descendants()
            .skip(1)
            .map(ElementRef::wrap)
            .collect();
        Self { nodes }
    }

    pub fn position(&self, el: ElementRef<'a>) -> Option<usize> {
        self.nodes.iter().position(|n| *n == Some(el))
    }

    /// Elements before `el` in document order, nearest first. `window` bounds
    /// how many nodes (of any kind) are stepped over.
    pub fn preceding(
        &self,
        el: ElementRef<'a>,
        window: Option<usize>,
    ) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        let pos = self.position(el).unwrap_or(0);
        self.nodes[..pos]
            .iter()
            .rev()
            .take(window.unwrap_or(usize::MAX))
            .filter_map(|n| *n)
    }
}

pub fn tag_name<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().name()
}

pub fn is_one_of(el: &ElementRef, tags: &[&str]) -> bool {
    tags.contains(&tag_name(el))
}

/// Visible text with each text node trimmed and joined by a single space.
pub fn element_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn parent_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Nearest ancestor whose tag is in `tags`.
pub fn enclosing<'a>(el: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| is_one_of(a, tags))
}
