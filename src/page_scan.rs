use log::debug;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use crate::identifier::{
    ARXIV_ABS_BASE, ARXIV_PDF_BASE, extract_identifier, normalize_title, strip_title_label,
};

/// One candidate paper, keyed by its arXiv identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    pub arxiv_id: String,
    /// Normalized title, or `None` until a lookup has supplied one.
    pub title: Option<String>,
    pub abs_url: String,
    pub pdf_url: String,
    pub source: SourceLabel,
    /// Distinguishes "not looked up yet" from "looked up, nothing found".
    pub title_fetched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLabel {
    OpenTab,
    SearchResults,
}

impl SourceLabel {
    pub fn label(&self) -> &'static str {
        match self {
            SourceLabel::OpenTab => "open tab",
            SourceLabel::SearchResults => "Google Scholar",
        }
    }
}

impl PaperRecord {
    pub fn new(arxiv_id: impl Into<String>, title: Option<String>, source: SourceLabel) -> Self {
        let arxiv_id = arxiv_id.into();
        let title_fetched = title.is_some();
        Self {
            abs_url: format!("{}{}", ARXIV_ABS_BASE, arxiv_id),
            pdf_url: format!("{}{}.pdf", ARXIV_PDF_BASE, arxiv_id),
            arxiv_id,
            title,
            source,
            title_fetched,
        }
    }
}

/// Pull the paper title out of abstract-page markup.
///
/// Fallback order: citation_title meta, og:title meta, then the visible
/// h1.title heading with its "Title:" label stripped. PDF views have no
/// usable structure, so anything that is not an abstract page is `None`.
pub fn extract_title_from_html(html: &str, is_abstract_page: bool) -> Option<String> {
    if !is_abstract_page {
        return None;
    }

    let doc = Html::parse_document(html);

    meta_content(&doc, r#"meta[name="citation_title"]"#)
        .or_else(|| meta_content(&doc, r#"meta[property="og:title"]"#))
        .or_else(|| heading_title(&doc))
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).unwrap();
    doc.select(&sel)
        .next()?
        .value()
        .attr("content")
        .and_then(normalize_title)
}

fn heading_title(doc: &Html) -> Option<String> {
    let sel = Selector::parse("h1.title").unwrap();
    let heading = doc.select(&sel).next()?;
    let text: String = heading.text().collect();
    normalize_title(&strip_title_label(&text))
}

/// Scan a single arXiv abstract/PDF page.
///
/// The identifier comes from the URL; the title only from abstract markup.
/// Returns `None` when the URL carries no identifier, never panics on
/// unexpected markup.
pub fn scan_arxiv_page(url: &str, html: Option<&str>) -> Option<PaperRecord> {
    let arxiv_id = extract_identifier(url)?;
    let is_abstract = url.contains("/abs/");
    let title = html.and_then(|h| extract_title_from_html(h, is_abstract));
    Some(PaperRecord::new(arxiv_id, title, SourceLabel::OpenTab))
}

/// Scan a Google Scholar results page for arXiv links.
///
/// One candidate per distinct identifier, in first-seen order; a non-null
/// title always wins over a null one when the same identifier shows up
/// through several links. If the result containers match nothing (page
/// structure variant), falls back to a page-wide link scan.
pub fn scan_scholar_page(html: &str) -> Vec<PaperRecord> {
    let doc = Html::parse_document(html);
    let result_sel = Selector::parse(".gs_r").unwrap();
    let title_sel = Selector::parse(".gs_rt").unwrap();
    let anchor_sel = Selector::parse("a").unwrap();
    let link_sel =
        Selector::parse(r#"a[href*="arxiv.org/abs/"], a[href*="arxiv.org/pdf/"]"#).unwrap();

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, PaperRecord> = HashMap::new();

    for result in doc.select(&result_sel) {
        let title_text = result
            .select(&title_sel)
            .next()
            .map(|el| title_text_of(el, &anchor_sel));

        for link in result.select(&link_sel) {
            let arxiv_id = link.value().attr("href").and_then(extract_identifier);
            register_candidate(&mut order, &mut by_id, arxiv_id, title_text.clone());
        }
    }

    if by_id.is_empty() {
        debug!("no Scholar result blocks matched, falling back to page-wide link scan");
        for link in doc.select(&link_sel) {
            let arxiv_id = link.value().attr("href").and_then(extract_identifier);
            let text: String = link.text().collect();
            register_candidate(&mut order, &mut by_id, arxiv_id, Some(text));
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}

/// Prefer the title link's text over the raw heading text.
fn title_text_of(title_el: ElementRef<'_>, anchor_sel: &Selector) -> String {
    match title_el.select(anchor_sel).next() {
        Some(link) => link.text().collect(),
        None => title_el.text().collect(),
    }
}

fn register_candidate(
    order: &mut Vec<String>,
    by_id: &mut HashMap<String, PaperRecord>,
    arxiv_id: Option<String>,
    title_text: Option<String>,
) {
    let Some(arxiv_id) = arxiv_id else {
        return;
    };

    let title = title_text.as_deref().and_then(normalize_title);

    match by_id.get_mut(&arxiv_id) {
        Some(existing) => {
            if existing.title.is_none() && title.is_some() {
                existing.title = title;
                existing.title_fetched = true;
            }
        }
        None => {
            order.push(arxiv_id.clone());
            by_id.insert(
                arxiv_id.clone(),
                PaperRecord::new(arxiv_id, title, SourceLabel::SearchResults),
            );
        }
    }
}
