use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use std::collections::HashMap;

use crate::identifier::{extract_identifier, is_scholar_url, resolve_arxiv_url};
use crate::page_scan::{self, PaperRecord, SourceLabel};

/// One browser tab of the session under inspection.
#[derive(Debug, Clone)]
pub struct TabInfo {
    pub url: String,
    /// In-flight navigation target, when the tab is still loading.
    pub pending_url: Option<String>,
}

impl TabInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pending_url: None,
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.url.as_str()).chain(self.pending_url.as_deref())
    }
}

/// Transport to a page's rendered markup. An `Err` means the page is
/// unreachable; "reachable but empty" comes back as `Ok`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

/// Production `PageSource` backed by a shared HTTP client.
pub struct HttpPageSource {
    client: reqwest::Client,
}

impl HttpPageSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// What one refresh of the paper list produced.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub papers: Vec<PaperRecord>,
    pub scholar_tab_active: bool,
    /// Set when the active Scholar page could not be read at all, as
    /// opposed to it containing no arXiv links.
    pub scholar_scan_failed: bool,
}

pub struct Aggregator<S: PageSource> {
    source: S,
}

impl<S: PageSource> Aggregator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Build the deduplicated paper collection from every tab plus the
    /// active tab's Scholar results, in first-seen identifier order.
    pub async fn load_paper_items(&self, tabs: &[TabInfo], active: Option<&TabInfo>) -> LoadReport {
        let mut items = Vec::new();

        for tab in tabs {
            if let Some(record) = self.paper_from_tab(tab).await {
                items.push(record);
            }
        }

        let mut report = LoadReport::default();

        if let Some(active) = active {
            if is_scholar_url(&active.url) {
                report.scholar_tab_active = true;
                match self.source.fetch_html(&active.url).await {
                    Ok(html) => {
                        let papers = page_scan::scan_scholar_page(&html);
                        info!("Scholar page yielded {} papers", papers.len());
                        items.extend(papers);
                    }
                    Err(err) => {
                        warn!("Could not read Scholar page {}: {}", active.url, err);
                        report.scholar_scan_failed = true;
                    }
                }
            }
        }

        report.papers = merge_records(items);
        report
    }

    /// Scan one tab. Unreachable abstract pages degrade to an
    /// identifier-only record derived from the URL.
    async fn paper_from_tab(&self, tab: &TabInfo) -> Option<PaperRecord> {
        let resolved = resolve_arxiv_url(tab.candidates())?;

        if resolved.contains("/abs/") {
            match self.source.fetch_html(&resolved).await {
                Ok(html) => page_scan::scan_arxiv_page(&resolved, Some(&html)),
                Err(err) => {
                    debug!("Tab {} unreachable ({}), falling back to URL", resolved, err);
                    let arxiv_id = extract_identifier(&resolved)?;
                    Some(PaperRecord::new(arxiv_id, None, SourceLabel::OpenTab))
                }
            }
        } else {
            // A binary PDF view has nothing worth fetching; the title is
            // hydrated later from the abstract page.
            let arxiv_id = extract_identifier(&resolved)?;
            Some(PaperRecord::new(arxiv_id, None, SourceLabel::OpenTab))
        }
    }

    /// Fetch the abstract page of every record still missing a title, all
    /// concurrently. One record's failure never blocks another's; the
    /// `title_fetched` flag is set either way.
    pub async fn hydrate_missing_titles(&self, records: &mut [PaperRecord]) {
        let lookups: Vec<_> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.title.is_none())
            .map(|(idx, record)| {
                let abs_url = record.abs_url.clone();
                async move {
                    let title = match self.source.fetch_html(&abs_url).await {
                        Ok(html) => page_scan::extract_title_from_html(&html, true),
                        Err(err) => {
                            debug!("Title fetch failed for {}: {}", abs_url, err);
                            None
                        }
                    };
                    (idx, title)
                }
            })
            .collect();

        for (idx, title) in join_all(lookups).await {
            let record = &mut records[idx];
            if title.is_some() {
                record.title = title;
            }
            record.title_fetched = true;
        }
    }
}

/// Merge candidate records into one collection keyed by identifier.
///
/// Keeps insertion order of first appearance; an existing non-null title is
/// never overwritten, a null one adopts the first non-null title seen.
pub fn merge_records(items: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut merged: Vec<PaperRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        if item.arxiv_id.is_empty() {
            continue;
        }

        match index.get(&item.arxiv_id) {
            Some(&at) => {
                let existing = &mut merged[at];
                if existing.title.is_none() && item.title.is_some() {
                    existing.title = item.title;
                    existing.title_fetched = true;
                }
            }
            None => {
                index.insert(item.arxiv_id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
