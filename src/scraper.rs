//! Page fetching and excerpt extraction.
//!
//! Uses reqwest for fetching and scraper for HTML parsing. Extraction is
//! fail-soft: anything that goes wrong yields the search snippet instead.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::ExtractSettings;
use crate::report::Category;
use crate::search::{CategoryResults, SearchHit};

/// User-Agent string identifying this scraper
const USER_AGENT: &str = concat!("callprep/", env!("CARGO_PKG_VERSION"), " (https://github.com/cladam/callprep)");

/// Text blocks this short are navigation crumbs, captions and the like
const MIN_BLOCK_CHARS: usize = 40;

/// Content roots tried before falling back to the whole document
const MAIN_SELECTORS: [&str; 5] = ["article", "main", "[role='main']", "#content", ".content"];

/// Elements whose text never belongs in an excerpt
const BOILERPLATE: [&str; 8] = ["nav", "header", "footer", "aside", "script", "style", "noscript", "form"];

const BLOCK_TAGS: [&str; 8] = ["p", "li", "h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to fetch URL: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// External URL -> raw markup service.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Create a configured HTTP client for scraping
pub(crate) fn create_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Fetches pages over HTTP, accepting only textual content.
pub struct HttpFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(settings: &ExtractSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_client(settings.timeout())?,
            max_bytes: settings.max_download_bytes,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default().to_ascii_lowercase();
            if !is_textual(&content_type) {
                return Err(FetchError::UnsupportedContentType(content_type));
            }
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_bytes {
                body.truncate(self.max_bytes);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn is_textual(content_type: &str) -> bool {
    ["text/html", "application/xhtml+xml", "text/plain"]
        .iter()
        .any(|t| content_type.starts_with(t))
}

/// Where an excerpt came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    Page,
    Snippet,
}

/// Display text derived from one search hit. `excerpt` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub url: String,
    pub excerpt: String,
    pub source_title: String,
    pub category: Category,
    pub rank: usize,
    pub origin: ContentOrigin,
}

impl ExtractedContent {
    /// Content built from the search result alone
    pub fn from_snippet(hit: &SearchHit) -> Self {
        let excerpt = if hit.snippet.is_empty() {
            hit.title.clone()
        } else {
            hit.snippet.clone()
        };
        Self {
            url: hit.url.clone(),
            excerpt,
            source_title: source_title(hit, None),
            category: hit.category,
            rank: hit.rank,
            origin: ContentOrigin::Snippet,
        }
    }
}

fn source_title(hit: &SearchHit, page_title: Option<String>) -> String {
    if !hit.title.is_empty() {
        hit.title.clone()
    } else {
        page_title.unwrap_or_else(|| hit.url.clone())
    }
}

/// Turns search hits into display excerpts.
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
    settings: ExtractSettings,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: ExtractSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Extract every hit, fetching only the top `fetch_top_n` per category.
    ///
    /// Fetches still running at `deadline` are abandoned and use the snippet.
    pub async fn extract_all(
        &self,
        results: &CategoryResults,
        company: &str,
        deadline: Instant,
    ) -> BTreeMap<Category, Vec<ExtractedContent>> {
        let jobs = results.values().flat_map(move |hits| {
            hits.iter().enumerate().map(move |(i, hit)| {
                let fetch = i < self.settings.fetch_top_n;
                async move {
                    match tokio::time::timeout_at(deadline, self.extract(hit, company, fetch)).await {
                        Ok(content) => content,
                        Err(_) => {
                            debug!(url = %hit.url, "fetch abandoned at request deadline");
                            ExtractedContent::from_snippet(hit)
                        }
                    }
                }
            })
        });
        let extracted = join_all(jobs).await;

        let fetched = extracted.iter().filter(|c| c.origin == ContentOrigin::Page).count();
        info!(items = extracted.len(), fetched, "content extraction complete");

        let mut grouped: BTreeMap<Category, Vec<ExtractedContent>> =
            results.keys().map(|c| (*c, Vec::new())).collect();
        for content in extracted {
            grouped.entry(content.category).or_default().push(content);
        }
        grouped
    }

    /// Build content for one hit, optionally fetching its page first
    pub async fn extract(&self, hit: &SearchHit, company: &str, fetch: bool) -> ExtractedContent {
        if !fetch {
            return ExtractedContent::from_snippet(hit);
        }

        let timeout = self.settings.timeout();
        let html = match tokio::time::timeout(timeout, self.fetcher.fetch(&hit.url)).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                debug!(url = %hit.url, error = %e, "fetch failed, using snippet");
                return ExtractedContent::from_snippet(hit);
            }
            Err(_) => {
                debug!(url = %hit.url, error = %FetchError::Timeout(timeout), "fetch failed, using snippet");
                return ExtractedContent::from_snippet(hit);
            }
        };

        let document = Html::parse_document(&html);
        match extract_excerpt(&document, company, self.settings.max_excerpt_chars) {
            Some(excerpt) if excerpt.chars().count() >= self.settings.min_excerpt_chars => ExtractedContent {
                url: hit.url.clone(),
                excerpt,
                source_title: source_title(hit, extract_title(&document)),
                category: hit.category,
                rank: hit.rank,
                origin: ContentOrigin::Page,
            },
            _ => {
                debug!(url = %hit.url, "page excerpt too short, using snippet");
                ExtractedContent::from_snippet(hit)
            }
        }
    }
}

/// Extract the page title from <title> or <h1>
pub fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        let element = document.select(&selector).next()?;
        let title = collapse_whitespace(&element.text().collect::<String>());
        (!title.is_empty()).then_some(title)
    })
}

/// Build a bounded excerpt from the page's readable text.
///
/// Starts at the first block naming the company when there is one.
pub fn extract_excerpt(document: &Html, company: &str, max_chars: usize) -> Option<String> {
    let blocks = readable_blocks(document);
    if blocks.is_empty() {
        return None;
    }

    let needle = company.trim().to_lowercase();
    let start = if needle.is_empty() {
        0
    } else {
        blocks
            .iter()
            .position(|b| b.to_lowercase().contains(&needle))
            .unwrap_or(0)
    };

    Some(truncate_excerpt(&blocks[start..].join(" "), max_chars))
}

/// Paragraph, list and heading text outside navigation boilerplate
fn readable_blocks(document: &Html) -> Vec<String> {
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(root) = document.select(&selector).next() {
                let blocks = blocks_under(root);
                if !blocks.is_empty() {
                    return blocks;
                }
            }
        }
    }

    blocks_under(document.root_element())
}

fn blocks_under(root: ElementRef<'_>) -> Vec<String> {
    let Ok(selector) = Selector::parse(&BLOCK_TAGS.join(", ")) else {
        return Vec::new();
    };

    root.select(&selector)
        .filter(|element| !inside_skipped(element))
        .map(|element| collapse_whitespace(&element.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| text.chars().count() > MIN_BLOCK_CHARS)
        .collect()
}

/// Boilerplate ancestors are skipped, and so are blocks nested in another block
fn inside_skipped(element: &ElementRef<'_>) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|e| BOILERPLATE.contains(&e.name()) || BLOCK_TAGS.contains(&e.name()))
            .unwrap_or(false)
    })
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to at most `max_chars` characters, preferring a word boundary
pub fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let cut = text
        .char_indices()
        .nth(max_chars - 1)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];
    let head = match head.rfind(' ') {
        Some(space) if space > cut / 2 => &head[..space],
        _ => head,
    };
    let head = head.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == ':');
    format!("{head}…")
}
