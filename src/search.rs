//! Web search: the provider seam and the per-category executor.
//!
//! The default provider scrapes DuckDuckGo's HTML endpoint, which needs no
//! API key.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SearchSettings;
use crate::planner::QueryPlan;
use crate::relevance::is_relevant;
use crate::report::Category;
use crate::scraper::{collapse_whitespace, create_client};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search provider unavailable: {0}")]
    Unavailable(String),
    #[error("search timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to parse search results: {0}")]
    Parse(String),
}

impl SearchError {
    /// Worth one immediate retry
    pub fn is_transient(&self) -> bool {
        matches!(self, SearchError::Unavailable(_) | SearchError::Timeout(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Unavailable(err.to_string())
    }
}

/// A raw result as returned by a provider, in rank order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, url: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// A validated result tagged with its category and 1-based rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub category: Category,
    pub rank: usize,
}

/// Hits per category; a failed category maps to an empty list
pub type CategoryResults = BTreeMap<Category, Vec<SearchHit>>;

/// External query -> results service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

/// Scrapes the DuckDuckGo HTML results page.
pub struct DuckDuckGoProvider {
    client: Client,
    endpoint: String,
}

impl DuckDuckGoProvider {
    pub fn new(settings: &SearchSettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: create_client(settings.timeout())?,
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Unavailable(format!("HTTP {status}")));
        }

        let html = response.text().await?;
        parse_duckduckgo_html(&html, max_results)
    }
}

/// Parse result containers out of a DuckDuckGo HTML page
pub fn parse_duckduckgo_html(html: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let container = Selector::parse("div.result").map_err(|e| SearchError::Parse(e.to_string()))?;
    let title = Selector::parse("a.result__a").map_err(|e| SearchError::Parse(e.to_string()))?;
    let snippet = Selector::parse(".result__snippet").map_err(|e| SearchError::Parse(e.to_string()))?;

    let mut results = Vec::new();
    for element in document.select(&container) {
        if results.len() >= limit {
            break;
        }
        // Sponsored results
        if element.value().classes().any(|c| c == "result--ad") {
            continue;
        }

        let Some(anchor) = element.select(&title).next() else {
            continue;
        };
        let Some(url) = anchor.value().attr("href").and_then(normalize_result_href) else {
            continue;
        };

        let title_text = collapse_whitespace(&anchor.text().collect::<String>());
        let snippet_text = element
            .select(&snippet)
            .next()
            .map(|s| collapse_whitespace(&s.text().collect::<String>()))
            .unwrap_or_default();

        results.push(SearchResult::new(title_text, url, snippet_text));
    }

    if results.is_empty() && looks_like_challenge(html) {
        return Err(SearchError::Unavailable(
            "provider returned a bot challenge".to_string(),
        ));
    }

    Ok(results)
}

fn looks_like_challenge(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("anomaly-modal") || lower.contains("challenge-form")
}

/// Resolve a result link to the destination URL.
///
/// DuckDuckGo wraps destinations in `/l/?uddg=<encoded>` redirects.
pub fn normalize_result_href(href: &str) -> Option<String> {
    let trimmed = href.trim();
    let absolute = if trimmed.starts_with("//") {
        format!("https:{trimmed}")
    } else if trimmed.starts_with('/') {
        format!("https://duckduckgo.com{trimmed}")
    } else {
        trimmed.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if !host.ends_with("duckduckgo.com") {
        return is_web_url(&absolute).then_some(absolute);
    }

    if !parsed.path().starts_with("/l/") {
        return None;
    }
    let target = parsed
        .query_pairs()
        .find(|(k, _)| k == "uddg")
        .map(|(_, v)| v.trim().to_string())?;
    let target_host = Url::parse(&target).ok()?.host_str()?.to_ascii_lowercase();
    if target_host.ends_with("duckduckgo.com") {
        return None;
    }
    is_web_url(&target).then_some(target)
}

/// Absolute http(s) URL with a host
pub fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Runs one search per category with timeout and retry isolation.
pub struct SearchExecutor {
    provider: Arc<dyn SearchProvider>,
    settings: SearchSettings,
}

impl SearchExecutor {
    pub fn new(provider: Arc<dyn SearchProvider>, settings: SearchSettings) -> Self {
        Self { provider, settings }
    }

    /// Search every planned category concurrently.
    ///
    /// Categories that fail or miss `deadline` come back empty.
    pub async fn run(&self, plan: &QueryPlan, deadline: Instant) -> CategoryResults {
        let searches = plan.iter().map(move |(category, query)| async move {
            let hits = match tokio::time::timeout_at(deadline, self.search_category(category, query)).await {
                Ok(Ok(hits)) => {
                    if hits.is_empty() {
                        debug!(%category, query, "search returned no results");
                    }
                    hits
                }
                Ok(Err(e)) => {
                    warn!(%category, query, error = %e, "search failed");
                    Vec::new()
                }
                Err(_) => {
                    warn!(%category, query, "search abandoned at request deadline");
                    Vec::new()
                }
            };
            (category, hits)
        });

        let results: CategoryResults = join_all(searches).await.into_iter().collect();
        info!(
            total = results.values().map(Vec::len).sum::<usize>(),
            "search fan-out complete"
        );
        results
    }

    /// Search a single category, retrying once on a transient failure
    pub async fn search_category(&self, category: Category, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let results = match self.attempt(query).await {
            Ok(results) => results,
            Err(e) if e.is_transient() && self.settings.retry_once => {
                debug!(%category, error = %e, "retrying search once");
                self.attempt(query).await?
            }
            Err(e) => return Err(e),
        };
        Ok(into_hits(category, results, self.settings.max_results))
    }

    async fn attempt(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let timeout = self.settings.timeout();
        tokio::time::timeout(timeout, self.provider.search(query, self.settings.max_results))
            .await
            .map_err(|_| SearchError::Timeout(timeout))?
    }
}

/// Drop unusable results, cap the list and assign ranks in provider order.
///
/// Off-topic hits are dropped after ranking, so ranks may have gaps.
fn into_hits(category: Category, results: Vec<SearchResult>, max_results: usize) -> Vec<SearchHit> {
    results
        .into_iter()
        .filter(|r| is_web_url(r.url.trim()))
        .filter(|r| !(r.title.trim().is_empty() && r.snippet.trim().is_empty()))
        .take(max_results)
        .enumerate()
        .map(|(i, r)| SearchHit {
            title: r.title.trim().to_string(),
            url: r.url.trim().to_string(),
            snippet: r.snippet.trim().to_string(),
            category,
            rank: i + 1,
        })
        .filter(|hit| is_relevant(hit.category, &hit.title, &hit.snippet))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryTemplates;
    use crate::planner::QueryPlanner;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DDG_PAGE: &str = r##"
        <html><body>
          <div class="result results_links result--ad">
            <a class="result__a" href="https://duckduckgo.com/y.js?ad_domain=ads.example">Sponsored</a>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fnews%3Fid%3D1&amp;rut=abc">Figma   raises
              Series E</a></h2>
            <a class="result__snippet" href="#">Figma closed a $200 million round.</a>
          </div>
          <div class="result results_links">
            <a class="result__a" href="https://www.figma.com/about/">About Figma</a>
            <div class="result__snippet">Figma is a collaborative design tool.</div>
          </div>
          <div class="result results_links">
            <a class="result__a" href="javascript:void(0)">Broken</a>
          </div>
        </body></html>
    "##;

    #[test]
    fn parses_results_and_decodes_redirects() {
        let results = parse_duckduckgo_html(DDG_PAGE, 10).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].url, "https://example.com/news?id=1");
        assert_eq!(results[0].title, "Figma raises Series E");
        assert_eq!(results[0].snippet, "Figma closed a $200 million round.");
        assert_eq!(results[1].url, "https://www.figma.com/about/");
    }

    #[test]
    fn parse_respects_limit() {
        let results = parse_duckduckgo_html(DDG_PAGE, 1).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn challenge_page_is_unavailable() {
        let html = r#"<html><body><form id="challenge-form"></form></body></html>"#;
        assert!(matches!(
            parse_duckduckgo_html(html, 5),
            Err(SearchError::Unavailable(_))
        ));
        assert_eq!(parse_duckduckgo_html("<html></html>", 5).unwrap(), Vec::new());
    }

    #[test]
    fn href_normalization() {
        assert_eq!(
            normalize_result_href("/l/?uddg=https%3A%2F%2Fexample.org%2F").as_deref(),
            Some("https://example.org/")
        );
        assert_eq!(normalize_result_href("https://duckduckgo.com/y.js?x=1"), None);
        assert_eq!(normalize_result_href("mailto:a@b.c"), None);
        assert_eq!(normalize_result_href(""), None);
    }

    struct ScriptedProvider {
        calls: AtomicUsize,
        failures_before_success: usize,
        error: fn() -> SearchError,
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl SearchProvider for ScriptedProvider {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchResult>, SearchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                return Err((self.error)());
            }
            Ok(self.results.clone())
        }
    }

    fn scripted(failures: usize, error: fn() -> SearchError, results: Vec<SearchResult>) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider {
            calls: AtomicUsize::new(0),
            failures_before_success: failures,
            error,
            results,
        })
    }

    fn numbered(n: usize) -> Vec<SearchResult> {
        (1..=n)
            .map(|i| SearchResult::new(format!("Title {i}"), format!("https://example.com/{i}"), format!("Snippet {i}")))
            .collect()
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider = scripted(1, || SearchError::Unavailable("reset".into()), numbered(2));
        let executor = SearchExecutor::new(provider.clone(), SearchSettings::default());

        let hits = executor.search_category(Category::CompanyInfo, "q").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_failure_is_returned() {
        let provider = scripted(5, || SearchError::Unavailable("down".into()), Vec::new());
        let executor = SearchExecutor::new(provider.clone(), SearchSettings::default());

        assert!(executor.search_category(Category::Funding, "q").await.is_err());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn parse_errors_are_not_retried() {
        let provider = scripted(5, || SearchError::Parse("bad".into()), Vec::new());
        let executor = SearchExecutor::new(provider.clone(), SearchSettings::default());

        assert!(matches!(
            executor.search_category(Category::Funding, "q").await,
            Err(SearchError::Parse(_))
        ));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn results_are_capped_ranked_and_validated() {
        let mut results = vec![SearchResult::new("Bad", "not a url", "x")];
        results.extend(numbered(7));
        let provider = scripted(0, || SearchError::Unavailable(String::new()), results);
        let executor = SearchExecutor::new(provider, SearchSettings::default());

        let hits = executor.search_category(Category::CompanyInfo, "q").await.unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].url, "https://example.com/1");
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[4].rank, 5);
        assert!(hits.iter().all(|h| h.category == Category::CompanyInfo));
    }

    #[tokio::test]
    async fn off_topic_hits_are_dropped_keeping_provider_rank() {
        let results = vec![
            SearchResult::new(
                "Acme Corp - Wikipedia",
                "https://en.wikipedia.org/wiki/Acme_Corp",
                "Acme Corp is an American company founded in 1920 that makes anvils.",
            ),
            SearchResult::new(
                "Acme appoints new CFO",
                "https://news.example.com/acme-cfo",
                "Jane Doe takes over finance.",
            ),
        ];
        let provider = scripted(0, || SearchError::Unavailable(String::new()), results);
        let executor = SearchExecutor::new(provider, SearchSettings::default());

        let hits = executor.search_category(Category::Leadership, "q").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "https://news.example.com/acme-cfo");
        assert_eq!(hits[0].rank, 2);
    }

    struct StallingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SearchProvider for StallingProvider {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchResult>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(numbered(1))
        }
    }

    #[tokio::test]
    async fn attempt_timeout_is_retried_like_a_provider_error() {
        let provider = Arc::new(StallingProvider {
            calls: AtomicUsize::new(0),
        });
        let settings = SearchSettings {
            timeout_secs: 1,
            ..SearchSettings::default()
        };
        let executor = SearchExecutor::new(provider.clone(), settings);

        let outcome = executor.search_category(Category::CompanyInfo, "q").await;
        assert!(matches!(outcome, Err(SearchError::Timeout(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    struct SlowProvider;

    #[async_trait]
    impl SearchProvider for SlowProvider {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<SearchResult>, SearchError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(numbered(1))
        }
    }

    #[tokio::test]
    async fn run_returns_empty_categories_at_deadline() {
        let executor = SearchExecutor::new(Arc::new(SlowProvider), SearchSettings::default());
        let plan = QueryPlanner::new(QueryTemplates::default()).plan("Acme").unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        let results = executor.run(&plan, deadline).await;

        assert_eq!(results.len(), 4);
        assert!(results.values().all(Vec::is_empty));
    }
}
