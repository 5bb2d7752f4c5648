use async_trait::async_trait;
use callprep::report::SignalKind;
use callprep::{Config, FetchError, PageFetcher, ResearchError, Researcher, SearchError, SearchProvider, SearchResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Answers by matching a fragment of the planned query.
#[derive(Default)]
struct FakeSearch {
    responses: HashMap<&'static str, Vec<SearchResult>>,
    fail_all: bool,
    calls: AtomicUsize,
}

impl FakeSearch {
    fn with(mut self, query_fragment: &'static str, results: Vec<SearchResult>) -> Self {
        self.responses.insert(query_fragment, results);
        self
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(SearchError::Unavailable("simulated outage".to_string()));
        }
        Ok(self
            .responses
            .iter()
            .find(|(fragment, _)| query.contains(*fragment))
            .map(|(_, results)| results.clone())
            .unwrap_or_default())
    }
}

struct HangingSearch;

#[async_trait]
impl SearchProvider for HangingSearch {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        tokio::time::sleep(Duration::from_secs(120)).await;
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct FailingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl PageFetcher for FailingFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::Status(404))
    }
}

const LEADERSHIP: &str = "leadership executive";
const FUNDING: &str = "funding round";
const PRIORITIES: &str = "priorities strategy";

fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult::new(title, url, snippet)
}

fn researcher(search: Arc<FakeSearch>, fetcher: Arc<FailingFetcher>) -> Researcher {
    Researcher::new(Config::default(), search, fetcher)
}

#[tokio::test]
async fn provider_outage_still_yields_full_report() {
    for search in [
        FakeSearch::default(),
        FakeSearch {
            fail_all: true,
            ..FakeSearch::default()
        },
    ] {
        let search = Arc::new(search);
        let researcher = researcher(search.clone(), Arc::new(FailingFetcher::default()));

        let report = researcher.research("Figma").await.unwrap();

        assert_eq!(report.company_name, "Figma");
        assert_eq!(report.sections().len(), 4);
        assert!(report.is_empty());
        assert_eq!(report.discovery_angles.len(), 3);
        assert!(report
            .discovery_angles
            .iter()
            .all(|a| a.signal == SignalKind::Generic));
        assert!(search.calls.load(Ordering::SeqCst) >= 4);
    }
}

#[tokio::test]
async fn empty_name_fails_before_any_network_call() {
    let search = Arc::new(FakeSearch::default());
    let fetcher = Arc::new(FailingFetcher::default());
    let researcher = researcher(search.clone(), fetcher.clone());

    for name in ["", "   "] {
        let err = researcher.research(name).await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidInput(_)));
    }
    assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn leadership_news_drives_first_angle() {
    let search = Arc::new(FakeSearch::default().with(
        LEADERSHIP,
        vec![result(
            "Acme shakes up finance team",
            "https://news.example.com/acme-cfo",
            "Acme said a new CFO appointed this week will oversee its IPO preparations.",
        )],
    ));
    let researcher = researcher(search, Arc::new(FailingFetcher::default()));

    let report = researcher.research("Acme").await.unwrap();

    assert_eq!(report.leadership.items.len(), 1);
    assert!(report.financials.is_empty());
    assert!(report.priorities.is_empty());

    let signals: Vec<SignalKind> = report.discovery_angles.iter().map(|a| a.signal).collect();
    assert_eq!(
        signals,
        vec![SignalKind::LeadershipChange, SignalKind::Generic, SignalKind::Generic]
    );
    assert!(report.discovery_angles[0].text.contains("leadership change"));
}

#[tokio::test]
async fn off_topic_leadership_results_leave_the_section_empty() {
    let search = Arc::new(FakeSearch::default().with(
        LEADERSHIP,
        vec![result(
            "Acme Corp - Wikipedia",
            "https://en.wikipedia.org/wiki/Acme_Corp",
            "Acme Corp is an American company founded in 1920 that makes anvils.",
        )],
    ));
    let researcher = researcher(search, Arc::new(FailingFetcher::default()));

    let report = researcher.research("Acme").await.unwrap();

    assert!(report.leadership.is_empty());
    assert!(report
        .discovery_angles
        .iter()
        .all(|a| a.signal == SignalKind::Generic));
}

#[tokio::test]
async fn failed_fetch_keeps_the_snippet_verbatim() {
    let snippet = "Acme closed a $30 million Series B to expand into Europe.";
    let search = Arc::new(FakeSearch::default().with(
        FUNDING,
        vec![result("Acme raises Series B", "https://example.com/acme-b", snippet)],
    ));
    let fetcher = Arc::new(FailingFetcher::default());
    let researcher = researcher(search, fetcher.clone());

    let report = researcher.research("Acme").await.unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    let item = &report.financials.items[0];
    assert_eq!(item.text, snippet);
    assert_eq!(item.source_title, "Acme raises Series B");
    assert_eq!(item.source_url, "https://example.com/acme-b");
    assert_eq!(report.signals.funding_stage.as_deref(), Some("Series B"));
    assert_eq!(report.signals.funding_amount.as_deref(), Some("$30 million"));
}

#[tokio::test]
async fn sections_are_deduplicated_ranked_and_truncated() {
    let results = vec![
        result("One", "https://a.example/1", "Acme focuses on developer platforms"),
        result("One again", "https://a.example/1", "Same page, second listing of the focus"),
        result("Two", "https://b.example/2", "Acme strategy: cut costs in hardware"),
        result("Three", "https://c.example/3", "Acme plans to expand sales in Asia"),
        result("Four", "https://d.example/4", "Acme prioritizes AI agents"),
        result("Five", "https://e.example/5", "Acme goal: reorganize support"),
    ];
    let search = Arc::new(FakeSearch::default().with(PRIORITIES, results));
    let researcher = researcher(search, Arc::new(FailingFetcher::default()));

    let report = researcher.research("Acme").await.unwrap();
    let urls: Vec<&str> = report
        .priorities
        .items
        .iter()
        .map(|i| i.source_url.as_str())
        .collect();

    // Provider cap of 5 applies before dedup; the repeat then drops out
    assert_eq!(
        urls,
        vec![
            "https://a.example/1",
            "https://b.example/2",
            "https://c.example/3",
            "https://d.example/4"
        ]
    );
    assert!(report.priorities.items.len() <= report.priorities.max_items);
}

#[tokio::test]
async fn outer_deadline_abandons_hanging_searches() {
    let config = Config {
        deadline_secs: 1,
        ..Config::default()
    };
    let researcher = Researcher::new(config, Arc::new(HangingSearch), Arc::new(FailingFetcher::default()));

    let started = Instant::now();
    let report = researcher.research("Figma").await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(report.is_empty());
    assert_eq!(report.discovery_angles.len(), 3);
}
