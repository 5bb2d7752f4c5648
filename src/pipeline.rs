//! The research pipeline: plan, search, extract, synthesize, assemble.

use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument};

use crate::angles::generate_angles;
use crate::config::{Config, ConfigError};
use crate::planner::QueryPlanner;
use crate::report::CompanyReport;
use crate::scraper::{ContentExtractor, HttpFetcher, PageFetcher};
use crate::search::{DuckDuckGoProvider, SearchExecutor, SearchProvider};
use crate::signals::CompanySignals;
use crate::synthesis::SectionSynthesizer;

#[derive(Error, Debug)]
pub enum ResearchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Runs research requests. Holds no per-request state.
pub struct Researcher {
    config: Config,
    planner: QueryPlanner,
    executor: SearchExecutor,
    extractor: ContentExtractor,
    synthesizer: SectionSynthesizer,
}

impl Researcher {
    pub fn new(config: Config, search: Arc<dyn SearchProvider>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            planner: QueryPlanner::new(config.queries.clone()),
            executor: SearchExecutor::new(search, config.search.clone()),
            extractor: ContentExtractor::new(fetcher, config.extract.clone()),
            synthesizer: SectionSynthesizer::new(
                config.synthesis.max_items.clone(),
                config.synthesis.similarity_threshold,
            ),
            config,
        }
    }

    /// Build a researcher backed by DuckDuckGo search and plain HTTP fetches
    pub fn from_config(config: Config) -> Result<Self, ResearchError> {
        config.validate()?;
        let search = Arc::new(DuckDuckGoProvider::new(&config.search)?);
        let fetcher = Arc::new(HttpFetcher::new(&config.extract)?);
        Ok(Self::new(config, search, fetcher))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Research a company and build its briefing.
    ///
    /// Only an invalid company name is an error. Search and fetch failures,
    /// including work cut off by the request deadline, leave sections empty
    /// or fall back to snippets.
    #[instrument(skip(self))]
    pub async fn research(&self, company_name: &str) -> Result<CompanyReport, ResearchError> {
        let plan = self.planner.plan(company_name)?;
        let company = company_name.trim();
        let deadline = Instant::now() + self.config.deadline();

        let results = self.executor.run(&plan, deadline).await;
        let extracted = self.extractor.extract_all(&results, company, deadline).await;
        let sections = self.synthesizer.synthesize(&extracted);

        let signals = CompanySignals::from_sections(&sections);
        let angles = generate_angles(company, &sections);
        let report = CompanyReport::assemble(company, sections, angles, signals);

        info!(
            company,
            items = report.sections().iter().map(|s| s.items.len()).sum::<usize>(),
            "research complete"
        );
        Ok(report)
    }
}
