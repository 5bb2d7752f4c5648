//! # Callprep
//!
//! Company research briefings for sales call preparation.
//!
//! ## Features
//!
//! - **Fan-out search**: one query per research category, run concurrently with per-query timeouts
//! - **Fail-soft extraction**: page excerpts for top results, search snippets for everything else
//! - **Structured output**: a typed `CompanyReport` with four fixed sections and three discovery angles
//! - **Provider agnostic**: search and page fetching sit behind traits

pub mod angles;
pub mod config;
pub mod pipeline;
pub mod planner;
pub mod relevance;
pub mod report;
pub mod scraper;
pub mod search;
pub mod signals;
pub mod synthesis;

pub use config::Config;
pub use pipeline::{ResearchError, Researcher};
pub use report::{CompanyReport, DiscoveryAngle, ReportItem, ReportSection, SignalKind};
pub use scraper::{FetchError, PageFetcher};
pub use search::{SearchError, SearchProvider, SearchResult};
