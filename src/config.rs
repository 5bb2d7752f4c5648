//! Configuration loading and management for callprep.
//!
//! Loads settings from `callprep.toml` with environment variable overrides.
//! Every field has a default, so a missing file is not an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::report::SectionKind;

/// Placeholder substituted with the company name in query templates
pub const COMPANY_PLACEHOLDER: &str = "{company}";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Query templates, one per research category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryTemplates {
    pub company_info: String,
    pub funding: String,
    pub priorities: String,
    pub leadership: String,
}

impl Default for QueryTemplates {
    fn default() -> Self {
        Self {
            company_info: "{company} company overview employees industry".to_string(),
            funding: "{company} funding round investment series valuation".to_string(),
            priorities: "{company} company priorities strategy earnings".to_string(),
            leadership: "{company} CEO CTO CFO leadership executive hire promotion".to_string(),
        }
    }
}

/// Search provider and executor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// HTML search endpoint queried by the default provider
    pub endpoint: String,
    /// Results kept per category, in provider rank order
    pub max_results: usize,
    /// Timeout for a single search attempt
    pub timeout_secs: u64,
    /// Retry once, immediately, on a transient failure
    pub retry_once: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            max_results: 5,
            timeout_secs: 8,
            retry_once: true,
        }
    }
}

impl SearchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Page fetch and excerpt extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Top-ranked items per category whose pages are fetched
    pub fetch_top_n: usize,
    pub timeout_secs: u64,
    /// Upper bound on excerpt length, in characters
    pub max_excerpt_chars: usize,
    /// Page excerpts shorter than this fall back to the snippet
    pub min_excerpt_chars: usize,
    pub max_download_bytes: usize,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            fetch_top_n: 2,
            timeout_secs: 6,
            max_excerpt_chars: 300,
            min_excerpt_chars: 80,
            max_download_bytes: 512 * 1024,
        }
    }
}

impl ExtractSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Maximum items kept per report section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SectionLimits {
    pub company_snapshot: usize,
    pub financials: usize,
    pub priorities: usize,
    pub leadership: usize,
}

impl Default for SectionLimits {
    fn default() -> Self {
        Self {
            company_snapshot: 3,
            financials: 3,
            priorities: 4,
            leadership: 4,
        }
    }
}

impl SectionLimits {
    pub fn for_section(&self, kind: SectionKind) -> usize {
        match kind {
            SectionKind::CompanySnapshot => self.company_snapshot,
            SectionKind::Financials => self.financials,
            SectionKind::Priorities => self.priorities,
            SectionKind::Leadership => self.leadership,
        }
    }
}

/// Section synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// Word-set similarity at or above which two items count as duplicates
    pub similarity_threshold: f64,
    pub max_items: SectionLimits,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.8,
            max_items: SectionLimits::default(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Outer deadline for a whole research request
    pub deadline_secs: u64,
    pub queries: QueryTemplates,
    pub search: SearchSettings,
    pub extract: ExtractSettings,
    pub synthesis: SynthesisSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deadline_secs: 25,
            queries: QueryTemplates::default(),
            search: SearchSettings::default(),
            extract: ExtractSettings::default(),
            synthesis: SynthesisSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (callprep.toml in cwd or home)
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::read_file(&path)?,
            None => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::read_file(path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override settings from environment variables
    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("CALLPREP_SEARCH_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.search.endpoint = endpoint;
            }
        }
        if let Some(secs) = std::env::var("CALLPREP_DEADLINE_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.deadline_secs = secs;
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from("callprep.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        let home_config = dirs::home_dir()?
            .join(".config")
            .join("callprep")
            .join("callprep.toml");
        home_config.exists().then_some(home_config)
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        let templates = [
            ("company_info", &self.queries.company_info),
            ("funding", &self.queries.funding),
            ("priorities", &self.queries.priorities),
            ("leadership", &self.queries.leadership),
        ];
        for (name, template) in templates {
            if !template.contains(COMPANY_PLACEHOLDER) {
                return Err(ConfigError::Invalid(format!(
                    "query template `{name}` must contain {COMPANY_PLACEHOLDER}"
                )));
            }
        }

        if self.search.max_results == 0 {
            return Err(ConfigError::Invalid(
                "search.max_results must be at least 1".to_string(),
            ));
        }
        if self.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "deadline_secs must be at least 1".to_string(),
            ));
        }

        let threshold = self.synthesis.similarity_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "synthesis.similarity_threshold must be in (0, 1], got {threshold}"
            )));
        }

        let limits = &self.synthesis.max_items;
        if SectionKind::ALL
            .iter()
            .any(|kind| limits.for_section(*kind) == 0)
        {
            return Err(ConfigError::Invalid(
                "synthesis.max_items entries must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.synthesis.max_items.priorities, 4);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
deadline_secs = 12

[search]
max_results = 3

[synthesis.max_items]
leadership = 2
"#
        )
        .unwrap();

        let config = Config::read_file(file.path()).unwrap();
        assert_eq!(config.deadline_secs, 12);
        assert_eq!(config.search.max_results, 3);
        assert!(config.search.retry_once);
        assert_eq!(config.synthesis.max_items.leadership, 2);
        assert_eq!(config.synthesis.max_items.financials, 3);
        assert_eq!(config.queries, QueryTemplates::default());
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let mut config = Config::default();
        config.queries.funding = "funding news".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut config = Config::default();
        config.synthesis.similarity_threshold = 1.5;
        assert!(config.validate().is_err());
        config.synthesis.similarity_threshold = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "deadline_secs = \"soon\"").unwrap();
        assert!(matches!(
            Config::read_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
