//! Headline figures pulled out of section text.
//!
//! Extraction is deliberately conservative: a figure is reported only when a
//! pattern matches it verbatim, otherwise the field stays empty.

use lazy_static::lazy_static;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::report::{ReportSection, Sections};

lazy_static! {
    static ref EMPLOYEES_SUFFIX: Regex = Regex::new(
        r"(?i)\b(\d{1,3}(?:,\d{3})+|\d+)\s*\+?\s*(?:full-time\s+)?(?:employees|staff|people)\b"
    )
    .unwrap();
    static ref EMPLOYEES_PREFIX: Regex =
        Regex::new(r"(?i)\b(?:team|workforce|headcount)\s+of\s+(\d{1,3}(?:,\d{3})+|\d+)\b")
            .unwrap();
    static ref FUNDING_AMOUNT: Regex =
        Regex::new(r"(?i)\$\s?(\d+(?:\.\d+)?)\s*(million|billion|m|b)\b").unwrap();
    static ref FUNDING_STAGE: Regex =
        Regex::new(r"(?i)\b(series\s*[a-h]|pre-seed|seed|bridge)\b").unwrap();
    static ref MARKET_CAP: Regex = Regex::new(
        r"(?i)market\s*cap(?:italization)?\s*(?:of\s*)?\$?\s?(\d+(?:\.\d+)?)\s*(million|billion|trillion|m|b|t)\b"
    )
    .unwrap();
}

/// Figures found in the report text, each only when stated in a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompanySignals {
    pub employee_count: Option<u64>,
    /// e.g. "$50 million"
    pub funding_amount: Option<String>,
    /// e.g. "Series B"
    pub funding_stage: Option<String>,
    pub market_cap: Option<String>,
}

impl CompanySignals {
    /// Scan the synthesized sections; the first matching item wins.
    pub fn from_sections(sections: &Sections) -> Self {
        let snapshot = &sections.company_snapshot;
        let financials = &sections.financials;

        Self {
            employee_count: first_match(snapshot, employee_count),
            funding_amount: first_match(financials, funding_amount),
            funding_stage: first_match(financials, funding_stage),
            market_cap: first_match(financials, market_cap)
                .or_else(|| first_match(snapshot, market_cap)),
        }
    }
}

fn first_match<T>(section: &ReportSection, extract: fn(&str) -> Option<T>) -> Option<T> {
    section.items.iter().find_map(|item| extract(&item.text))
}

/// Employee headcount such as "1,200 employees" or "team of 45"
pub fn employee_count(text: &str) -> Option<u64> {
    let caps = EMPLOYEES_SUFFIX
        .captures(text)
        .or_else(|| EMPLOYEES_PREFIX.captures(text))?;
    caps[1].replace(',', "").parse().ok()
}

/// Funding amount normalized to "$<n> million|billion"
pub fn funding_amount(text: &str) -> Option<String> {
    let caps = FUNDING_AMOUNT.captures(text)?;
    Some(format!("${} {}", &caps[1], unit_word(&caps[2])))
}

/// Funding stage normalized to "Series X", "Seed", "Pre-Seed" or "Bridge"
pub fn funding_stage(text: &str) -> Option<String> {
    let raw = FUNDING_STAGE.captures(text)?[1].to_lowercase();
    let stage = if let Some(letter) = raw.strip_prefix("series") {
        format!("Series {}", letter.trim().to_uppercase())
    } else {
        match raw.as_str() {
            "pre-seed" => "Pre-Seed".to_string(),
            "seed" => "Seed".to_string(),
            _ => "Bridge".to_string(),
        }
    };
    Some(stage)
}

/// Market capitalization normalized to "$<n> million|billion|trillion"
pub fn market_cap(text: &str) -> Option<String> {
    let caps = MARKET_CAP.captures(text)?;
    Some(format!("${} {}", &caps[1], unit_word(&caps[2])))
}

fn unit_word(unit: &str) -> &'static str {
    match unit.to_lowercase().as_str() {
        "m" | "million" => "million",
        "b" | "billion" => "billion",
        _ => "trillion",
    }
}
