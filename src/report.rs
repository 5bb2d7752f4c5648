//! Report types - the structured briefing handed to the presentation layer.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signals::CompanySignals;

/// Research topic driving query planning and section mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CompanyInfo,
    Funding,
    Priorities,
    Leadership,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::CompanyInfo,
        Category::Funding,
        Category::Priorities,
        Category::Leadership,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::CompanyInfo => "company_info",
            Category::Funding => "funding",
            Category::Priorities => "priorities",
            Category::Leadership => "leadership",
        }
    }

    /// The report section fed by this category
    pub fn section(self) -> SectionKind {
        match self {
            Category::CompanyInfo => SectionKind::CompanySnapshot,
            Category::Funding => SectionKind::Financials,
            Category::Priorities => SectionKind::Priorities,
            Category::Leadership => SectionKind::Leadership,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the fixed report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    CompanySnapshot,
    Financials,
    Priorities,
    Leadership,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::CompanySnapshot,
        SectionKind::Financials,
        SectionKind::Priorities,
        SectionKind::Leadership,
    ];

    /// Heading shown to the reader
    pub fn title(self) -> &'static str {
        match self {
            SectionKind::CompanySnapshot => "Company Snapshot",
            SectionKind::Financials => "Financials & Funding",
            SectionKind::Priorities => "What They Care About",
            SectionKind::Leadership => "Leadership Signals",
        }
    }

    pub fn category(self) -> Category {
        match self {
            SectionKind::CompanySnapshot => Category::CompanyInfo,
            SectionKind::Financials => Category::Funding,
            SectionKind::Priorities => Category::Priorities,
            SectionKind::Leadership => Category::Leadership,
        }
    }
}

/// A single attributed line in a report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportItem {
    pub text: String,
    pub source_title: String,
    pub source_url: String,
}

/// One fixed section of the report. Never absent, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub title: String,
    pub max_items: usize,
    pub items: Vec<ReportItem>,
}

impl ReportSection {
    pub fn empty(kind: SectionKind, max_items: usize) -> Self {
        Self {
            kind,
            title: kind.title().to_string(),
            max_items,
            items: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The highest-ranked item, if any
    pub fn lead(&self) -> Option<&ReportItem> {
        self.items.first()
    }
}

/// The four content sections, before angles are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Sections {
    pub company_snapshot: ReportSection,
    pub financials: ReportSection,
    pub priorities: ReportSection,
    pub leadership: ReportSection,
}

impl Sections {
    pub fn get(&self, kind: SectionKind) -> &ReportSection {
        match kind {
            SectionKind::CompanySnapshot => &self.company_snapshot,
            SectionKind::Financials => &self.financials,
            SectionKind::Priorities => &self.priorities,
            SectionKind::Leadership => &self.leadership,
        }
    }
}

/// Which signal produced a discovery angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    LeadershipChange,
    Funding,
    StatedPriority,
    GrowthStage,
    Generic,
}

/// A ready-to-use conversation opener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DiscoveryAngle {
    pub signal: SignalKind,
    /// Short label for the angle
    pub title: String,
    /// The opener itself
    pub text: String,
    /// Coaching note on why the opener works and how to follow up
    pub suggestion: String,
}

/// The briefing produced for one company.
///
/// Assembled once per request and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompanyReport {
    pub company_name: String,
    pub generated_at: DateTime<Utc>,
    pub company_snapshot: ReportSection,
    pub financials: ReportSection,
    pub priorities: ReportSection,
    pub leadership: ReportSection,
    pub discovery_angles: Vec<DiscoveryAngle>,
    pub signals: CompanySignals,
}

impl CompanyReport {
    /// Combine synthesized sections and angles into the final report
    pub fn assemble(
        company_name: &str,
        sections: Sections,
        angles: [DiscoveryAngle; 3],
        signals: CompanySignals,
    ) -> Self {
        let Sections {
            company_snapshot,
            financials,
            priorities,
            leadership,
        } = sections;

        Self {
            company_name: company_name.to_string(),
            generated_at: Utc::now(),
            company_snapshot,
            financials,
            priorities,
            leadership,
            discovery_angles: angles.into(),
            signals,
        }
    }

    /// The four content sections in display order
    pub fn sections(&self) -> [&ReportSection; 4] {
        [
            &self.company_snapshot,
            &self.financials,
            &self.priorities,
            &self.leadership,
        ]
    }

    /// Check if every content section came back empty
    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|s| s.is_empty())
    }
}
