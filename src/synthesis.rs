//! Section synthesis: dedup, ordering and truncation per report section.

use std::collections::{BTreeMap, HashSet};
use url::Url;

use crate::config::SectionLimits;
use crate::report::{Category, ReportItem, ReportSection, SectionKind, Sections};
use crate::scraper::ExtractedContent;

/// Maps extracted content onto the fixed report sections.
#[derive(Debug, Clone)]
pub struct SectionSynthesizer {
    limits: SectionLimits,
    similarity_threshold: f64,
}

impl SectionSynthesizer {
    pub fn new(limits: SectionLimits, similarity_threshold: f64) -> Self {
        Self {
            limits,
            similarity_threshold,
        }
    }

    /// Build all four sections. Categories with no content give empty sections.
    pub fn synthesize(&self, by_category: &BTreeMap<Category, Vec<ExtractedContent>>) -> Sections {
        let build = |kind: SectionKind| {
            let items = by_category
                .get(&kind.category())
                .map(Vec::as_slice)
                .unwrap_or_default();
            self.section(kind, items)
        };

        Sections {
            company_snapshot: build(SectionKind::CompanySnapshot),
            financials: build(SectionKind::Financials),
            priorities: build(SectionKind::Priorities),
            leadership: build(SectionKind::Leadership),
        }
    }

    /// Build one section; output order is a stable sub-order of rank order
    pub fn section(&self, kind: SectionKind, contents: &[ExtractedContent]) -> ReportSection {
        let max_items = self.limits.for_section(kind);
        let mut section = ReportSection::empty(kind, max_items);

        let mut ranked: Vec<&ExtractedContent> = contents.iter().collect();
        ranked.sort_by_key(|c| c.rank);

        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut kept_texts: Vec<(String, HashSet<String>)> = Vec::new();

        for content in ranked {
            if section.items.len() >= max_items {
                break;
            }
            if !seen_urls.insert(normalize_url(&content.url)) {
                continue;
            }

            let normalized = normalize_text(&content.excerpt);
            let words = word_set(&normalized);
            let duplicate = kept_texts.iter().any(|(text, kept_words)| {
                *text == normalized || jaccard(&words, kept_words) >= self.similarity_threshold
            });
            if duplicate {
                continue;
            }
            kept_texts.push((normalized, words));

            section.items.push(ReportItem {
                text: content.excerpt.clone(),
                source_title: content.source_title.clone(),
                source_url: content.url.clone(),
            });
        }

        section
    }
}

/// URL identity: fragment dropped, host lowercased, trailing slash trimmed
pub fn normalize_url(raw: &str) -> String {
    let normalized = match Url::parse(raw.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.trim().to_string(),
    };
    normalized.trim_end_matches('/').to_string()
}

/// Lowercased alphanumeric words separated by single spaces
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn word_set(normalized: &str) -> HashSet<String> {
    normalized.split(' ').filter(|w| !w.is_empty()).map(str::to_string).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / (a.len() + b.len() - shared) as f64
}
