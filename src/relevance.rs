//! Per-category relevance checks on search hits.
//!
//! A hit joins its section only when its title or snippet carries the kind
//! of signal the section is about. Company overview hits are always kept.

use lazy_static::lazy_static;
use regex::Regex;

use crate::report::Category;
use crate::signals;

lazy_static! {
    static ref LEADERSHIP_TERMS: Regex = Regex::new(
        r"(?i)\b(ceo|cto|cfo|coo|cmo|cro|cpo|cio|vp|president|chief|executive|appoint\w*|hir(?:e|ed|es|ing)|promot\w*|join(?:s|ed|ing)?|resign\w*|steps?\s+down|stepped\s+down)\b"
    )
    .unwrap();
    static ref PRIORITY_TERMS: Regex = Regex::new(
        r"(?i)\b(priorit\w*|focus\w*|strateg\w*|initiative\w*|goals?|plans?|planned|planning|roadmap)\b"
    )
    .unwrap();
}

/// Whether a hit's title and snippet belong in the category's section
pub fn is_relevant(category: Category, title: &str, snippet: &str) -> bool {
    let text = format!("{title} {snippet}");
    match category {
        Category::CompanyInfo => true,
        Category::Funding => {
            signals::funding_amount(&text).is_some()
                || signals::funding_stage(&text).is_some()
                || signals::market_cap(&text).is_some()
        }
        Category::Priorities => PRIORITY_TERMS.is_match(&text),
        Category::Leadership => LEADERSHIP_TERMS.is_match(&text),
    }
}
