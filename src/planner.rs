//! Query planning: one search query per research category.

use crate::config::{QueryTemplates, COMPANY_PLACEHOLDER};
use crate::pipeline::ResearchError;
use crate::report::Category;

/// Longest company name accepted, in characters
pub const MAX_COMPANY_NAME_CHARS: usize = 200;

/// Ordered (category, query) pairs for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    queries: Vec<(Category, String)>,
}

impl QueryPlan {
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> {
        self.queries.iter().map(|(c, q)| (*c, q.as_str()))
    }

    pub fn query(&self, category: Category) -> Option<&str> {
        self.iter().find(|(c, _)| *c == category).map(|(_, q)| q)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Expands a company name into the fixed query set.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    templates: QueryTemplates,
}

impl QueryPlanner {
    pub fn new(templates: QueryTemplates) -> Self {
        Self { templates }
    }

    pub fn plan(&self, company_name: &str) -> Result<QueryPlan, ResearchError> {
        let company = validate_company_name(company_name)?;
        let queries = Category::ALL
            .iter()
            .map(|&category| {
                let query = self
                    .template(category)
                    .replace(COMPANY_PLACEHOLDER, company);
                (category, query)
            })
            .collect();
        Ok(QueryPlan { queries })
    }

    fn template(&self, category: Category) -> &str {
        match category {
            Category::CompanyInfo => &self.templates.company_info,
            Category::Funding => &self.templates.funding,
            Category::Priorities => &self.templates.priorities,
            Category::Leadership => &self.templates.leadership,
        }
    }
}

/// Trim the name and check it is non-empty and within the length bound
pub fn validate_company_name(company_name: &str) -> Result<&str, ResearchError> {
    let trimmed = company_name.trim();
    if trimmed.is_empty() {
        return Err(ResearchError::InvalidInput(
            "company name is required".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_COMPANY_NAME_CHARS {
        return Err(ResearchError::InvalidInput(format!(
            "company name exceeds {MAX_COMPANY_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed)
}
