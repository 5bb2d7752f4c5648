//! Discovery angles: rule-based conversation openers.
//!
//! Sections are scanned in the priority order of [`RULES`]; each non-empty
//! section yields one angle from its lead item. Unused slots are filled
//! from a growth-stage angle (when headcount is known) and then from
//! [`GENERIC_ANGLES`]. Templates only restate figures found in the text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::report::{DiscoveryAngle, SectionKind, Sections, SignalKind};
use crate::signals;

/// Number of angles in every report
pub const ANGLE_COUNT: usize = 3;

type AngleTemplate = fn(company: &str, lead_text: &str) -> DiscoveryAngle;

/// Section -> signal -> template, highest priority first
const RULES: [(SectionKind, SignalKind, AngleTemplate); 3] = [
    (SectionKind::Leadership, SignalKind::LeadershipChange, leadership_angle),
    (SectionKind::Financials, SignalKind::Funding, funding_angle),
    (SectionKind::Priorities, SignalKind::StatedPriority, priority_angle),
];

/// Context-free openers, used in order: (title, question, suggestion)
const GENERIC_ANGLES: [(&str, &str, &str); ANGLE_COUNT] = [
    (
        "Competitive Landscape",
        "What's the one thing your competitors are doing that keeps you up at night?",
        "Learn which competitive pressures they feel and how they set themselves apart.",
    ),
    (
        "Current Pain Points",
        "If you could fix one thing about how your team works today, what would it be?",
        "Get them talking about the operational problems they deal with every day.",
    ),
    (
        "Decision-Making Process",
        "When you've brought in a new solution before, what made the difference between success and failure?",
        "Find out how they evaluate new tools and who signs off on adopting them.",
    ),
];

const LEADERSHIP_SUGGESTION: &str = "New executives usually arrive with their own initiatives and are more open to new vendors. \
     They look for early wins that build credibility.";
const FUNDING_SUGGESTION: &str = "Freshly funded companies have capital to deploy and growth targets to hit. \
     Tie your solution to the goals the round is meant to pay for.";
const PRIORITY_SUGGESTION: &str = "Quoting their public priorities shows you did your homework. \
     Frame the pitch around the initiative they named.";
const EARLY_STAGE_SUGGESTION: &str = "Small teams need tools that scale with them. \
     Ask what is slowing them down as headcount grows.";
const MID_MARKET_SUGGESTION: &str = "Mid-sized companies tend to struggle with tool sprawl and uneven processes. \
     Look for consolidation opportunities.";
const ENTERPRISE_SUGGESTION: &str = "Large organizations weigh efficiency and cost first. \
     Lead with ROI and enterprise-grade capabilities.";

lazy_static! {
    static ref ROLE_ACRONYM: Regex =
        Regex::new(r"\b(CEO|CFO|CTO|COO|CMO|CRO|CPO|CIO|CISO|President)\b").unwrap();
    static ref ROLE_CHIEF: Regex = Regex::new(r"(?i)\bchief\s+([a-z]+)\s+officer\b").unwrap();
    static ref LEADERSHIP_CHANGE: Regex = Regex::new(
        r"(?i)\b(appoint\w*|hire[sd]?|hiring|join(?:s|ed)?|named|names|promot\w*|new\s+(?:ceo|cfo|cto|coo|cmo|cro|cpo|cio|president|chief|head)|succeed\w*|steps?\s+down|stepped\s+down|depart\w*|resign\w*)\b"
    )
    .unwrap();
    static ref FOCUS: Regex = Regex::new(
        r"(?i)\b(?:focus(?:ed|es|ing)?\s+on|prioriti[sz](?:e|es|ed|ing)|doubl(?:e|es|ed|ing)\s+down\s+on|commit(?:s|ted)?\s+to)\s+([^.;:!?]{4,80})"
    )
    .unwrap();
}

/// Produce exactly three angles from the synthesized sections.
///
/// Slots are filled from the rule table first, then from the growth-stage
/// angle, then from the generic openers. A headcount stated in the Company
/// Snapshot therefore takes the first slot the rules leave free, so a report
/// with fewer than three rule-derived angles is not necessarily padded with
/// generic openers alone.
pub fn generate_angles(company: &str, sections: &Sections) -> [DiscoveryAngle; ANGLE_COUNT] {
    let specific = RULES.iter().filter_map(|(kind, signal, template)| {
        let lead = sections.get(*kind).lead()?;
        let angle = template(company, &lead.text);
        debug_assert_eq!(angle.signal, *signal);
        Some(angle)
    });
    let growth = growth_angle(company, sections);
    let generic = GENERIC_ANGLES.iter().map(generic_angle);

    // GENERIC_ANGLES alone fills every slot
    let mut candidates = specific.chain(growth).chain(generic);
    std::array::from_fn(|slot| {
        candidates
            .next()
            .unwrap_or_else(|| generic_angle(&GENERIC_ANGLES[slot]))
    })
}

fn generic_angle((title, text, suggestion): &(&str, &str, &str)) -> DiscoveryAngle {
    angle(SignalKind::Generic, title, text.to_string(), suggestion)
}

fn angle(signal: SignalKind, title: &str, text: String, suggestion: &str) -> DiscoveryAngle {
    DiscoveryAngle {
        signal,
        title: title.to_string(),
        text,
        suggestion: suggestion.to_string(),
    }
}

fn leadership_angle(company: &str, lead_text: &str) -> DiscoveryAngle {
    let role = leadership_role(lead_text);
    if LEADERSHIP_CHANGE.is_match(lead_text) {
        let text = match role {
            Some(role) => format!(
                "Recent coverage points to a leadership change involving the {role} role at {company}. \
                 What has the new leadership put at the top of its agenda?"
            ),
            None => format!(
                "Recent coverage points to leadership changes at {company}. \
                 What has the new leadership put at the top of its agenda?"
            ),
        };
        angle(SignalKind::LeadershipChange, "New Leadership Agenda", text, LEADERSHIP_SUGGESTION)
    } else {
        let subject = match role {
            Some(role) => format!("{company}'s leadership, including the {role}"),
            None => format!("{company}'s leadership team"),
        };
        angle(
            SignalKind::LeadershipChange,
            "Leadership Priorities",
            format!("Recent coverage highlights {subject}. Which priorities is leadership pushing hardest this year?"),
            LEADERSHIP_SUGGESTION,
        )
    }
}

/// Executive title named in the text, e.g. "CFO" or "Chief Revenue Officer"
fn leadership_role(text: &str) -> Option<String> {
    if let Some(caps) = ROLE_ACRONYM.captures(text) {
        return Some(caps[1].to_string());
    }
    let caps = ROLE_CHIEF.captures(text)?;
    let word = caps[1].to_lowercase();
    let mut chars = word.chars();
    let first = chars.next()?.to_uppercase().collect::<String>();
    Some(format!("Chief {first}{} Officer", chars.as_str()))
}

fn funding_angle(company: &str, lead_text: &str) -> DiscoveryAngle {
    let amount = signals::funding_amount(lead_text);
    let stage = signals::funding_stage(lead_text);
    let question = "What's the #1 area you're investing in to hit your growth targets?";

    let text = match (stage, amount) {
        (Some(stage), Some(amount)) => {
            format!("Coverage mentions a {stage} round of {amount} for {company}. {question}")
        }
        (Some(stage), None) => format!("Coverage mentions {company}'s {stage} funding. {question}"),
        (None, Some(amount)) => {
            format!("Coverage of {company}'s finances mentions {amount}. {question}")
        }
        (None, None) => format!(
            "Recent coverage discusses {company}'s funding and financial position. \
             Where is the next round of investment going first?"
        ),
    };
    angle(SignalKind::Funding, "Post-Funding Priorities", text, FUNDING_SUGGESTION)
}

fn priority_angle(company: &str, lead_text: &str) -> DiscoveryAngle {
    let text = match stated_focus(lead_text) {
        Some(focus) => format!(
            "I read about {company}'s focus on {focus}. How is that progressing, and what's been the biggest challenge?"
        ),
        None => format!(
            "{company} has been public about its strategic priorities. \
             Which initiative matters most this year, and what's standing in the way?"
        ),
    };
    angle(SignalKind::StatedPriority, "Aligned with Stated Strategy", text, PRIORITY_SUGGESTION)
}

/// The phrase following "focus on", "prioritize" and similar
fn stated_focus(text: &str) -> Option<String> {
    let raw = FOCUS.captures(text)?.get(1)?.as_str().trim();
    let phrase = if raw.chars().count() >= 80 {
        raw.rsplit_once(' ').map(|(head, _)| head).unwrap_or(raw)
    } else {
        raw
    };
    let phrase = phrase.trim_end_matches(|c: char| !c.is_alphanumeric());
    (phrase.chars().count() >= 4).then(|| phrase.to_string())
}

fn growth_angle(company: &str, sections: &Sections) -> Option<DiscoveryAngle> {
    let headcount = sections
        .company_snapshot
        .items
        .iter()
        .find_map(|item| signals::employee_count(&item.text))?;

    let angle = match headcount {
        0..=49 => angle(
            SignalKind::GrowthStage,
            "Early-Stage Growth Focus",
            format!("With a team of around {headcount}, which processes at {company} are getting hardest to scale?"),
            EARLY_STAGE_SUGGESTION,
        ),
        50..=499 => angle(
            SignalKind::GrowthStage,
            "Mid-Market Efficiency",
            format!(
                "Companies around {company}'s size ({headcount} people) often run several tools that do the same job. \
                 Is that something you're seeing?"
            ),
            MID_MARKET_SUGGESTION,
        ),
        _ => angle(
            SignalKind::GrowthStage,
            "Enterprise Optimization",
            format!(
                "Across a workforce of roughly {headcount}, what would a 10% efficiency gain in your key workflows mean for annual targets?"
            ),
            ENTERPRISE_SUGGESTION,
        ),
    };
    Some(angle)
}
