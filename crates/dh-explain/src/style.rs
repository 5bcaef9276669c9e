//! Style variants for the explanation generator (spec §4.15, §9's
//! "inheritance of style templates becomes a style variant + pure
//! rendering function" redesign note). Each variant carries only the
//! section headings and sentence register it wants; no variant-specific
//! behavior leaks outside [`crate::prompt::build_prompt`] and
//! [`crate::template::render_template`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Executive,
    Technical,
    Detailed,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Executive => "executive",
            Style::Technical => "technical",
            Style::Detailed => "detailed",
        }
    }

    /// Section headings this style expects in the rendered prose, ordered.
    pub fn section_headings(&self) -> &'static [&'static str] {
        match self {
            Style::Executive => &["Recommendation", "Why"],
            Style::Technical => &["Recommendation", "Feasibility", "Cost & CO2", "Robustness"],
            Style::Detailed => &[
                "Recommendation",
                "Feasibility",
                "Hydraulics & Grid",
                "Cost & CO2",
                "Monte Carlo Robustness",
                "Standards Referenced",
            ],
        }
    }

    /// Register guidance folded into the prompt: how verbose/technical the
    /// requested prose should be.
    pub fn register_hint(&self) -> &'static str {
        match self {
            Style::Executive => "two short paragraphs, no jargon, decision-first",
            Style::Technical => "concise engineering memo, cite standard names and KPI thresholds",
            Style::Detailed => "full technical report, enumerate every KPI block with units",
        }
    }
}
