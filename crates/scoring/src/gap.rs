//! Head-to-head gap analysis between two countries.

use std::fmt;

use common::Country;
use serde::Serialize;

use crate::categories::{score_categories, Capability, Category};

/// How large a category gap is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Significance {
    Critical,
    Significant,
    Moderate,
    Minimal,
}

impl Significance {
    pub fn from_abs_gap(abs_gap: f64) -> Self {
        if abs_gap >= 30.0 {
            Significance::Critical
        } else if abs_gap >= 15.0 {
            Significance::Significant
        } else if abs_gap >= 5.0 {
            Significance::Moderate
        } else {
            Significance::Minimal
        }
    }
}

/// Overall verdict on the difference in capability index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GapSummary {
    #[serde(rename = "Near Parity")]
    NearParity,
    #[serde(rename = "Minor Gap")]
    MinorGap,
    #[serde(rename = "Moderate Gap")]
    ModerateGap,
    #[serde(rename = "Significant Gap")]
    SignificantGap,
    #[serde(rename = "Major Gap")]
    MajorGap,
}

impl GapSummary {
    pub fn from_abs_gap(abs_gap: f64) -> Self {
        if abs_gap < 5.0 {
            GapSummary::NearParity
        } else if abs_gap < 15.0 {
            GapSummary::MinorGap
        } else if abs_gap < 30.0 {
            GapSummary::ModerateGap
        } else if abs_gap < 50.0 {
            GapSummary::SignificantGap
        } else {
            GapSummary::MajorGap
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GapSummary::NearParity => "Near Parity",
            GapSummary::MinorGap => "Minor Gap",
            GapSummary::ModerateGap => "Moderate Gap",
            GapSummary::SignificantGap => "Significant Gap",
            GapSummary::MajorGap => "Major Gap",
        }
    }
}

impl fmt::Display for GapSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the comparison is ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Leader {
    First,
    Second,
    Tied,
}

impl Leader {
    fn from_gap(gap: f64) -> Self {
        if gap > 0.0 {
            Leader::First
        } else if gap < 0.0 {
            Leader::Second
        } else {
            Leader::Tied
        }
    }

    pub fn swapped(self) -> Self {
        match self {
            Leader::First => Leader::Second,
            Leader::Second => Leader::First,
            Leader::Tied => Leader::Tied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGap {
    pub category: Category,
    pub score_a: f64,
    pub score_b: f64,
    /// `score_a - score_b`.
    pub gap: f64,
    pub abs_gap: f64,
    pub significance: Significance,
    pub leader: Leader,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRow {
    pub capability: Capability,
    pub country_a: bool,
    pub country_b: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapAnalysis {
    pub country_a: String,
    pub country_b: String,
    pub categories: Vec<CategoryGap>,
    /// Up to three categories with the largest absolute gap, largest first.
    pub key_differentiators: Vec<Category>,
    pub capabilities: Vec<CapabilityRow>,
    /// Capabilities only the first country has.
    pub country1_capabilities: usize,
    /// Capabilities only the second country has.
    pub country2_capabilities: usize,
    pub shared_capabilities: usize,
    pub overall_a: f64,
    pub overall_b: f64,
    /// Raw capability index difference, not an average of category gaps.
    pub overall_gap: f64,
    pub leader: Leader,
    pub gap_summary: GapSummary,
}

impl GapAnalysis {
    /// Label of the leading country, `None` on a tie.
    pub fn leader_label(&self) -> Option<&str> {
        match self.leader {
            Leader::First => Some(&self.country_a),
            Leader::Second => Some(&self.country_b),
            Leader::Tied => None,
        }
    }

    pub fn category(&self, category: Category) -> Option<&CategoryGap> {
        self.categories.iter().find(|g| g.category == category)
    }
}

/// Compare two countries. `None` unless both are present.
pub fn gap_analysis(a: Option<&Country>, b: Option<&Country>) -> Option<GapAnalysis> {
    let (a, b) = (a?, b?);
    let scores_a = score_categories(a);
    let scores_b = score_categories(b);

    let categories: Vec<CategoryGap> = Category::ALL
        .into_iter()
        .map(|category| {
            let score_a = scores_a.get(category);
            let score_b = scores_b.get(category);
            let gap = score_a - score_b;
            CategoryGap {
                category,
                score_a,
                score_b,
                gap,
                abs_gap: gap.abs(),
                significance: Significance::from_abs_gap(gap.abs()),
                leader: Leader::from_gap(gap),
            }
        })
        .collect();

    let mut by_size: Vec<&CategoryGap> = categories.iter().collect();
    by_size.sort_by(|x, y| y.abs_gap.total_cmp(&x.abs_gap));
    let key_differentiators = by_size.iter().take(3).map(|g| g.category).collect();

    let capabilities: Vec<CapabilityRow> = Capability::ALL
        .into_iter()
        .map(|capability| CapabilityRow {
            capability,
            country_a: capability.held_by(a),
            country_b: capability.held_by(b),
        })
        .collect();
    let country1_capabilities = capabilities
        .iter()
        .filter(|r| r.country_a && !r.country_b)
        .count();
    let country2_capabilities = capabilities
        .iter()
        .filter(|r| !r.country_a && r.country_b)
        .count();
    let shared_capabilities = capabilities
        .iter()
        .filter(|r| r.country_a && r.country_b)
        .count();

    let overall_gap = a.overall_capability_score - b.overall_capability_score;

    Some(GapAnalysis {
        country_a: a.label().to_string(),
        country_b: b.label().to_string(),
        categories,
        key_differentiators,
        capabilities,
        country1_capabilities,
        country2_capabilities,
        shared_capabilities,
        overall_a: a.overall_capability_score,
        overall_b: b.overall_capability_score,
        overall_gap,
        leader: Leader::from_gap(overall_gap),
        gap_summary: GapSummary::from_abs_gap(overall_gap.abs()),
    })
}
