//! Strengths / weaknesses / opportunities / threats of one country
//! relative to a population of countries.

use std::fmt;

use common::Country;
use serde::Serialize;

use crate::categories::{score_categories, Category};
use crate::percentile::{category_averages, category_column, percentile};

/// Qualitative rating of a country's overall program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallRating {
    Excellent,
    Strong,
    Developing,
    Emerging,
    #[serde(rename = "Early Stage")]
    EarlyStage,
}

impl fmt::Display for OverallRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverallRating::Excellent => "Excellent",
            OverallRating::Strong => "Strong",
            OverallRating::Developing => "Developing",
            OverallRating::Emerging => "Emerging",
            OverallRating::EarlyStage => "Early Stage",
        })
    }
}

/// Rating from the overall score; the top two tiers also need major strengths.
pub fn overall_rating(score: f64, major_strengths: usize) -> OverallRating {
    if score >= 80.0 && major_strengths >= 2 {
        OverallRating::Excellent
    } else if score >= 60.0 && major_strengths >= 1 {
        OverallRating::Strong
    } else if score >= 40.0 {
        OverallRating::Developing
    } else if score >= 20.0 {
        OverallRating::Emerging
    } else {
        OverallRating::EarlyStage
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwotItem {
    /// `None` for items about overall standing rather than one category.
    pub category: Option<Category>,
    pub title: String,
    pub score: f64,
    /// Population average of the same measure.
    pub average: f64,
    pub percentile: f64,
    pub description: String,
    pub major: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwotResult {
    pub country: String,
    pub strengths: Vec<SwotItem>,
    pub weaknesses: Vec<SwotItem>,
    pub opportunities: Vec<SwotItem>,
    pub threats: Vec<SwotItem>,
    pub rating: OverallRating,
    /// 1-based rank by overall score (ties share a rank).
    pub global_rank: usize,
    pub population_size: usize,
}

/// Classify `country` against `population`. `None` on an empty population.
pub fn swot(country: &Country, population: &[Country]) -> Option<SwotResult> {
    let averages = category_averages(population)?;
    let scores = score_categories(country);

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut opportunities = Vec::new();
    let mut threats = Vec::new();

    for category in Category::ALL {
        let score = scores.get(category);
        let average = averages.get(category);
        let pct = percentile(score, &category_column(population, category));
        let diff = score - average;

        if diff > 10.0 && pct > 60.0 {
            strengths.push(SwotItem {
                category: Some(category),
                title: category.label().to_string(),
                score,
                average,
                percentile: pct,
                description: format!(
                    "{} of {:.0} is {:.0} points above the average of {:.0} (top {:.0}%)",
                    category.label(),
                    score,
                    diff,
                    average,
                    100.0 - pct
                ),
                major: pct > 80.0,
            });
        } else if diff < -10.0 && pct < 40.0 {
            weaknesses.push(SwotItem {
                category: Some(category),
                title: category.label().to_string(),
                score,
                average,
                percentile: pct,
                description: format!(
                    "{} of {:.0} is {:.0} points below the average of {:.0}",
                    category.label(),
                    score,
                    -diff,
                    average
                ),
                major: pct < 20.0,
            });
        } else if diff < 5.0 && score > 30.0 && pct > 30.0 && pct < 70.0 {
            opportunities.push(SwotItem {
                category: Some(category),
                title: format!("Grow {}", category.label()),
                score,
                average,
                percentile: pct,
                description: format!(
                    "{} of {:.0} sits near the average of {:.0}; modest investment could lift it above the pack",
                    category.label(),
                    score,
                    average
                ),
                major: false,
            });
        }
    }

    let overall = country.overall_capability_score;

    if !country.human_spaceflight_capable && overall > 40.0 {
        let category = Category::HumanSpaceflight;
        opportunities.push(SwotItem {
            category: Some(category),
            title: "Human spaceflight program".into(),
            score: scores.get(category),
            average: averages.get(category),
            percentile: percentile(scores.get(category), &category_column(population, category)),
            description: format!(
                "Capability index of {overall:.0} is high enough to pursue independent crewed flight"
            ),
            major: false,
        });
    }

    if !country.reusable_rocket_capable && country.independent_launch_capable {
        let category = Category::PropulsionTechnology;
        opportunities.push(SwotItem {
            category: Some(category),
            title: "Reusable launch systems".into(),
            score: scores.get(category),
            average: averages.get(category),
            percentile: percentile(scores.get(category), &category_column(population, category)),
            description:
                "Independent launch capability is in place; reusable boosters would cut launch costs"
                    .into(),
            major: false,
        });
    }

    let overall_column: Vec<f64> = population.iter().map(|c| c.overall_capability_score).collect();
    let global_rank = 1 + overall_column.iter().filter(|&&s| s > overall).count();
    let overall_average = overall_column.iter().sum::<f64>() / overall_column.len() as f64;

    if (2..=5).contains(&global_rank) {
        if let Some(leader) = population
            .iter()
            .max_by(|a, b| a.overall_capability_score.total_cmp(&b.overall_capability_score))
        {
            let lead = leader.overall_capability_score - overall;
            if lead > 20.0 {
                threats.push(SwotItem {
                    category: None,
                    title: "Competitive position".into(),
                    score: overall,
                    average: overall_average,
                    percentile: percentile(overall, &overall_column),
                    description: format!(
                        "Ranked #{} globally, {:.0} points behind leader {}",
                        global_rank,
                        lead,
                        leader.label()
                    ),
                    major: lead > 40.0,
                });
            }
        }
    }

    let major_strengths = strengths.iter().filter(|s| s.major).count();

    Some(SwotResult {
        country: country.label().to_string(),
        strengths,
        weaknesses,
        opportunities,
        threats,
        rating: overall_rating(overall, major_strengths),
        global_rank,
        population_size: population.len(),
    })
}
